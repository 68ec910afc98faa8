//! # Postflow Mailer ライブラリ
//!
//! テンプレートからメールを組み立て、記録し、送信経路へ引き渡すユースケースを公開する。
//! CLI（`postflow-mailer`）と統合テストの双方から利用する。

pub mod cli;
pub mod config;
pub mod error;
pub mod usecase;
