//! # Postflow インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: 送信メールの記録（[`repository::EmailMessageRepository`]）
//! - **送信経路**: SMTP とローカル sendmail（[`transport::Transport`]）
//!
//! ## 依存関係
//!
//! ```text
//! mailer → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`transport`] - メール送信経路

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;
pub mod transport;

pub use error::{InfraError, InfraErrorKind};
