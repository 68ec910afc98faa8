//! # Postflow ドメイン層
//!
//! メール作成のビジネスルールを担うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋性**: I/O を一切行わない。送信・永続化・ビュー描画は上位層の責務
//! - **エンティティ**: 一意の識別子を持つ [`email::EmailMessage`]
//! - **値オブジェクト**: [`email::ContentType`], [`email::MessageStatus`] など
//! - **ドメインエラー**: ビジネスルール違反を表現する [`DomainError`]
//!
//! ## 依存関係の方向
//!
//! ```text
//! mailer → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`email`] - メッセージ、組み立て、宛先フィルタ、テンプレート解決
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメイン層で発生するエラーの定義
//!
//! ## 使用例
//!
//! ```rust
//! use postflow_domain::email::{AddressFilter, MessageBuilder};
//!
//! let filter = AddressFilter::new(vec!["*@example.com".to_string()]);
//! assert!(filter.is_allowed("user@example.com"));
//!
//! let message = MessageBuilder::new(
//!     vec!["noreply@example.com".to_string()],
//!     vec!["user@example.com".to_string()],
//!     "ようこそ",
//!     "<p>登録ありがとうございます</p>",
//! )
//! .build(chrono::Utc::now())
//! .unwrap();
//! assert!(message.sent_at().is_none());
//! ```

pub mod clock;
pub mod email;
pub mod error;

pub use error::DomainError;
