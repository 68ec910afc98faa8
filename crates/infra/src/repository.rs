//! # リポジトリ実装
//!
//! ドメイン層のエンティティを永続化する具体的な実装を提供する。
//!
//! ## 設計方針
//!
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod email_message_repository;

pub use email_message_repository::{EmailMessageRepository, PostgresEmailMessageRepository};
