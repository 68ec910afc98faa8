//! # メール
//!
//! メール作成に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 役割 |
//! |---|------------|------|
//! | [`EmailMessage`] | メッセージ | 永続化・送信の単位 |
//! | [`MessageBuilder`] | メッセージ組み立て | 解決済み設定から `EmailMessage` を作る |
//! | [`AddressFilter`] | 許可パターン | 宛先が受信を許可されているか判定する |
//! | [`TemplateRegistry`] | テンプレート | 起動時に登録される名前付き設定 |
//! | [`TemplateResolver`] | テンプレート解決 | 登録設定と呼び出し側の上書きをマージする |
//!
//! ## 設計方針
//!
//! - **純粋な組み立て**: 送信・永続化・ビュー描画はドメイン外の協調者が担う
//! - **消費型の状態遷移**: `marked_sent(self, now)` のように `self` を消費して新しい状態を返す
//! - **プレースホルダ置換**: `{key}` をデータの値で置換し、未知のキーは残す

mod address_filter;
mod builder;
mod message;
mod placeholder;
mod template;

pub use address_filter::{AddressFilter, is_allowed};
pub use builder::{MessageBuilder, MessageOptions};
pub use message::{
    ContentType,
    DEFAULT_CHARSET,
    EmailMessage,
    EmailMessageId,
    EmailMessageRecord,
    MessageStatus,
    SUBJECT_MAX_LENGTH,
    VIEW_URL_PLACEHOLDER,
};
pub use placeholder::{TemplateData, substitute};
pub use template::{BodySource, ResolvedTemplate, TemplateConfig, TemplateRegistry, TemplateResolver};
