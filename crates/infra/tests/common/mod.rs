//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するエンティティ生成ヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use postflow_domain::email::{ContentType, EmailMessage, MessageBuilder, MessageOptions};

/// テスト用の固定日時
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// 未送信のメッセージを作成する
pub fn draft_message(subject: &str) -> EmailMessage {
    MessageBuilder::new(
        vec!["noreply@example.com".to_string()],
        vec!["user@example.com".to_string(), "other@example.com".to_string()],
        subject,
        "<p>こんにちは <a href=\"{viewUrl}\">ブラウザで表示</a></p>",
    )
    .options(MessageOptions {
        cc: vec!["cc@example.com".to_string()],
        bcc: vec!["bcc@example.com".to_string()],
        content_type: ContentType::Html,
        ..Default::default()
    })
    .build(fixed_now())
    .unwrap()
}
