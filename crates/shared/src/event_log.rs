//! # メール配送のイベントログ
//!
//! 配送結果（送信・失敗・抑止・dry-run）は [`log_business_event!`] で 1 件ずつ記録する。
//! フィールド名はドット区切りで、JSON 出力ではそのままフラットなキーになる。
//!
//! ```text
//! jq 'select(.["event.kind"] == "business_event" and .["event.result"] != "success")'
//! ```
//!
//! DB や送信経路のエラーには `tracing::error!` に [`error`] の定数で
//! `error.category` と `error.kind` を添える。

/// 配送イベントを info レベルで出力する。
///
/// `event.kind = "business_event"` を先頭に付ける。呼び出し側は
/// `event.category` / `event.action` / `event.result` を [`event`] の定数で渡し、
/// 対象メッセージがあれば `event.entity_type` と `event.entity_id` も添える。
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const EMAIL: &str = "email";
    }

    /// イベントアクション
    pub mod action {
        pub const EMAIL_SENT: &str = "email.sent";
        pub const EMAIL_FAILED: &str = "email.failed";
        pub const EMAIL_SUPPRESSED: &str = "email.suppressed";
        pub const EMAIL_DRY_RUN: &str = "email.dry_run";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const EMAIL_MESSAGE: &str = "email_message";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
        pub const SKIPPED: &str = "skipped";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（SMTP サーバー、sendmail）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const TRANSPORT: &str = "transport";
    }
}
