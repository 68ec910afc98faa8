//! # メールメッセージ
//!
//! 永続化と送信の単位となるエンティティ。
//!
//! ## 状態遷移
//!
//! ```text
//! Created ──marked_sent──→ Sent
//!    │
//!    ├──marked_suppressed──→ Suppressed
//!    └──marked_failed──────→ Failed
//! ```
//!
//! `sent_at` は送信試行が完了した場合にのみ設定される。設定後のメッセージは
//! ステータス補正（`marked_failed` / `marked_suppressed`）以外の変更を受け付けない。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

/// メールメッセージ ID
///
/// email_messages テーブルの主キー。作成時刻順に並ぶよう UUID v7 を使用。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct EmailMessageId(uuid::Uuid);

impl EmailMessageId {
    /// 新しい ID を採番する
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// 保存済みの UUID から復元する
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for EmailMessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for EmailMessageId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::Validation(format!("メッセージ ID が不正です: {e}")))
    }
}

/// 件名の最大文字数
pub const SUBJECT_MAX_LENGTH: usize = 255;

/// 文字セットの既定値
pub const DEFAULT_CHARSET: &str = "utf8";

/// 「ブラウザで表示」リンクに置換されるトークン
///
/// 初回永続化で ID が確定した後に置換する。
pub const VIEW_URL_PLACEHOLDER: &str = "{viewUrl}";

/// 本文の MIME タイプ
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// text/plain
    #[serde(alias = "text/plain")]
    #[strum(to_string = "plain", serialize = "text/plain")]
    Plain,
    /// text/html
    #[default]
    #[serde(alias = "text/html")]
    #[strum(to_string = "html", serialize = "text/html")]
    Html,
}

impl ContentType {
    /// MIME タイプ文字列を返す
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Plain => "text/plain",
            Self::Html => "text/html",
        }
    }
}

/// メッセージのライフサイクル
///
/// email_messages テーブルの `status` カラムに格納される値。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageStatus {
    /// 作成済み（未送信）
    Created,
    /// 送信試行完了（一部宛先の拒否を含む）
    Sent,
    /// 送信経路のエラーで送信できなかった
    Failed,
    /// 宛先フィルタで送信を抑止した
    Suppressed,
}

/// メールメッセージエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    id:           EmailMessageId,
    from:         Vec<String>,
    to:           Vec<String>,
    cc:           Vec<String>,
    bcc:          Vec<String>,
    subject:      String,
    body:         String,
    content_type: ContentType,
    charset:      String,
    headers:      String,
    status:       MessageStatus,
    created_at:   DateTime<Utc>,
    sent_at:      Option<DateTime<Utc>>,
}

/// メールメッセージの DB 復元パラメータ
pub struct EmailMessageRecord {
    pub id:           EmailMessageId,
    pub from:         Vec<String>,
    pub to:           Vec<String>,
    pub cc:           Vec<String>,
    pub bcc:          Vec<String>,
    pub subject:      String,
    pub body:         String,
    pub content_type: ContentType,
    pub charset:      String,
    pub headers:      String,
    pub status:       MessageStatus,
    pub created_at:   DateTime<Utc>,
    pub sent_at:      Option<DateTime<Utc>>,
}

impl EmailMessage {
    /// 既存のデータから復元する
    pub fn from_db(record: EmailMessageRecord) -> Self {
        Self {
            id:           record.id,
            from:         record.from,
            to:           record.to,
            cc:           record.cc,
            bcc:          record.bcc,
            subject:      record.subject,
            body:         record.body,
            content_type: record.content_type,
            charset:      record.charset,
            headers:      record.headers,
            status:       record.status,
            created_at:   record.created_at,
            sent_at:      record.sent_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &EmailMessageId {
        &self.id
    }

    pub fn from(&self) -> &[String] {
        &self.from
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    /// 送信試行が完了しているか
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// `to` の宛先数
    pub fn recipient_count(&self) -> usize {
        self.to.len()
    }

    // 状態遷移メソッド

    /// 本文中の `{viewUrl}` を閲覧 URL に置換する
    ///
    /// トークンを含まない場合は本文を変更しない。
    pub fn with_view_url(self, view_url: &str) -> Result<Self, DomainError> {
        self.ensure_not_sent()?;
        if !self.body.contains(VIEW_URL_PLACEHOLDER) {
            return Ok(self);
        }
        Ok(Self {
            body: self.body.replace(VIEW_URL_PLACEHOLDER, view_url),
            ..self
        })
    }

    /// すべての宛先をキャッチオールアドレスに差し替える
    ///
    /// cc / bcc は空になる。ヘッダは作成時の宛先を記録したまま残す。
    pub fn redirected(self, catch_all: impl Into<String>) -> Result<Self, DomainError> {
        self.ensure_not_sent()?;
        Ok(Self {
            to: vec![catch_all.into()],
            cc: Vec::new(),
            bcc: Vec::new(),
            ..self
        })
    }

    /// 送信試行の完了を記録する
    pub fn marked_sent(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_not_sent()?;
        Ok(Self {
            status: MessageStatus::Sent,
            sent_at: Some(now),
            ..self
        })
    }

    /// 送信経路のエラーを記録する（`sent_at` は変更しない）
    pub fn marked_failed(self) -> Self {
        Self {
            status: MessageStatus::Failed,
            ..self
        }
    }

    /// 宛先フィルタによる抑止を記録する
    pub fn marked_suppressed(self) -> Self {
        Self {
            status: MessageStatus::Suppressed,
            ..self
        }
    }

    fn ensure_not_sent(&self) -> Result<(), DomainError> {
        if self.is_sent() {
            return Err(DomainError::Validation(format!(
                "送信済みのメッセージは変更できません: {}",
                self.id
            )));
        }
        Ok(())
    }

    pub(super) fn new_unchecked(parts: MessageParts) -> Self {
        Self {
            id:           EmailMessageId::new(),
            from:         parts.from,
            to:           parts.to,
            cc:           parts.cc,
            bcc:          parts.bcc,
            subject:      parts.subject,
            body:         parts.body,
            content_type: parts.content_type,
            charset:      parts.charset,
            headers:      parts.headers,
            status:       MessageStatus::Created,
            created_at:   parts.now,
            sent_at:      None,
        }
    }
}

/// `MessageBuilder` が検証済みの値を渡すための内部型
pub(super) struct MessageParts {
    pub from:         Vec<String>,
    pub to:           Vec<String>,
    pub cc:           Vec<String>,
    pub bcc:          Vec<String>,
    pub subject:      String,
    pub body:         String,
    pub content_type: ContentType,
    pub charset:      String,
    pub headers:      String,
    pub now:          DateTime<Utc>,
}

impl fmt::Display for EmailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: {}", self.from.join(", "))?;
        writeln!(f, "To: {}", self.to.join(", "))?;
        writeln!(f, "Headers:")?;
        writeln!(f, "{}", self.headers)?;
        writeln!(f, "Body:")?;
        write!(f, "{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::email::MessageBuilder;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn message(now: DateTime<Utc>) -> EmailMessage {
        MessageBuilder::new(
            vec!["noreply@example.com".to_string()],
            vec!["user@example.com".to_string()],
            "ようこそ",
            "<a href=\"{viewUrl}\">ブラウザで表示</a>",
        )
        .options(crate::email::MessageOptions {
            cc: vec!["cc@example.com".to_string()],
            bcc: vec!["bcc@example.com".to_string()],
            ..Default::default()
        })
        .build(now)
        .unwrap()
    }

    #[test]
    fn test_message_statusの文字列変換が正しい() {
        assert_eq!(MessageStatus::Created.to_string(), "created");
        assert_eq!(MessageStatus::Sent.to_string(), "sent");
        assert_eq!(MessageStatus::Failed.to_string(), "failed");
        assert_eq!(MessageStatus::Suppressed.to_string(), "suppressed");
        assert_eq!(
            MessageStatus::from_str("suppressed").unwrap(),
            MessageStatus::Suppressed
        );
    }

    #[rstest]
    #[case("html", ContentType::Html)]
    #[case("text/html", ContentType::Html)]
    #[case("plain", ContentType::Plain)]
    #[case("text/plain", ContentType::Plain)]
    fn test_content_typeは短縮名とmimeの両方から変換できる(
        #[case] input: &str,
        #[case] expected: ContentType,
    ) {
        assert_eq!(ContentType::from_str(input).unwrap(), expected);
    }

    #[test]
    fn test_content_typeの既定値はhtml() {
        assert_eq!(ContentType::default(), ContentType::Html);
        assert_eq!(ContentType::default().mime(), "text/html");
    }

    #[rstest]
    fn test_with_view_urlでトークンを置換する(message: EmailMessage) {
        let message = message
            .with_view_url("https://mail.example.com/email/view/1")
            .unwrap();

        assert_eq!(
            message.body(),
            "<a href=\"https://mail.example.com/email/view/1\">ブラウザで表示</a>"
        );
    }

    #[rstest]
    fn test_redirectedで宛先を差し替えccとbccを空にする(message: EmailMessage) {
        let message = message.redirected("audit@x.com").unwrap();

        assert_eq!(message.to(), ["audit@x.com".to_string()]);
        assert!(message.cc().is_empty());
        assert!(message.bcc().is_empty());
    }

    #[rstest]
    fn test_marked_sentで送信日時とステータスを記録する(
        message: EmailMessage,
        now: DateTime<Utc>,
    ) {
        assert_eq!(message.status(), MessageStatus::Created);
        assert!(message.sent_at().is_none());

        let message = message.marked_sent(now).unwrap();

        assert_eq!(message.status(), MessageStatus::Sent);
        assert_eq!(message.sent_at(), Some(now));
    }

    #[rstest]
    fn test_送信済みのメッセージは変更できない(message: EmailMessage, now: DateTime<Utc>) {
        let sent = message.marked_sent(now).unwrap();

        assert!(sent.clone().marked_sent(now).is_err());
        assert!(sent.clone().redirected("audit@x.com").is_err());
        assert!(sent.clone().with_view_url("https://example.com").is_err());
    }

    #[rstest]
    fn test_ステータス補正は送信済みでも可能(message: EmailMessage, now: DateTime<Utc>) {
        let failed = message.marked_sent(now).unwrap().marked_failed();

        assert_eq!(failed.status(), MessageStatus::Failed);
        assert_eq!(failed.sent_at(), Some(now));
    }

    #[rstest]
    fn test_marked_failedはsent_atを設定しない(message: EmailMessage) {
        let failed = message.marked_failed();

        assert_eq!(failed.status(), MessageStatus::Failed);
        assert!(failed.sent_at().is_none());
    }

    #[rstest]
    fn test_recipient_countはtoの宛先数を返す(message: EmailMessage) {
        assert_eq!(message.recipient_count(), 1);
    }

    #[rstest]
    fn test_displayに送信元と宛先と本文が含まれる(message: EmailMessage) {
        let text = message.to_string();

        assert!(text.starts_with("From: noreply@example.com\nTo: user@example.com\n"));
        assert!(text.contains("Headers:\n"));
        assert!(text.ends_with("Body:\n<a href=\"{viewUrl}\">ブラウザで表示</a>"));
    }

    #[rstest]
    fn test_idは文字列表現から復元できる(message: EmailMessage) {
        let parsed = EmailMessageId::from_str(&message.id().to_string()).unwrap();
        assert_eq!(&parsed, message.id());

        assert!(matches!(
            EmailMessageId::from_str("not-a-uuid"),
            Err(DomainError::Validation(_))
        ));
    }
}
