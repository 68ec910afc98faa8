//! メッセージ組み立て
//!
//! 解決済みの設定から [`EmailMessage`] を組み立てる。I/O も永続化も行わない。
//! アドレスの構文検証は送信経路に委ねる。

use chrono::{DateTime, Utc};

use super::message::{
    ContentType,
    DEFAULT_CHARSET,
    EmailMessage,
    MessageParts,
    SUBJECT_MAX_LENGTH,
};
use crate::DomainError;

/// 組み立てオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOptions {
    pub cc:           Vec<String>,
    pub bcc:          Vec<String>,
    pub content_type: ContentType,
    pub charset:      String,
    /// 指定時はヘッダブロックをこの値で置き換える
    pub headers:      Option<String>,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            cc:           Vec::new(),
            bcc:          Vec::new(),
            content_type: ContentType::default(),
            charset:      DEFAULT_CHARSET.to_string(),
            headers:      None,
        }
    }
}

/// メッセージビルダー
///
/// ```rust
/// use postflow_domain::email::{ContentType, MessageBuilder, MessageOptions};
///
/// let message = MessageBuilder::new(
///     vec!["a@x.com".to_string()],
///     vec!["b@x.com".to_string()],
///     "Hi",
///     "plain body",
/// )
/// .options(MessageOptions {
///     content_type: ContentType::Plain,
///     ..Default::default()
/// })
/// .build(chrono::Utc::now())
/// .unwrap();
///
/// assert_eq!(message.charset(), "utf8");
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from:    Vec<String>,
    to:      Vec<String>,
    subject: String,
    body:    String,
    options: MessageOptions,
}

impl MessageBuilder {
    pub fn new(
        from: Vec<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            body: body.into(),
            options: MessageOptions::default(),
        }
    }

    pub fn options(self, options: MessageOptions) -> Self {
        Self { options, ..self }
    }

    /// メッセージを組み立てる
    ///
    /// # Errors
    ///
    /// - `from` / `to` が空の場合は `MissingField`
    /// - 件名が 255 文字を超える場合は `Validation`
    pub fn build(self, now: DateTime<Utc>) -> Result<EmailMessage, DomainError> {
        if self.from.is_empty() {
            return Err(DomainError::MissingField("from"));
        }
        if self.to.is_empty() {
            return Err(DomainError::MissingField("to"));
        }
        if self.subject.chars().count() > SUBJECT_MAX_LENGTH {
            return Err(DomainError::Validation(format!(
                "件名は {SUBJECT_MAX_LENGTH} 文字以内である必要があります"
            )));
        }

        let MessageOptions {
            cc,
            bcc,
            content_type,
            charset,
            headers,
        } = self.options;

        let headers = headers.unwrap_or_else(|| {
            render_headers(&self.from, &self.to, &cc, &self.subject, content_type, &charset)
        });

        Ok(EmailMessage::new_unchecked(MessageParts {
            from: self.from,
            to: self.to,
            cc,
            bcc,
            subject: self.subject,
            body: self.body,
            content_type,
            charset,
            headers,
            now,
        }))
    }
}

/// 保存用のヘッダブロックを生成する（1 行 1 ヘッダ、Bcc は含めない）
fn render_headers(
    from: &[String],
    to: &[String],
    cc: &[String],
    subject: &str,
    content_type: ContentType,
    charset: &str,
) -> String {
    let mut lines = vec![
        format!("From: {}", from.join(", ")),
        format!("To: {}", to.join(", ")),
    ];
    if !cc.is_empty() {
        lines.push(format!("Cc: {}", cc.join(", ")));
    }
    lines.push(format!("Subject: {subject}"));
    lines.push("MIME-Version: 1.0".to_string());
    lines.push(format!(
        "Content-Type: {}; charset={charset}",
        content_type.mime()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::email::MessageStatus;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn addresses(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[rstest]
    fn test_必須フィールドと既定値が設定される(now: DateTime<Utc>) {
        let message = MessageBuilder::new(
            addresses(&["a@x.com"]),
            addresses(&["b@x.com"]),
            "Hi",
            "<p>body</p>",
        )
        .build(now)
        .unwrap();

        assert_eq!(message.from(), addresses(&["a@x.com"]).as_slice());
        assert_eq!(message.to(), addresses(&["b@x.com"]).as_slice());
        assert_eq!(message.subject(), "Hi");
        assert_eq!(message.body(), "<p>body</p>");
        assert_eq!(message.content_type(), ContentType::Html);
        assert_eq!(message.charset(), "utf8");
        assert_eq!(message.status(), MessageStatus::Created);
        assert_eq!(message.created_at(), now);
        assert!(message.sent_at().is_none());
        assert!(message.cc().is_empty());
        assert!(message.bcc().is_empty());
    }

    #[rstest]
    fn test_ヘッダブロックが生成される(now: DateTime<Utc>) {
        let message = MessageBuilder::new(
            addresses(&["a@x.com"]),
            addresses(&["b@x.com", "c@x.com"]),
            "Hi",
            "body",
        )
        .options(MessageOptions {
            cc: addresses(&["d@x.com"]),
            bcc: addresses(&["secret@x.com"]),
            content_type: ContentType::Plain,
            charset: "iso-8859-1".to_string(),
            headers: None,
        })
        .build(now)
        .unwrap();

        assert_eq!(
            message.headers(),
            "From: a@x.com\n\
             To: b@x.com, c@x.com\n\
             Cc: d@x.com\n\
             Subject: Hi\n\
             MIME-Version: 1.0\n\
             Content-Type: text/plain; charset=iso-8859-1"
        );
        assert!(!message.headers().contains("secret@x.com"));
    }

    #[rstest]
    fn test_指定したヘッダはそのまま使われる(now: DateTime<Utc>) {
        let message = MessageBuilder::new(
            addresses(&["a@x.com"]),
            addresses(&["b@x.com"]),
            "Hi",
            "body",
        )
        .options(MessageOptions {
            headers: Some("X-Campaign: spring".to_string()),
            ..Default::default()
        })
        .build(now)
        .unwrap();

        assert_eq!(message.headers(), "X-Campaign: spring");
    }

    #[rstest]
    fn test_fromが空ならmissing_field(now: DateTime<Utc>) {
        let result = MessageBuilder::new(vec![], addresses(&["b@x.com"]), "Hi", "body").build(now);
        assert_eq!(result.unwrap_err(), DomainError::MissingField("from"));
    }

    #[rstest]
    fn test_toが空ならmissing_field(now: DateTime<Utc>) {
        let result = MessageBuilder::new(addresses(&["a@x.com"]), vec![], "Hi", "body").build(now);
        assert_eq!(result.unwrap_err(), DomainError::MissingField("to"));
    }

    #[rstest]
    #[case(255, true)]
    #[case(256, false)]
    fn test_件名は255文字まで(now: DateTime<Utc>, #[case] length: usize, #[case] ok: bool) {
        let result = MessageBuilder::new(
            addresses(&["a@x.com"]),
            addresses(&["b@x.com"]),
            "あ".repeat(length),
            "body",
        )
        .build(now);

        assert_eq!(result.is_ok(), ok);
    }

    #[rstest]
    fn test_メッセージごとに異なるidが割り当てられる(now: DateTime<Utc>) {
        let build = || {
            MessageBuilder::new(addresses(&["a@x.com"]), addresses(&["b@x.com"]), "Hi", "body")
                .build(now)
                .unwrap()
        };

        assert_ne!(build().id(), build().id());
    }
}
