//! lettre メッセージへの変換
//!
//! SMTP と sendmail の両経路で共有する。Bcc はヘッダに出力されず、
//! エンベロープの宛先にのみ含まれる。

use lettre::{
    Message,
    message::{Mailbox, header::ContentType},
};
use postflow_domain::email::EmailMessage;

use super::TransportError;

/// 送信可能な形に変換したメッセージ
pub(super) struct Prepared {
    /// 有効な宛先が 1 つもない場合は `None`
    pub message:   Option<Message>,
    /// 経路に渡す宛先数
    pub delivered: usize,
    /// メールボックスとして解釈できなかった宛先
    pub rejected:  Vec<String>,
}

/// [`EmailMessage`] を lettre の [`Message`] に変換する
///
/// 送信元が不正な場合はメッセージ全体の失敗とする。
pub(super) fn prepare(message: &EmailMessage) -> Result<Prepared, TransportError> {
    let senders = message
        .from()
        .iter()
        .map(|address| {
            address.parse::<Mailbox>().map_err(|e| {
                TransportError::Failure(format!("送信元アドレス不正: {address}: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rejected = Vec::new();
    let mut parse_recipients = |addresses: &[String]| -> Vec<Mailbox> {
        addresses
            .iter()
            .filter_map(|address| match address.parse::<Mailbox>() {
                Ok(mailbox) => Some(mailbox),
                Err(_) => {
                    rejected.push(address.clone());
                    None
                }
            })
            .collect()
    };
    let to = parse_recipients(message.to());
    let cc = parse_recipients(message.cc());
    let bcc = parse_recipients(message.bcc());

    let delivered = to.len() + cc.len() + bcc.len();
    if delivered == 0 {
        return Ok(Prepared {
            message: None,
            delivered,
            rejected,
        });
    }

    let content_type = ContentType::parse(&format!(
        "{}; charset={}",
        message.content_type().mime(),
        message.charset()
    ))
    .map_err(|e| TransportError::Failure(format!("Content-Type 不正: {e}")))?;

    let mut builder = Message::builder()
        .subject(message.subject())
        .header(content_type);
    // From が複数ある場合は先頭を Sender とする（RFC 5322 3.6.2）
    if senders.len() > 1 {
        builder = builder.sender(senders[0].clone());
    }
    for mailbox in senders {
        builder = builder.from(mailbox);
    }
    for mailbox in to {
        builder = builder.to(mailbox);
    }
    for mailbox in cc {
        builder = builder.cc(mailbox);
    }
    for mailbox in bcc {
        builder = builder.bcc(mailbox);
    }

    let built = builder
        .body(message.body().to_string())
        .map_err(|e| TransportError::Failure(format!("メッセージ構築失敗: {e}")))?;

    Ok(Prepared {
        message: Some(built),
        delivered,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use postflow_domain::email::{ContentType as BodyType, MessageBuilder, MessageOptions};
    use pretty_assertions::assert_eq;

    use super::*;

    fn message(to: &[&str], bcc: &[&str]) -> EmailMessage {
        MessageBuilder::new(
            vec!["noreply@example.com".to_string()],
            to.iter().map(|a| (*a).to_string()).collect(),
            "お知らせ",
            "本文",
        )
        .options(MessageOptions {
            bcc: bcc.iter().map(|a| (*a).to_string()).collect(),
            content_type: BodyType::Plain,
            ..Default::default()
        })
        .build(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
        .unwrap()
    }

    #[test]
    fn test_解析できない宛先はrejectedに入る() {
        let prepared = prepare(&message(&["not an address", "b@example.com"], &[])).unwrap();

        assert_eq!(prepared.delivered, 1);
        assert_eq!(prepared.rejected, vec!["not an address".to_string()]);
        assert!(prepared.message.is_some());
    }

    #[test]
    fn test_有効な宛先がなければメッセージを作らない() {
        let prepared = prepare(&message(&["broken"], &[])).unwrap();

        assert_eq!(prepared.delivered, 0);
        assert_eq!(prepared.rejected, vec!["broken".to_string()]);
        assert!(prepared.message.is_none());
    }

    #[test]
    fn test_bccはエンベロープにのみ含まれる() {
        let prepared = prepare(&message(&["b@example.com"], &["hidden@example.com"])).unwrap();
        let built = prepared.message.unwrap();

        let formatted = String::from_utf8(built.formatted()).unwrap();
        assert!(!formatted.contains("hidden@example.com"));
        assert!(
            built
                .envelope()
                .to()
                .iter()
                .any(|a| a.to_string() == "hidden@example.com")
        );
        assert_eq!(prepared.delivered, 2);
    }

    #[test]
    fn test_content_typeと文字セットがヘッダに出力される() {
        let prepared = prepare(&message(&["b@example.com"], &[])).unwrap();
        let formatted = String::from_utf8(prepared.message.unwrap().formatted()).unwrap();

        assert!(formatted.contains("Content-Type: text/plain; charset=utf8"));
    }

    #[test]
    fn test_送信元が不正ならfailure() {
        let message = MessageBuilder::new(
            vec!["???".to_string()],
            vec!["b@example.com".to_string()],
            "件名",
            "本文",
        )
        .build(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
        .unwrap();

        assert!(matches!(prepare(&message), Err(TransportError::Failure(_))));
    }
}
