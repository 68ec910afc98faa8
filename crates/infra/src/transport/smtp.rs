//! SMTP 送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    transport::smtp::authentication::Credentials,
};
use postflow_domain::email::EmailMessage;

use super::{Delivery, Encryption, SmtpOptions, Transport, TransportError, envelope};

/// SMTP 送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// 接続はメッセージ送信時に確立する。
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// オプションから SMTP 送信インスタンスを作成
    ///
    /// # Errors
    ///
    /// TLS 設定の構築に失敗した場合は `Build`
    pub fn new(options: &SmtpOptions) -> Result<Self, TransportError> {
        let builder = match options.encryption {
            // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
            Encryption::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&options.host)
            }
            Encryption::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&options.host)
                    .map_err(|e| TransportError::Build(e.to_string()))?
            }
            Encryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&options.host)
                .map_err(|e| TransportError::Build(e.to_string()))?,
        };

        let mut builder = builder
            .port(options.port)
            .timeout(Some(Duration::from_secs(options.timeout_secs)));

        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, TransportError> {
        let prepared = envelope::prepare(message)?;
        let Some(built) = prepared.message else {
            return Ok(Delivery {
                delivered: 0,
                failed:    prepared.rejected,
            });
        };

        self.transport
            .send(built)
            .await
            .map_err(|e| TransportError::Failure(format!("SMTP 送信失敗: {e}")))?;

        Ok(Delivery {
            delivered: prepared.delivered,
            failed:    prepared.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use postflow_domain::email::MessageBuilder;
    use pretty_assertions::assert_eq;

    use super::*;

    /// 接続できないポートを指す SMTP 送信
    fn unreachable() -> SmtpTransport {
        SmtpTransport::new(&SmtpOptions {
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap()
    }

    fn message(to: &str) -> EmailMessage {
        MessageBuilder::new(
            vec!["noreply@example.com".to_string()],
            vec![to.to_string()],
            "件名",
            "本文",
        )
        .build(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
        .unwrap()
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpTransport>();
    }

    #[test]
    fn test_認証情報付きでも構築できる() {
        let transport = SmtpTransport::new(&SmtpOptions {
            username: Some("mailer".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        });

        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_有効な宛先がなければ接続せずに結果を返す() {
        let delivery = unreachable().send(&message("not an address")).await.unwrap();

        assert_eq!(
            delivery,
            Delivery {
                delivered: 0,
                failed:    vec!["not an address".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_接続できなければfailure() {
        let result = unreachable().send(&message("user@example.com")).await;

        assert!(matches!(result, Err(TransportError::Failure(_))));
    }
}
