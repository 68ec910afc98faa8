//! # EmailMessageRepository
//!
//! 送信メールの記録を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **ID はドメイン層で採番**: 組み立て時に UUID v7 が確定しているため、
//!   INSERT は ID を含めてそのまま保存する
//! - **2 段階の書き込み**: 送信前に `insert`、送信試行後に `update`
//! - **閲覧用の参照**: 「ブラウザで表示」は `find_by_id` で本文を引く

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postflow_domain::email::{
    ContentType,
    EmailMessage,
    EmailMessageId,
    EmailMessageRecord,
    MessageStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 送信メールリポジトリトレイト
#[async_trait]
pub trait EmailMessageRepository: Send + Sync {
    /// 新しいメッセージを保存する
    async fn insert(&self, message: &EmailMessage) -> Result<(), InfraError>;

    /// 保存済みのメッセージを更新する
    ///
    /// # Errors
    ///
    /// 対象が存在しない場合は `NotFound`
    async fn update(&self, message: &EmailMessage) -> Result<(), InfraError>;

    /// ID でメッセージを検索する
    async fn find_by_id(&self, id: &EmailMessageId) -> Result<Option<EmailMessage>, InfraError>;
}

/// PostgreSQL 実装の EmailMessageRepository
#[derive(Debug, Clone)]
pub struct PostgresEmailMessageRepository {
    pool: PgPool,
}

impl PostgresEmailMessageRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// email_messages テーブルの行
#[derive(sqlx::FromRow)]
struct EmailMessageRow {
    id:             Uuid,
    from_addresses: Vec<String>,
    to_addresses:   Vec<String>,
    cc_addresses:   Vec<String>,
    bcc_addresses:  Vec<String>,
    subject:        String,
    body:           String,
    headers:        String,
    content_type:   String,
    charset:        String,
    status:         String,
    created_at:     DateTime<Utc>,
    sent_at:        Option<DateTime<Utc>>,
}

impl TryFrom<EmailMessageRow> for EmailMessage {
    type Error = InfraError;

    fn try_from(row: EmailMessageRow) -> Result<Self, Self::Error> {
        let content_type = ContentType::from_str(&row.content_type)
            .map_err(|e| InfraError::unexpected(format!("不正な content_type: {e}")))?;
        let status = MessageStatus::from_str(&row.status)
            .map_err(|e| InfraError::unexpected(format!("不正なステータス: {e}")))?;

        Ok(EmailMessage::from_db(EmailMessageRecord {
            id: EmailMessageId::from_uuid(row.id),
            from: row.from_addresses,
            to: row.to_addresses,
            cc: row.cc_addresses,
            bcc: row.bcc_addresses,
            subject: row.subject,
            body: row.body,
            content_type,
            charset: row.charset,
            headers: row.headers,
            status,
            created_at: row.created_at,
            sent_at: row.sent_at,
        }))
    }
}

#[async_trait]
impl EmailMessageRepository for PostgresEmailMessageRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(message_id = %message.id()))]
    async fn insert(&self, message: &EmailMessage) -> Result<(), InfraError> {
        let status: &str = message.status().into();

        sqlx::query(
            r#"
            INSERT INTO email_messages (
                id, from_addresses, to_addresses, cc_addresses, bcc_addresses,
                subject, body, headers, content_type, charset,
                status, created_at, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(message.from())
        .bind(message.to())
        .bind(message.cc())
        .bind(message.bcc())
        .bind(message.subject())
        .bind(message.body())
        .bind(message.headers())
        .bind(message.content_type().mime())
        .bind(message.charset())
        .bind(status)
        .bind(message.created_at())
        .bind(message.sent_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate =
                matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                InfraError::conflict("EmailMessage", message.id().to_string())
            } else {
                InfraError::from(e)
            }
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(message_id = %message.id()))]
    async fn update(&self, message: &EmailMessage) -> Result<(), InfraError> {
        let status: &str = message.status().into();

        let result = sqlx::query(
            r#"
            UPDATE email_messages SET
                from_addresses = $2,
                to_addresses = $3,
                cc_addresses = $4,
                bcc_addresses = $5,
                subject = $6,
                body = $7,
                headers = $8,
                content_type = $9,
                charset = $10,
                status = $11,
                sent_at = $12
            WHERE id = $1
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(message.from())
        .bind(message.to())
        .bind(message.cc())
        .bind(message.bcc())
        .bind(message.subject())
        .bind(message.body())
        .bind(message.headers())
        .bind(message.content_type().mime())
        .bind(message.charset())
        .bind(status)
        .bind(message.sent_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::not_found(
                "EmailMessage",
                message.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(message_id = %id))]
    async fn find_by_id(&self, id: &EmailMessageId) -> Result<Option<EmailMessage>, InfraError> {
        let row = sqlx::query_as::<_, EmailMessageRow>(
            r#"
            SELECT
                id, from_addresses, to_addresses, cc_addresses, bcc_addresses,
                subject, body, headers, content_type, charset,
                status, created_at, sent_at
            FROM email_messages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(EmailMessage::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresEmailMessageRepository>();
    }

    fn row(content_type: &str, status: &str) -> EmailMessageRow {
        EmailMessageRow {
            id:             Uuid::now_v7(),
            from_addresses: vec!["noreply@example.com".to_string()],
            to_addresses:   vec!["user@example.com".to_string()],
            cc_addresses:   vec![],
            bcc_addresses:  vec![],
            subject:        "件名".to_string(),
            body:           "本文".to_string(),
            headers:        "Subject: 件名".to_string(),
            content_type:   content_type.to_string(),
            charset:        "utf8".to_string(),
            status:         status.to_string(),
            created_at:     DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            sent_at:        None,
        }
    }

    #[test]
    fn test_行からエンティティを復元できる() {
        let message = EmailMessage::try_from(row("text/plain", "suppressed")).unwrap();

        assert_eq!(message.content_type(), ContentType::Plain);
        assert_eq!(message.status(), MessageStatus::Suppressed);
        assert_eq!(message.subject(), "件名");
    }

    #[test]
    fn test_不正なステータスはunexpected() {
        let err = EmailMessage::try_from(row("text/html", "queued")).unwrap_err();

        assert!(matches!(
            err.kind(),
            crate::error::InfraErrorKind::Unexpected(_)
        ));
    }
}
