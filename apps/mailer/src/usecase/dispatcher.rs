//! # ディスパッチャ
//!
//! テンプレート解決 → 本文描画 → メッセージ組み立て → 記録 → 送信を統合する。
//!
//! ## 送信フロー
//!
//! ```text
//! send(message)
//!   ├─ ログ出力（logging 有効時）
//!   ├─ insert → {viewUrl} 置換 → update（本文が変わった場合のみ）
//!   ├─ 宛先フィルタ不一致 → Suppressed を記録して終了
//!   ├─ dry-run → 送信せず宛先数を返す
//!   ├─ キャッチオール → to を差し替え、cc / bcc を空にする
//!   └─ Transport::send → 拒否宛先を記録 → Sent を記録
//! ```
//!
//! 送信経路のエラーは `Failed` を記録したうえで呼び出し元に返す。再送は行わない。

use std::sync::{Arc, Mutex, PoisonError};

use postflow_domain::{
    DomainError,
    clock::Clock,
    email::{
        AddressFilter,
        BodySource,
        ContentType,
        DEFAULT_CHARSET,
        EmailMessage,
        EmailMessageId,
        MessageBuilder,
        MessageOptions,
        MessageStatus,
        ResolvedTemplate,
        TemplateConfig,
        TemplateResolver,
        VIEW_URL_PLACEHOLDER,
    },
};
use postflow_infra::{repository::EmailMessageRepository, transport::Transport};
use postflow_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::{ViewRenderer, ViewUrlBuilder};
use crate::error::DispatchError;

/// ディスパッチャの動作設定
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// 許可する宛先パターン（空ならすべて許可）
    pub filter:         AddressFilter,
    /// 設定時はすべての宛先をこのアドレスに差し替える
    pub catch_all:      Option<String>,
    /// 送信せずに宛先数だけを返す
    pub dry_run:        bool,
    /// 送信前にメッセージ全体をログに出力する
    pub logging:        bool,
    /// ビュー参照の本文に適用するレイアウト
    pub default_layout: Option<String>,
    pub charset:        String,
    pub content_type:   ContentType,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            filter:         AddressFilter::default(),
            catch_all:      None,
            dry_run:        false,
            logging:        true,
            default_layout: None,
            charset:        DEFAULT_CHARSET.to_string(),
            content_type:   ContentType::default(),
        }
    }
}

/// 送信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 送信経路に引き渡した
    Sent {
        /// 経路が受け付けた宛先数
        recipients: usize,
    },
    /// dry-run のため送信しなかった
    DryRun {
        /// `to` の宛先数
        recipients: usize,
    },
    /// 宛先フィルタで抑止した
    Suppressed,
}

impl SendOutcome {
    /// 宛先数（抑止時は -1）
    pub fn recipient_count(&self) -> i64 {
        match self {
            Self::Sent { recipients } | Self::DryRun { recipients } => {
                i64::try_from(*recipients).unwrap_or(i64::MAX)
            }
            Self::Suppressed => -1,
        }
    }
}

/// メールディスパッチャ
///
/// 協調オブジェクトはすべて `Arc<dyn Trait>` で注入する。
/// 拒否宛先のリストは送信経路を呼び出すたびに上書きされる。
pub struct Dispatcher {
    resolver:          TemplateResolver,
    settings:          DispatcherSettings,
    renderer:          Arc<dyn ViewRenderer>,
    view_urls:         Arc<dyn ViewUrlBuilder>,
    transport:         Arc<dyn Transport>,
    repository:        Arc<dyn EmailMessageRepository>,
    clock:             Arc<dyn Clock>,
    failed_recipients: Mutex<Vec<String>>,
}

impl Dispatcher {
    pub fn new(
        resolver: TemplateResolver,
        settings: DispatcherSettings,
        renderer: Arc<dyn ViewRenderer>,
        view_urls: Arc<dyn ViewUrlBuilder>,
        transport: Arc<dyn Transport>,
        repository: Arc<dyn EmailMessageRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            settings,
            renderer,
            view_urls,
            transport,
            repository,
            clock,
            failed_recipients: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// 直前の送信で拒否された宛先
    pub fn failed_recipients(&self) -> Vec<String> {
        self.failed_recipients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 登録済みテンプレートからメッセージを作成する（記録はしない）
    pub fn create_from_template(
        &self,
        name: &str,
        overrides: TemplateConfig,
    ) -> Result<EmailMessage, DispatchError> {
        let resolved = self.resolver.resolve(name, overrides)?;
        self.build(resolved)
    }

    /// テンプレートを使わずにメッセージを作成する（記録はしない）
    ///
    /// `options` からは cc / bcc / layout / content_type / charset / data を参照する。
    pub fn create(
        &self,
        from: Vec<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: BodySource,
        options: TemplateConfig,
    ) -> Result<EmailMessage, DispatchError> {
        let (body, view) = match body {
            BodySource::Literal(body) => (Some(body), None),
            BodySource::View(view) => (None, Some(view)),
        };
        let config = TemplateConfig {
            from: Some(from),
            to: Some(to),
            subject: Some(subject.into()),
            body,
            view,
            ..options
        };

        let resolved = ResolvedTemplate::from_config(self.resolver.with_global_data(config))?;
        self.build(resolved)
    }

    /// 記録済みのメッセージを ID で取得する（「ブラウザで表示」用）
    pub async fn find(&self, id: &EmailMessageId) -> Result<Option<EmailMessage>, DispatchError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// メッセージを記録し、送信する
    #[tracing::instrument(skip_all, fields(message_id = %message.id()))]
    pub async fn send(&self, message: EmailMessage) -> Result<SendOutcome, DispatchError> {
        // 記録・送信を試みたメッセージは再送しない
        if message.is_sent() || message.status() != MessageStatus::Created {
            return Err(DomainError::Validation(format!(
                "作成直後のメッセージのみ送信できます: {} ({})",
                message.id(),
                message.status()
            ))
            .into());
        }

        if self.settings.logging {
            tracing::info!("メールを送信します\n{message}");
        }

        let message = self.persist_draft(message).await?;

        if !self.settings.filter.allows_all(message.to()) {
            let message = message.marked_suppressed();
            self.repository.update(&message).await?;
            log_business_event!(
                event.category = event::category::EMAIL,
                event.action = event::action::EMAIL_SUPPRESSED,
                event.entity_type = event::entity_type::EMAIL_MESSAGE,
                event.entity_id = %message.id(),
                event.result = event::result::SKIPPED,
                email.to = ?message.to(),
                "宛先フィルタによりメール送信を抑止"
            );
            return Ok(SendOutcome::Suppressed);
        }

        if self.settings.dry_run {
            log_business_event!(
                event.category = event::category::EMAIL,
                event.action = event::action::EMAIL_DRY_RUN,
                event.entity_type = event::entity_type::EMAIL_MESSAGE,
                event.entity_id = %message.id(),
                event.result = event::result::SKIPPED,
                email.recipients = message.recipient_count(),
                "dry-run のためメールを送信しない"
            );
            return Ok(SendOutcome::DryRun {
                recipients: message.recipient_count(),
            });
        }

        let message = match &self.settings.catch_all {
            Some(catch_all) => message.redirected(catch_all.clone())?,
            None => message,
        };

        match self.transport.send(&message).await {
            Ok(delivery) => {
                self.set_failed_recipients(delivery.failed.clone());
                let message = message.marked_sent(self.clock.now())?;
                self.repository.update(&message).await?;

                log_business_event!(
                    event.category = event::category::EMAIL,
                    event.action = event::action::EMAIL_SENT,
                    event.entity_type = event::entity_type::EMAIL_MESSAGE,
                    event.entity_id = %message.id(),
                    event.result = event::result::SUCCESS,
                    email.recipients = delivery.delivered,
                    email.failed = ?delivery.failed,
                    "メール送信成功"
                );
                Ok(SendOutcome::Sent {
                    recipients: delivery.delivered,
                })
            }
            Err(e) => {
                self.set_failed_recipients(Vec::new());
                let message = message.marked_failed();
                if let Err(persist_error) = self.repository.update(&message).await {
                    tracing::error!(
                        error.category = log_error::category::INFRASTRUCTURE,
                        error.kind = log_error::kind::DATABASE,
                        error = %persist_error,
                        "送信失敗の記録に失敗"
                    );
                }

                log_business_event!(
                    event.category = event::category::EMAIL,
                    event.action = event::action::EMAIL_FAILED,
                    event.entity_type = event::entity_type::EMAIL_MESSAGE,
                    event.entity_id = %message.id(),
                    event.result = event::result::FAILURE,
                    error.category = log_error::category::EXTERNAL_SERVICE,
                    error.kind = log_error::kind::TRANSPORT,
                    error = %e,
                    "メール送信失敗"
                );
                Err(DispatchError::Transport(e))
            }
        }
    }

    /// 解決済みテンプレートからメッセージを組み立てる
    fn build(&self, resolved: ResolvedTemplate) -> Result<EmailMessage, DispatchError> {
        let ResolvedTemplate {
            from,
            to,
            cc,
            bcc,
            subject,
            body,
            layout,
            content_type,
            charset,
            data,
        } = resolved;

        let body = match body {
            BodySource::Literal(body) => body,
            BodySource::View(view) => {
                let layout = layout.or_else(|| self.settings.default_layout.clone());
                self.renderer
                    .render(&view, &data, layout.as_deref(), &subject)?
            }
        };

        let message = MessageBuilder::new(from, to, subject, body)
            .options(MessageOptions {
                cc,
                bcc,
                content_type: content_type.unwrap_or(self.settings.content_type),
                charset: charset.unwrap_or_else(|| self.settings.charset.clone()),
                headers: None,
            })
            .build(self.clock.now())?;
        Ok(message)
    }

    /// 下書きを記録し、確定した ID で閲覧 URL を埋め込む
    async fn persist_draft(&self, message: EmailMessage) -> Result<EmailMessage, DispatchError> {
        self.repository.insert(&message).await?;

        if !message.body().contains(VIEW_URL_PLACEHOLDER) {
            return Ok(message);
        }
        let view_url = self.view_urls.view_url(message.id());
        let message = message.with_view_url(&view_url)?;
        self.repository.update(&message).await?;
        Ok(message)
    }

    fn set_failed_recipients(&self, failed: Vec<String>) {
        *self
            .failed_recipients
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = failed;
    }
}
