//! # Postflow Mailer
//!
//! 登録済みテンプレートからメールを 1 通作成し、記録して送信する CLI。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `MAILER_TRANSPORT` | No | `local`（デフォルト）または `smtp` |
//! | `SMTP_HOST` / `SMTP_PORT` / `SMTP_ENCRYPTION` ... | No | SMTP オプション |
//! | `SENDMAIL_COMMAND` / `SENDMAIL_EXTRA_PARAMS` | No | ローカル sendmail |
//! | `MAILER_TEMPLATES_PATH` | No | テンプレート定義（JSON） |
//! | `MAILER_VIEW_PATH` | No | ビューディレクトリ（デフォルト: `templates/email`） |
//! | `MAILER_EMAIL_FILTERS` | No | 許可する宛先パターン（カンマ区切り） |
//! | `MAILER_CATCH_ALL_EMAIL` | No | すべての宛先を差し替えるアドレス |
//! | `MAILER_DRY_RUN` | No | `true` で送信しない |
//!
//! ## 実行方法
//!
//! ```bash
//! MAILER_TEMPLATES_PATH=templates/templates.json \
//!   cargo run -p postflow-mailer -- welcome --to=sam@example.com name=Sam
//! ```

use std::sync::Arc;

use postflow_domain::{clock::SystemClock, email::TemplateResolver};
use postflow_infra::{db, repository::PostgresEmailMessageRepository, transport::LazyTransport};
use postflow_mailer::{
    cli,
    config::MailerConfig,
    usecase::{BaseUrlViewUrlBuilder, Dispatcher, SendOutcome, TeraViewRenderer},
};
use postflow_shared::observability::{TracingConfig, init_tracing};

/// Mailer のエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("postflow-mailer"))?;

    let args = cli::parse_args(std::env::args().skip(1))?;
    let config = MailerConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("データベースに接続しました");

    let resolver = TemplateResolver::new(config.load_registry()?, config.global_data.clone());
    tracing::info!(
        templates = resolver.registry().len(),
        transport = config.transport.kind(),
        "テンプレートを読み込みました"
    );

    let dispatcher = Dispatcher::new(
        resolver,
        config.dispatcher_settings(),
        Arc::new(TeraViewRenderer::new(&config.view_path)?),
        Arc::new(BaseUrlViewUrlBuilder::new(config.base_url.clone())),
        Arc::new(LazyTransport::new(config.transport.clone())),
        Arc::new(PostgresEmailMessageRepository::new(pool)),
        Arc::new(SystemClock),
    );

    let message = dispatcher.create_from_template(&args.template, args.overrides)?;
    let message_id = message.id().clone();

    match dispatcher.send(message).await? {
        SendOutcome::Sent { recipients } => {
            tracing::info!(%message_id, recipients, "送信しました");
        }
        SendOutcome::DryRun { recipients } => {
            tracing::info!(%message_id, recipients, "dry-run のため送信していません");
        }
        SendOutcome::Suppressed => {
            tracing::warn!(%message_id, "宛先フィルタにより送信を抑止しました");
        }
    }

    let failed = dispatcher.failed_recipients();
    if !failed.is_empty() {
        tracing::warn!(%message_id, ?failed, "一部の宛先が拒否されました");
    }

    Ok(())
}
