//! # Observability 基盤
//!
//! CLI / ワーカー向けのトレーシング初期化を提供する。
//!
//! - 出力先は stderr（stdout はコマンドの出力に使う）
//! - `LOG_FORMAT=json|pretty` で出力形式を切り替える
//! - `RUST_LOG` 未設定時は [`TracingConfig::default_filter`] を使う

use std::str::FromStr;

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,postflow=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（集約基盤向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown LOG_FORMAT={other:?}")),
        }
    }
}

impl LogFormat {
    /// 環境変数 `LOG_FORMAT` から読み取る
    ///
    /// 未設定なら既定値、解釈できない値なら警告を出して既定値を使う。
    /// subscriber の初期化前に呼ばれるため、警告は stderr に直接書く。
    pub fn from_env() -> Self {
        let Ok(value) = std::env::var("LOG_FORMAT") else {
            return Self::default();
        };
        value.parse().unwrap_or_else(|message: String| {
            eprintln!("WARNING: {message}, falling back to pretty");
            Self::default()
        })
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 起動ログに出すサービス名
    pub service_name:   String,
    pub log_format:     LogFormat,
    /// `RUST_LOG` 未設定時のフィルタディレクティブ
    pub default_filter: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    /// 環境変数から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    pub fn with_default_filter(self, default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            ..self
        }
    }
}

/// トレーシングを初期化する
///
/// [`tracing_error::ErrorLayer`] を登録するため、`InfraError` が捕捉する
/// SpanTrace に呼び出し経路が記録される。
///
/// # Errors
///
/// グローバル subscriber が設定済みの場合
#[cfg(feature = "observability")]
pub fn init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_filter));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;

    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "トレーシングを初期化しました"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ログ形式は大文字小文字と前後の空白を無視する() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
    }

    #[test]
    fn test_未知のログ形式はエラー() {
        assert!("xml".parse::<LogFormat>().is_err());
        assert!("".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_既定のフィルタを差し替えられる() {
        let config = TracingConfig::new("postflow-mailer", LogFormat::Json)
            .with_default_filter("warn");

        assert_eq!(config.service_name, "postflow-mailer");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_filter, "warn");
        assert_eq!(
            TracingConfig::new("x", LogFormat::Pretty).default_filter,
            DEFAULT_FILTER
        );
    }
}
