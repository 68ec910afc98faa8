//! # Mailer 設定
//!
//! 環境変数から送信経路・テンプレート・ディスパッチャの設定を読み込む。
//!
//! `SMTP_` で始まる変数は接頭辞を除いて小文字化したキーで SMTP オプションに渡す
//! （`SMTP_HOST` → `host`）。認識できないキーは起動時にエラーとなる。

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    str::FromStr,
};

use postflow_domain::{
    DomainError,
    email::{AddressFilter, ContentType, DEFAULT_CHARSET, TemplateData, TemplateRegistry},
};
use postflow_infra::transport::{
    DEFAULT_SENDMAIL_COMMAND,
    LocalOptions,
    SmtpOptions,
    TransportConfig,
    TransportError,
};
use thiserror::Error;

use crate::usecase::DispatcherSettings;

/// 設定の読み込みで発生するエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値を解釈できない
    #[error("{key} の値が不正です: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// 送信経路のオプションが不正
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// テンプレート定義ファイルを読めない
    #[error("テンプレート定義を読み込めません: {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// テンプレート定義の内容が不正
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Mailer の設定
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// データベース接続 URL
    pub database_url:    String,
    /// 送信経路
    pub transport:       TransportConfig,
    /// テンプレート定義（JSON）のパス
    pub templates_path:  Option<PathBuf>,
    /// ビューディレクトリ
    pub view_path:       PathBuf,
    /// ビューに適用する既定のレイアウト
    pub default_layout:  Option<String>,
    pub charset:         String,
    pub content_type:    ContentType,
    /// すべてのテンプレートに重ねるデータ
    pub global_data:     TemplateData,
    /// 許可する宛先パターン
    pub email_filters:   Vec<String>,
    /// すべての宛先を差し替えるアドレス
    pub catch_all_email: Option<String>,
    pub dry_run:         bool,
    pub logging:         bool,
    /// 閲覧 URL のベース
    pub base_url:        String,
}

impl MailerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// 変数の組から設定を読み込む
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let content_type = match get("MAILER_CONTENT_TYPE") {
            Some(value) => ContentType::from_str(&value).map_err(|e| ConfigError::Invalid {
                key:    "MAILER_CONTENT_TYPE",
                reason: e.to_string(),
            })?,
            None => ContentType::default(),
        };

        let global_data = match get("MAILER_GLOBAL_DATA") {
            Some(value) => {
                serde_json::from_str::<TemplateData>(&value).map_err(|e| ConfigError::Invalid {
                    key:    "MAILER_GLOBAL_DATA",
                    reason: e.to_string(),
                })?
            }
            None => TemplateData::new(),
        };

        let email_filters = get("MAILER_EMAIL_FILTERS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|pattern| !pattern.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            transport: transport_config(&vars)?,
            templates_path: get("MAILER_TEMPLATES_PATH").map(PathBuf::from),
            view_path: get("MAILER_VIEW_PATH")
                .map_or_else(|| PathBuf::from("templates/email"), PathBuf::from),
            default_layout: get("MAILER_DEFAULT_LAYOUT"),
            charset: get("MAILER_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            content_type,
            global_data,
            email_filters,
            catch_all_email: get("MAILER_CATCH_ALL_EMAIL"),
            dry_run: parse_flag("MAILER_DRY_RUN", get("MAILER_DRY_RUN"), false)?,
            logging: parse_flag("MAILER_LOGGING", get("MAILER_LOGGING"), true)?,
            base_url: get("MAILER_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
        })
    }

    /// テンプレート定義を読み込む（未設定なら空のレジストリ）
    pub fn load_registry(&self) -> Result<TemplateRegistry, ConfigError> {
        let Some(path) = &self.templates_path else {
            return Ok(TemplateRegistry::default());
        };
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(TemplateRegistry::from_json_str(&json)?)
    }

    /// ディスパッチャの動作設定
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            filter:         AddressFilter::new(self.email_filters.clone()),
            catch_all:      self.catch_all_email.clone(),
            dry_run:        self.dry_run,
            logging:        self.logging,
            default_layout: self.default_layout.clone(),
            charset:        self.charset.clone(),
            content_type:   self.content_type,
        }
    }
}

/// `MAILER_TRANSPORT` に応じた送信経路の設定を組み立てる
fn transport_config(vars: &HashMap<String, String>) -> Result<TransportConfig, ConfigError> {
    let kind = vars
        .get("MAILER_TRANSPORT")
        .map_or("local", String::as_str);

    match kind {
        "local" => Ok(TransportConfig::Local(LocalOptions {
            command:      vars
                .get("SENDMAIL_COMMAND")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_SENDMAIL_COMMAND.to_string()),
            extra_params: vars
                .get("SENDMAIL_EXTRA_PARAMS")
                .map(|v| v.split_whitespace().map(ToString::to_string).collect())
                .unwrap_or_default(),
        })),
        "smtp" => {
            let options: BTreeMap<String, String> = vars
                .iter()
                .filter_map(|(key, value)| {
                    key.strip_prefix("SMTP_")
                        .map(|option| (option.to_ascii_lowercase(), value.clone()))
                })
                .collect();
            Ok(TransportConfig::Smtp(SmtpOptions::from_map(&options)?))
        }
        other => Err(ConfigError::Invalid {
            key:    "MAILER_TRANSPORT",
            reason: format!("local または smtp を指定してください: {other}"),
        }),
    }
}

fn parse_flag(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("真偽値として解釈できません: {value}"),
        }),
    }
}
