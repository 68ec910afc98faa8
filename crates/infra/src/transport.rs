//! # メール送信経路
//!
//! 組み立て済みの [`EmailMessage`] を外部へ配送するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`Transport`] trait で送信経路を抽象化
//! - **2 つの実装**: SMTP（[`SmtpTransport`]）、ローカル sendmail（[`LocalTransport`]）
//! - **設定の列挙型**: 経路ごとのオプションは [`TransportConfig`] の各 variant が持つ
//! - **遅延初期化**: [`LazyTransport`] が初回送信時に 1 度だけ経路を構築する
//!
//! 解析できないアドレスはエラーにせず [`Delivery::failed`] で報告する。
//! 有効な宛先が 1 つもない場合は経路に接続しない。

mod envelope;
mod lazy;
mod local;
mod smtp;

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
pub use lazy::LazyTransport;
pub use local::LocalTransport;
use postflow_domain::email::EmailMessage;
pub use smtp::SmtpTransport;
use thiserror::Error;

/// メール送信トレイト
///
/// 送信は 1 通ずつ完了まで待つ。再送は行わない。
#[async_trait]
pub trait Transport: Send + Sync {
    /// メッセージを送信する
    ///
    /// 宛先単位の拒否は `Err` ではなく [`Delivery::failed`] に含めて返す。
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, TransportError>;
}

/// 送信結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// 経路が受け付けた宛先数（to + cc + bcc）
    pub delivered: usize,
    /// 拒否された宛先
    pub failed:    Vec<String>,
}

/// 送信経路のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 経路が認識しないオプション
    #[error("未知の送信オプションです: {0}")]
    UnknownOption(String),

    /// オプション値が不正
    #[error("送信設定が不正です: {0}")]
    InvalidConfig(String),

    /// 経路の構築に失敗
    #[error("送信経路の構築に失敗しました: {0}")]
    Build(String),

    /// 送信そのものに失敗
    #[error("送信に失敗しました: {0}")]
    Failure(String),
}

/// 送信経路の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// ローカルの sendmail コマンド
    Local(LocalOptions),
    /// SMTP リレー
    Smtp(SmtpOptions),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Local(LocalOptions::default())
    }
}

/// 設定から送信経路を構築する
pub fn build_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let transport: Arc<dyn Transport> = match config {
        TransportConfig::Local(options) => Arc::new(LocalTransport::new(options.clone())),
        TransportConfig::Smtp(options) => Arc::new(SmtpTransport::new(options)?),
    };
    tracing::debug!(transport = config.kind(), "送信経路を構築しました");
    Ok(transport)
}

impl TransportConfig {
    /// ログ出力用の経路名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Smtp(_) => "smtp",
        }
    }
}

/// ローカル sendmail のオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOptions {
    /// 実行するコマンド
    pub command:      String,
    /// コマンドの先頭にそのまま渡す追加引数
    pub extra_params: Vec<String>,
}

/// sendmail コマンドの既定パス
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/sbin/sendmail";

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            command:      DEFAULT_SENDMAIL_COMMAND.to_string(),
            extra_params: Vec::new(),
        }
    }
}

/// SMTP 接続の暗号化方式
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Encryption {
    /// 平文（Mailpit 等のローカル SMTP 向け）
    #[default]
    None,
    /// 平文で接続後に STARTTLS で昇格
    #[strum(serialize = "starttls")]
    StartTls,
    /// 接続時から TLS（SMTPS）
    Tls,
}

/// SMTP のオプション
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    pub host:         String,
    pub port:         u16,
    pub username:     Option<String>,
    pub password:     Option<String>,
    pub encryption:   Encryption,
    pub timeout_secs: u64,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            host:         "localhost".to_string(),
            port:         25,
            username:     None,
            password:     None,
            encryption:   Encryption::None,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for SmtpOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("encryption", &self.encryption)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SmtpOptions {
    /// キー・値の組からオプションを作る
    ///
    /// 受け付けるキーは `host`, `port`, `username`, `password`, `encryption`,
    /// `timeout` のみ。指定のないキーは既定値のまま。
    ///
    /// # Errors
    ///
    /// - 未知のキーは `UnknownOption`
    /// - 数値や暗号化方式として解釈できない値は `InvalidConfig`
    pub fn from_map(options: &BTreeMap<String, String>) -> Result<Self, TransportError> {
        let mut result = Self::default();
        for (key, value) in options {
            match key.as_str() {
                "host" => result.host = value.clone(),
                "port" => result.port = parse_value(key, value)?,
                "username" => result.username = Some(value.clone()),
                "password" => result.password = Some(value.clone()),
                "encryption" => result.encryption = parse_value(key, value)?,
                "timeout" => result.timeout_secs = parse_value(key, value)?,
                _ => return Err(TransportError::UnknownOption(key.clone())),
            }
        }
        Ok(result)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TransportError> {
    value
        .parse()
        .map_err(|_| TransportError::InvalidConfig(format!("{key} の値が不正です: {value}")))
}
