//! # CLI 引数
//!
//! `postflow-mailer <template> [--to=ADDR ...] [--cc=ADDR ...] [--bcc=ADDR ...] [key=value ...]`
//! を解釈する。宛先フラグはテンプレートの宛先を置き換え、`key=value` は `data` への
//! 上書きとして渡す。

use postflow_domain::email::TemplateConfig;
use serde_json::Value;
use thiserror::Error;

/// 使い方
pub const USAGE: &str =
    "usage: postflow-mailer <template> [--to=ADDR ...] [--cc=ADDR ...] [--bcc=ADDR ...] [key=value ...]";

/// CLI 引数のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("テンプレート名が指定されていません\n{}", USAGE)]
    MissingTemplate,

    #[error("key=value 形式ではありません: {0}")]
    InvalidPair(String),

    #[error("未知のオプションです: {0}")]
    UnknownFlag(String),
}

/// 解釈済みの CLI 引数
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub template:  String,
    pub overrides: TemplateConfig,
}

/// 引数を解釈する（プログラム名は含めない）
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, CliError> {
    let mut args = args.into_iter();
    let template = args
        .next()
        .filter(|name| !name.is_empty())
        .ok_or(CliError::MissingTemplate)?;

    let mut overrides = TemplateConfig::default();
    for pair in args {
        if let Some(flag) = pair.strip_prefix("--") {
            let (name, address) = flag
                .split_once('=')
                .ok_or_else(|| CliError::UnknownFlag(pair.clone()))?;
            let target = match name {
                "to" => &mut overrides.to,
                "cc" => &mut overrides.cc,
                "bcc" => &mut overrides.bcc,
                _ => return Err(CliError::UnknownFlag(pair.clone())),
            };
            target.get_or_insert_with(Vec::new).push(address.to_string());
            continue;
        }

        let Some((key, value)) = pair.split_once('=').filter(|(key, _)| !key.is_empty()) else {
            return Err(CliError::InvalidPair(pair));
        };
        overrides
            .data
            .insert(key.to_string(), Value::String(value.to_string()));
    }

    Ok(CliArgs {
        template,
        overrides,
    })
}
