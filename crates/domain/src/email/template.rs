//! # テンプレート
//!
//! 起動時に登録される名前付きメール設定と、その解決処理。
//!
//! ## マージ規則
//!
//! 1. 登録済みテンプレートの設定に呼び出し側の上書きを重ねる（キー単位で上書きが優先）
//! 2. `data` は丸ごと置き換えずキー単位でマージする
//! 3. グローバルデータを最後に重ねる（同じキーはグローバルデータが優先）
//!
//! マージ後に `from` / `to` / `subject` と `body` または `view` のいずれかが
//! 欠けていれば `MissingField` を返す。

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{
    message::ContentType,
    placeholder::{TemplateData, substitute},
};
use crate::DomainError;

/// テンプレート設定
///
/// アドレス項目は単一の文字列でも配列でも記述できる。
///
/// ```json
/// {
///   "from": "noreply@example.com",
///   "to": ["a@example.com", "b@example.com"],
///   "subject": "ようこそ {name} さん",
///   "view": "welcome",
///   "data": { "name": "ゲスト" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    #[serde(default, deserialize_with = "one_or_many")]
    pub from:         Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to:           Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc:           Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub bcc:          Option<Vec<String>>,
    #[serde(default)]
    pub subject:      Option<String>,
    /// 本文リテラル（`view` より優先）
    #[serde(default)]
    pub body:         Option<String>,
    /// ビュー参照
    #[serde(default)]
    pub view:         Option<String>,
    #[serde(default)]
    pub layout:       Option<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub charset:      Option<String>,
    #[serde(default)]
    pub data:         TemplateData,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
            OneOrMany::One(address) => vec![address],
            OneOrMany::Many(addresses) => addresses,
        }),
    )
}

impl TemplateConfig {
    /// `overrides` をキー単位で重ねた設定を返す
    pub fn merged_with(self, overrides: TemplateConfig) -> TemplateConfig {
        let mut data = self.data;
        data.extend(overrides.data);

        TemplateConfig {
            from: overrides.from.or(self.from),
            to: overrides.to.or(self.to),
            cc: overrides.cc.or(self.cc),
            bcc: overrides.bcc.or(self.bcc),
            subject: overrides.subject.or(self.subject),
            body: overrides.body.or(self.body),
            view: overrides.view.or(self.view),
            layout: overrides.layout.or(self.layout),
            content_type: overrides.content_type.or(self.content_type),
            charset: overrides.charset.or(self.charset),
            data,
        }
    }
}

/// テンプレートレジストリ
///
/// 起動時に一度だけ構築し、以後は読み取り専用で共有する。
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateConfig>,
}

impl TemplateRegistry {
    pub fn new(templates: HashMap<String, TemplateConfig>) -> Self {
        Self { templates }
    }

    /// JSON オブジェクト（テンプレート名 → 設定）から構築する
    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let templates: HashMap<String, TemplateConfig> = serde_json::from_str(json)
            .map_err(|e| DomainError::Validation(format!("テンプレート定義が不正です: {e}")))?;
        Ok(Self::new(templates))
    }

    pub fn with_template(mut self, name: impl Into<String>, config: TemplateConfig) -> Self {
        self.templates.insert(name.into(), config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateConfig> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// 本文の取得元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// プレースホルダ置換済みの本文
    Literal(String),
    /// ビュー参照（描画は上位層のレンダラーが行う）
    View(String),
}

/// 解決済みテンプレート
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    pub from:         Vec<String>,
    pub to:           Vec<String>,
    pub cc:           Vec<String>,
    pub bcc:          Vec<String>,
    /// プレースホルダ置換済みの件名
    pub subject:      String,
    pub body:         BodySource,
    pub layout:       Option<String>,
    pub content_type: Option<ContentType>,
    pub charset:      Option<String>,
    pub data:         TemplateData,
}

impl ResolvedTemplate {
    /// マージ済みの設定を解決する
    ///
    /// `name` を持たない直接作成（`Dispatcher::create` 相当）でも使う。
    pub fn from_config(config: TemplateConfig) -> Result<Self, DomainError> {
        let from = config.from.ok_or(DomainError::MissingField("from"))?;
        let to = config.to.ok_or(DomainError::MissingField("to"))?;
        let subject = config.subject.ok_or(DomainError::MissingField("subject"))?;

        let body = match (config.body, config.view) {
            (Some(body), _) => BodySource::Literal(substitute(&body, &config.data)),
            (None, Some(view)) => BodySource::View(view),
            (None, None) => return Err(DomainError::MissingField("body")),
        };

        Ok(Self {
            from,
            to,
            cc: config.cc.unwrap_or_default(),
            bcc: config.bcc.unwrap_or_default(),
            subject: substitute(&subject, &config.data),
            body,
            layout: config.layout,
            content_type: config.content_type,
            charset: config.charset,
            data: config.data,
        })
    }
}

/// テンプレートリゾルバ
#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    registry:    TemplateRegistry,
    global_data: TemplateData,
}

impl TemplateResolver {
    pub fn new(registry: TemplateRegistry, global_data: TemplateData) -> Self {
        Self {
            registry,
            global_data,
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// 名前付きテンプレートを上書きとマージして解決する
    ///
    /// # Errors
    ///
    /// - 未登録の名前は `TemplateNotFound`
    /// - マージ後に必須項目が欠けていれば `MissingField`
    pub fn resolve(
        &self,
        name: &str,
        overrides: TemplateConfig,
    ) -> Result<ResolvedTemplate, DomainError> {
        let template = self
            .registry
            .get(name)
            .ok_or_else(|| DomainError::TemplateNotFound(name.to_string()))?;

        let merged = template.clone().merged_with(overrides);
        ResolvedTemplate::from_config(self.with_global_data(merged))
    }

    /// グローバルデータを重ねる（同じキーはグローバルデータが優先）
    pub fn with_global_data(&self, mut config: TemplateConfig) -> TemplateConfig {
        config
            .data
            .extend(self.global_data.iter().map(|(k, v)| (k.clone(), v.clone())));
        config
    }
}
