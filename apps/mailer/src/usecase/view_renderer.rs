//! # ビューレンダラー
//!
//! tera テンプレートエンジンでビュー参照の本文を描画する。
//!
//! ## 設計方針
//!
//! - **ディレクトリからの読み込み**: `{view_path}/**/*` を起動時に一括登録する
//! - **拡張子の補完**: 拡張子のないビュー名は `<name>.html` として解決する
//! - **レイアウト**: 描画したビューを `content`、件名を `title` としてレイアウトに渡す
//!
//! レイアウト側では `{{ content | safe }}` で本文を埋め込む。

use std::{error::Error as _, path::Path};

use postflow_domain::email::TemplateData;
use tera::{Context, Tera};

use crate::error::DispatchError;

/// ビューの描画を担当するトレイト
pub trait ViewRenderer: Send + Sync {
    /// ビューを描画し、レイアウトが指定されていれば包む
    fn render(
        &self,
        view: &str,
        data: &TemplateData,
        layout: Option<&str>,
        title: &str,
    ) -> Result<String, DispatchError>;
}

/// tera 実装のビューレンダラー
pub struct TeraViewRenderer {
    engine: Tera,
}

impl TeraViewRenderer {
    /// ビューディレクトリ配下のテンプレートを読み込む
    pub fn new(view_path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let pattern = format!("{}/**/*", view_path.as_ref().display());
        let engine = Tera::new(&pattern).map_err(render_error)?;
        tracing::debug!(
            view_path = %view_path.as_ref().display(),
            templates = engine.get_template_names().count(),
            "ビューを読み込みました"
        );
        Ok(Self { engine })
    }

    /// 名前と内容の組からレンダラーを作成する
    pub fn from_raw(templates: Vec<(&str, &str)>) -> Result<Self, DispatchError> {
        let mut engine = Tera::default();
        engine.add_raw_templates(templates).map_err(render_error)?;
        Ok(Self { engine })
    }

    /// ビュー名をテンプレート名に解決する
    fn template_name(view: &str) -> String {
        if Path::new(view).extension().is_some() {
            view.to_string()
        } else {
            format!("{view}.html")
        }
    }
}

impl ViewRenderer for TeraViewRenderer {
    fn render(
        &self,
        view: &str,
        data: &TemplateData,
        layout: Option<&str>,
        title: &str,
    ) -> Result<String, DispatchError> {
        let mut context = Context::new();
        for (key, value) in data {
            context.insert(key.as_str(), value);
        }

        let content = self
            .engine
            .render(&Self::template_name(view), &context)
            .map_err(render_error)?;

        let Some(layout) = layout else {
            return Ok(content);
        };

        context.insert("content", &content);
        context.insert("title", title);
        self.engine
            .render(&Self::template_name(layout), &context)
            .map_err(render_error)
    }
}

/// tera のエラーを原因の連鎖ごと文字列化する
fn render_error(error: tera::Error) -> DispatchError {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    DispatchError::Render(detail)
}
