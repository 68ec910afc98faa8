//! # ドメイン層エラー定義
//!
//! テンプレート解決とメッセージ組み立てで発生するエラー型。
//!
//! ## エラーの種類
//!
//! | エラー種別 | 発生箇所 | 用途 |
//! |-----------|---------|------|
//! | `TemplateNotFound` | `TemplateResolver` | 未登録のテンプレート名 |
//! | `MissingField` | `TemplateResolver` / `MessageBuilder` | 必須設定（from/to/subject/body）の欠落 |
//! | `Validation` | `MessageBuilder` / `EmailMessage` | 件名長超過、送信済みメッセージの変更など |

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// テンプレートが登録されていない
    #[error("メールテンプレート `{0}` が見つかりません")]
    TemplateNotFound(String),

    /// 必須フィールドが設定されていない
    ///
    /// `body` はビュー参照（`view`）でも代替できるため、
    /// 両方とも欠けている場合に `"body"` を返す。
    #[error("設定に `{0}` が含まれていません")]
    MissingField(&'static str),

    /// バリデーションエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
