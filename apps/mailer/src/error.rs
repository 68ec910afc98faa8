//! # Mailer エラー定義
//!
//! ディスパッチの各段階で発生するエラーを 1 つの型に集約する。
//!
//! | variant | 発生源 |
//! |---------|--------|
//! | `Domain` | テンプレート解決・メッセージ組み立て |
//! | `Render` | ビューの描画 |
//! | `Transport` | 送信経路（未知のオプション、送信失敗） |
//! | `Persistence` | メッセージの記録 |

use postflow_domain::DomainError;
use postflow_infra::{InfraError, transport::TransportError};
use thiserror::Error;

/// ディスパッチで発生するエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// ドメインエラー
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// ビューの描画に失敗
    #[error("ビューの描画に失敗しました: {0}")]
    Render(String),

    /// 送信経路のエラー
    #[error("送信経路のエラー: {0}")]
    Transport(#[from] TransportError),

    /// 永続化に失敗
    #[error("メッセージの記録に失敗しました: {0}")]
    Persistence(#[from] InfraError),
}
