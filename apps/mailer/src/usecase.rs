//! # ユースケース層
//!
//! メール送信のビジネスフローを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: 送信経路・リポジトリ・レンダラーを `Arc<dyn Trait>` で外部から注入
//! - **1 通ずつ完了まで待つ**: `send` は送信経路の応答を待ってから結果を返す
//!
//! ## モジュール構成
//!
//! - [`dispatcher`] - 作成・記録・送信の統合
//! - [`view_renderer`] - tera によるビュー描画
//! - [`view_url`] - 「ブラウザで表示」リンクの生成

pub mod dispatcher;
pub mod view_renderer;
pub mod view_url;

pub use dispatcher::{Dispatcher, DispatcherSettings, SendOutcome};
pub use view_renderer::{TeraViewRenderer, ViewRenderer};
pub use view_url::{BaseUrlViewUrlBuilder, ViewUrlBuilder};
