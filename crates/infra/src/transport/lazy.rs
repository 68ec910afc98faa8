//! 遅延初期化される送信経路
//!
//! 初回の送信で [`TransportConfig`] から経路を 1 度だけ構築し、以降は再利用する。
//! 構築に失敗した場合はセルを空のまま残し、次回の送信で再度構築を試みる。

use std::sync::Arc;

use async_trait::async_trait;
use postflow_domain::email::EmailMessage;
use tokio::sync::OnceCell;

use super::{Delivery, Transport, TransportConfig, TransportError, build_transport};

/// 初回送信時に構築される送信経路
pub struct LazyTransport {
    config: TransportConfig,
    inner:  OnceCell<Arc<dyn Transport>>,
}

impl LazyTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// 経路が構築済みか
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized()
    }

    /// 構築済みの経路を返す（未構築なら構築する）
    pub async fn get(&self) -> Result<&Arc<dyn Transport>, TransportError> {
        self.inner
            .get_or_try_init(|| async { build_transport(&self.config) })
            .await
    }
}

#[async_trait]
impl Transport for LazyTransport {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, TransportError> {
        self.get().await?.send(message).await
    }
}
