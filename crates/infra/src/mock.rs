//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリの送信経路とリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! postflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use postflow_domain::email::{EmailMessage, EmailMessageId};

use crate::{
    error::InfraError,
    repository::EmailMessageRepository,
    transport::{Delivery, Transport, TransportError},
};

// ===== MockTransport =====

/// 送信したメッセージを記録する送信経路
#[derive(Clone, Default)]
pub struct MockTransport {
    sent:     Arc<Mutex<Vec<EmailMessage>>>,
    rejected: Vec<String>,
    failure:  Option<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先を拒否する
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            rejected: addresses.iter().map(|a| (*a).to_string()).collect(),
            ..Self::default()
        }
    }

    /// すべての送信を `Failure` にする
    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            failure: Some(detail.into()),
            ..Self::default()
        }
    }

    /// 経路に渡されたメッセージ
    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, TransportError> {
        if let Some(detail) = &self.failure {
            return Err(TransportError::Failure(detail.clone()));
        }
        self.sent.lock().unwrap().push(message.clone());

        let (failed, delivered): (Vec<String>, Vec<String>) = message
            .to()
            .iter()
            .chain(message.cc())
            .chain(message.bcc())
            .cloned()
            .partition(|address| self.rejected.contains(address));

        Ok(Delivery {
            delivered: delivered.len(),
            failed,
        })
    }
}

// ===== MockEmailMessageRepository =====

/// 書き込みを順に記録するリポジトリ
#[derive(Clone, Default)]
pub struct MockEmailMessageRepository {
    writes:  Arc<Mutex<Vec<EmailMessage>>>,
    failing: bool,
}

impl MockEmailMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// すべての書き込みを失敗させる
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// insert / update された順のスナップショット
    pub fn writes(&self) -> Vec<EmailMessage> {
        self.writes.lock().unwrap().clone()
    }

    /// 指定 ID の最新の状態
    pub fn latest(&self, id: &EmailMessageId) -> Option<EmailMessage> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.id() == id)
            .cloned()
    }

    fn check_available(&self) -> Result<(), InfraError> {
        if self.failing {
            return Err(InfraError::unexpected("データベースに接続できません"));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailMessageRepository for MockEmailMessageRepository {
    async fn insert(&self, message: &EmailMessage) -> Result<(), InfraError> {
        self.check_available()?;
        let mut writes = self.writes.lock().unwrap();
        if writes.iter().any(|m| m.id() == message.id()) {
            return Err(InfraError::conflict(
                "EmailMessage",
                message.id().to_string(),
            ));
        }
        writes.push(message.clone());
        Ok(())
    }

    async fn update(&self, message: &EmailMessage) -> Result<(), InfraError> {
        self.check_available()?;
        let mut writes = self.writes.lock().unwrap();
        if !writes.iter().any(|m| m.id() == message.id()) {
            return Err(InfraError::not_found(
                "EmailMessage",
                message.id().to_string(),
            ));
        }
        writes.push(message.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &EmailMessageId) -> Result<Option<EmailMessage>, InfraError> {
        self.check_available()?;
        Ok(self.latest(id))
    }
}
