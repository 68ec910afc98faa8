//! ローカル sendmail 送信実装
//!
//! 整形済みメッセージを sendmail 互換コマンドの標準入力へ流し込む。
//! 引数は `<extra_params...> -i -f <from> -- <recipients...>` の順で渡す。

use std::process::Stdio;

use async_trait::async_trait;
use postflow_domain::email::EmailMessage;
use tokio::{io::AsyncWriteExt, process::Command};

use super::{Delivery, LocalOptions, Transport, TransportError, envelope};

/// ローカル sendmail 送信
#[derive(Debug, Clone)]
pub struct LocalTransport {
    options: LocalOptions,
}

impl LocalTransport {
    pub fn new(options: LocalOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LocalOptions {
        &self.options
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, TransportError> {
        let prepared = envelope::prepare(message)?;
        let Some(built) = prepared.message else {
            return Ok(Delivery {
                delivered: 0,
                failed:    prepared.rejected,
            });
        };

        let mut command = Command::new(&self.options.command);
        command.args(&self.options.extra_params).arg("-i");
        if let Some(from) = built.envelope().from() {
            command.arg("-f").arg(from.to_string());
        }
        command
            .arg("--")
            .args(built.envelope().to().iter().map(ToString::to_string))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            TransportError::Failure(format!("{} を起動できません: {e}", self.options.command))
        })?;

        // コマンドが入力を読まずに終了すると書き込みは EPIPE になる。
        // その場合も終了ステータスと stderr を優先して報告する。
        let written = match child.stdin.take() {
            Some(mut stdin) => {
                let result = stdin.write_all(&built.formatted()).await;
                // 標準入力を閉じて EOF を伝える
                drop(stdin);
                result
            }
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TransportError::Failure(format!("sendmail の終了待ち失敗: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Failure(format!(
                "sendmail が異常終了しました ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        written
            .map_err(|e| TransportError::Failure(format!("sendmail への書き込み失敗: {e}")))?;

        tracing::debug!(
            command = %self.options.command,
            delivered = prepared.delivered,
            "sendmail に引き渡しました"
        );

        Ok(Delivery {
            delivered: prepared.delivered,
            failed:    prepared.rejected,
        })
    }
}
