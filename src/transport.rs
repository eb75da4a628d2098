//! 出站帧写入
//!
//! 所有写操作经由同一把异步锁串行化，帧之间不会交错。

use crate::error::BoxError;
use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::{self, protocol::Message as WsMessage};

pub type TraitSink = Box<dyn Sink<WsMessage, Error = tungstenite::Error> + Send + Unpin>;

/// 连接写端抽象
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// 序列化并写出一个 JSON 帧
    async fn write_json(&self, frame: &Value) -> Result<(), BoxError>;

    /// 机器人自身 QQ 号，未知时为 0
    fn self_id(&self) -> i64;
}

/// WebSocket 写端
pub struct WsTransport {
    writer: AsyncMutex<TraitSink>,
    self_id: AtomicI64,
}

impl WsTransport {
    pub fn new(sink: TraitSink, self_id: i64) -> Self {
        Self {
            writer: AsyncMutex::new(sink),
            self_id: AtomicI64::new(self_id),
        }
    }

    pub fn set_self_id(&self, id: i64) {
        self.self_id.store(id, Ordering::Relaxed);
    }

    /// 关闭写端，发送 Close 帧
    pub async fn close(&self) -> Result<(), BoxError> {
        let mut guard = self.writer.lock().await;
        guard.close().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn write_json(&self, frame: &Value) -> Result<(), BoxError> {
        let text = simd_json::to_string(frame)?;
        let mut guard = self.writer.lock().await;
        guard.send(WsMessage::Text(text.into())).await?;
        Ok(())
    }

    fn self_id(&self) -> i64 {
        self.self_id.load(Ordering::Relaxed)
    }
}
