// lib.rs
//
// ================================================================================
// Milora - OneBot v11 客户端 SDK 与插件分发
//
// 架构：单连接 WebSocket | echo 关联的请求/响应 | 插件并发分发 | TOML 配置
// ================================================================================

pub mod adapters;
pub mod api;
pub mod app;
pub mod bot;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod log;
pub mod message;
pub mod plugins;
pub mod transport;
pub mod waiter;

pub use app::{Milora, MiloraBuilder};
pub use bot::Bot;
pub use error::{ApiError, BoxError};
pub use event::{ApiResponse, MessageEvent, MessageType};
pub use message::{Message, MessageContent, Segment};
pub use plugins::{PluginHandler, PluginRegistry};

/// 常用导入
pub mod prelude {
    pub use crate::app::{Milora, MiloraBuilder};
    pub use crate::bot::Bot;
    pub use crate::config::AppConfig;
    pub use crate::error::ApiError;
    pub use crate::event::{MessageEvent, MessageType};
    pub use crate::message::{Message, MessageContent, Segment};
    pub use crate::plugins::PluginRegistry;
    pub use std::sync::Arc;
}
