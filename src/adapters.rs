//! 连接驱动
//!
//! onebot: 反向/正向 WebSocket；console: 从标准输入模拟消息。

pub mod console;
pub mod onebot;
