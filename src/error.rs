use thiserror::Error;

/// 传输层错误 (WebSocket 写入、连接关闭等)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 请求帧写入失败，立即返回，不重试
    #[error("发送请求失败: {0}")]
    Transport(BoxError),

    /// 协议端返回 status != "ok"
    #[error("API 调用失败: {status} (retcode={retcode}){}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status {
        status: String,
        retcode: i64,
        message: Option<String>,
    },

    #[error("等待响应超时: {echo}")]
    Timeout { echo: String },

    #[error("响应通道已关闭: {echo}")]
    Closed { echo: String },

    #[error("数据编解码失败: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    /// 协议端返回的 status 字符串 (仅 Status 错误)
    pub fn status(&self) -> Option<&str> {
        match self {
            ApiError::Status { status, .. } => Some(status),
            _ => None,
        }
    }
}
