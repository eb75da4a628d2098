//! 请求/响应原语
//!
//! 调用流程: 生成 echo -> 登记等待 -> 写出请求帧 -> 等待响应或超时。
//! 任一出口 (成功、超时、写入失败、调用方被取消) 都会注销等待。

use crate::debug;
use crate::error::ApiError;
use crate::event::ApiResponse;
use crate::transport::Transport;
use crate::waiter::{self, ResponseWaiter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct ApiRequest<'a, T> {
    action: &'a str,
    params: T,
    echo: &'a str,
}

struct BotInner {
    transport: Arc<dyn Transport>,
    waiter: ResponseWaiter,
    timeout: Duration,
}

/// 连接句柄。克隆开销很小，可在插件任务间自由传递。
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, waiter::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(BotInner {
                transport,
                waiter: ResponseWaiter::new(),
                timeout,
            }),
        }
    }

    pub fn self_id(&self) -> i64 {
        self.inner.transport.self_id()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// 本连接的响应等待表，读循环通过它投递响应
    pub fn waiter(&self) -> &ResponseWaiter {
        &self.inner.waiter
    }

    /// 调用 API 并返回完整响应，不检查 status
    pub async fn call_response<P>(&self, action: &str, params: P) -> Result<ApiResponse, ApiError>
    where
        P: Serialize,
    {
        let echo = waiter::next_echo(action);
        let frame = serde_json::to_value(ApiRequest {
            action,
            params,
            echo: &echo,
        })?;

        // 先登记再写出，避免响应先于登记到达
        let pending = self.inner.waiter.register(echo);

        debug!(target: "Api", "-> {} ({})", action, pending.echo());
        self.inner
            .transport
            .write_json(&frame)
            .await
            .map_err(ApiError::Transport)?;

        pending.wait(self.inner.timeout).await
    }

    /// 调用 API，status 不为 ok 时返回错误，成功时返回 data
    pub async fn call<P>(&self, action: &str, params: P) -> Result<Value, ApiError>
    where
        P: Serialize,
    {
        let response = self.call_response(action, params).await?;
        check_response(response)
    }

    /// 调用 API 并将 data 反序列化为指定类型
    pub async fn call_as<P, R>(&self, action: &str, params: P) -> Result<R, ApiError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let data = self.call(action, params).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// 只写出请求，不等待响应
    pub async fn call_no_wait<P>(&self, action: &str, params: P) -> Result<(), ApiError>
    where
        P: Serialize,
    {
        let echo = waiter::next_echo(action);
        let frame = serde_json::to_value(ApiRequest {
            action,
            params,
            echo: &echo,
        })?;

        self.inner
            .transport
            .write_json(&frame)
            .await
            .map_err(ApiError::Transport)
    }
}

fn check_response(response: ApiResponse) -> Result<Value, ApiError> {
    if response.is_ok() {
        return Ok(response.data);
    }
    let message = response.message().map(str::to_string);
    Err(ApiError::Status {
        status: response.status,
        retcode: response.retcode,
        message,
    })
}
