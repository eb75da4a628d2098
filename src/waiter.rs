//! API 响应等待器
//!
//! 以 echo 为键登记等待者，收到带相同 echo 的响应时投递给对应调用方。
//! 锁只在增删查表时持有，从不跨越 channel 收发或 await。

use crate::error::ApiError;
use crate::event::ApiResponse;
use crate::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// 默认 API 超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static ECHO_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 生成 echo：动作名 + 进程内单调递增序号
pub fn next_echo(action: &str) -> String {
    let count = ECHO_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", action, count)
}

#[derive(Default)]
pub struct ResponseWaiter {
    waiters: RwLock<HashMap<String, mpsc::Sender<ApiResponse>>>,
}

impl ResponseWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个等待者。返回的 PendingWait 被丢弃时自动注销。
    pub fn register(&self, echo: impl Into<String>) -> PendingWait<'_> {
        let echo = echo.into();
        let (tx, rx) = mpsc::channel(1);

        let replaced = self
            .waiters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(echo.clone(), tx);
        if replaced.is_some() {
            warn!(target: "Api", "echo 重复登记，旧的等待者将收不到响应: {}", echo);
        }

        PendingWait {
            waiter: self,
            echo,
            rx,
        }
    }

    /// 投递响应。找不到等待者、或槽位已满时直接丢弃，返回是否投递成功。
    pub fn resolve(&self, response: ApiResponse) -> bool {
        let guard = self.waiters.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.get(&response.echo) else {
            debug!(target: "Api", "未找到 echo 对应的等待者，丢弃响应: {}", response.echo);
            return false;
        };

        match sender.try_send(response) {
            Ok(()) => true,
            Err(e) => {
                debug!(target: "Api", "响应投递失败，已丢弃: {}", e.into_inner().echo);
                false
            }
        }
    }

    /// 当前未完成的等待数
    pub fn len(&self) -> usize {
        self.waiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, echo: &str) -> bool {
        self.waiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(echo)
    }

    fn remove(&self, echo: &str) {
        self.waiters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(echo);
    }
}

/// 单次等待。只能被解析一次；无论成功、超时还是被取消，Drop 时都会从表中移除。
pub struct PendingWait<'a> {
    waiter: &'a ResponseWaiter,
    echo: String,
    rx: mpsc::Receiver<ApiResponse>,
}

impl PendingWait<'_> {
    pub fn echo(&self) -> &str {
        &self.echo
    }

    /// 等待响应或超时
    pub async fn wait(mut self, timeout: Duration) -> Result<ApiResponse, ApiError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(ApiError::Closed {
                echo: self.echo.clone(),
            }),
            Err(_) => Err(ApiError::Timeout {
                echo: self.echo.clone(),
            }),
        }
    }
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        self.waiter.remove(&self.echo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn ok_response(echo: &str) -> ApiResponse {
        ApiResponse {
            status: "ok".to_string(),
            retcode: 0,
            data: json!({ "message_id": 7 }),
            echo: echo.to_string(),
            msg: None,
            wording: None,
        }
    }

    #[test]
    fn resolve_unknown_echo_is_noop() {
        let waiter = ResponseWaiter::new();
        assert!(!waiter.resolve(ok_response("nobody_1")));
        assert!(waiter.is_empty());
    }

    #[tokio::test]
    async fn resolve_unblocks_matching_wait() {
        let waiter = ResponseWaiter::new();
        let pending = waiter.register("send_group_msg_42");
        assert_eq!(waiter.len(), 1);

        assert!(waiter.resolve(ok_response("send_group_msg_42")));
        let resp = pending.wait(DEFAULT_TIMEOUT).await.expect("response");
        assert_eq!(resp.echo, "send_group_msg_42");
        assert_eq!(resp.data["message_id"], 7);
        assert!(waiter.is_empty());
    }

    #[tokio::test]
    async fn second_response_for_same_echo_is_dropped() {
        let waiter = ResponseWaiter::new();
        let pending = waiter.register("get_msg_1");

        assert!(waiter.resolve(ok_response("get_msg_1")));
        assert!(!waiter.resolve(ok_response("get_msg_1")));

        let resp = pending.wait(DEFAULT_TIMEOUT).await.expect("response");
        assert_eq!(resp.status, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_wait_and_late_response_is_dropped() {
        let waiter = ResponseWaiter::new();
        let pending = waiter.register("get_group_info_9");

        let err = pending.wait(DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(waiter.is_empty());
        assert!(!waiter.resolve(ok_response("get_group_info_9")));
    }

    #[test]
    fn dropping_pending_wait_cleans_up() {
        let waiter = ResponseWaiter::new();
        {
            let _pending = waiter.register("delete_msg_3");
            assert!(waiter.contains("delete_msg_3"));
        }
        assert!(!waiter.contains("delete_msg_3"));
    }

    #[test]
    fn echo_tokens_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| (0..500).map(|_| next_echo("send_msg")).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for echo in h.join().unwrap() {
                assert!(seen.insert(echo), "duplicate echo");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
