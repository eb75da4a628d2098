use crate::bot::Bot;
use crate::dispatch::Dispatcher;
use crate::error::BoxError;
use crate::message::Message;
use crate::plugins::PluginRegistry;
use crate::transport::Transport;
use crate::{debug, info};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const CONSOLE_USER_ID: i64 = 1;
const CONSOLE_SELF_ID: i64 = 10000;

/// 控制台写端：打印回复，并为每个请求回送一个成功响应
pub struct ConsoleTransport {
    responses: mpsc::UnboundedSender<Value>,
    next_message_id: AtomicI64,
    self_id: i64,
}

impl ConsoleTransport {
    pub fn new(self_id: i64, responses: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            responses,
            next_message_id: AtomicI64::new(1),
            self_id,
        }
    }

    fn response_data(&self, action: &str) -> Value {
        match action {
            "send_msg" | "send_private_msg" | "send_group_msg" => {
                json!({ "message_id": self.next_message_id.fetch_add(1, Ordering::Relaxed) })
            }
            "get_login_info" => json!({ "user_id": self.self_id, "nickname": "ConsoleBot" }),
            _ => json!({}),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn write_json(&self, frame: &Value) -> Result<(), BoxError> {
        let action = frame["action"].as_str().unwrap_or("unknown");

        match action {
            "send_msg" | "send_private_msg" | "send_group_msg" => {
                let content = match &frame["params"]["message"] {
                    Value::String(s) => s.clone(),
                    Value::Null => "[无内容]".to_string(),
                    other => serde_json::from_value::<Message>(other.clone())
                        .map(|m| m.to_cq_code())
                        .unwrap_or_else(|_| other.to_string()),
                };
                // 打印 Bot 回复
                println!("\x1b[36m[Bot Reply] > \x1b[0m{}", content);
            }
            _ => println!("\x1b[90m[API Call] > {}\x1b[0m", action),
        }

        let response = json!({
            "status": "ok",
            "retcode": 0,
            "data": self.response_data(action),
            "echo": frame["echo"],
        });
        self.responses.send(response).map_err(|_| "控制台已关闭")?;
        Ok(())
    }

    fn self_id(&self) -> i64 {
        self.self_id
    }
}

/// 构造一条模拟的私聊消息事件，输入中可包含 CQ 码
pub fn mock_event(line: &str, self_id: i64, message_id: i64) -> Value {
    let message = Message::parse_cq_code(line);
    json!({
        "post_type": "message",
        "message_type": "private",
        "sub_type": "friend",
        "time": chrono::Local::now().timestamp(),
        "self_id": self_id,
        "user_id": CONSOLE_USER_ID,
        "message_id": message_id,
        "raw_message": line,
        "message": message,
        "sender": { "user_id": CONSOLE_USER_ID, "nickname": "ConsoleUser" },
    })
}

/// 控制台模式：从标准输入读取消息并走完整的分发流程
pub async fn run(
    self_id: i64,
    timeout: Duration,
    plugins: Arc<PluginRegistry>,
) -> Result<(), BoxError> {
    let self_id = if self_id == 0 { CONSOLE_SELF_ID } else { self_id };
    let (tx, mut responses) = mpsc::unbounded_channel();
    let bot = Bot::with_timeout(Arc::new(ConsoleTransport::new(self_id, tx)), timeout);
    let dispatcher = Dispatcher::new(bot, plugins);

    info!(target: "Console", "已启动控制台模式。请输入消息 (例如: /echo hello)");
    info!(target: "Console", "模拟环境: User ID: {} | Self ID: {} (私聊)", CONSOLE_USER_ID, self_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                message_id += 1;
                dispatcher.handle_frame(mock_event(line, self_id, message_id));
            }
            Some(response) = responses.recv() => {
                debug!(target: "Console", "模拟响应: {}", response["echo"]);
                dispatcher.handle_frame(response);
            }
        }
    }

    info!(target: "Console", "标准输入已关闭");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Frame, classify};

    #[test]
    fn mock_event_classifies_as_private_message() {
        let frame = mock_event("hi [CQ:at,qq=10000]", 10000, 3);
        match classify(frame, 10000).unwrap() {
            Frame::Message(ev) => {
                assert_eq!(ev.user_id, CONSOLE_USER_ID);
                assert_eq!(ev.message_id, 3);
                assert_eq!(ev.plain_text, "hi \n[@QQ:10000]");
                assert!(ev.at_me);
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn console_transport_answers_every_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = ConsoleTransport::new(10000, tx);

        transport
            .write_json(&json!({
                "action": "send_private_msg",
                "params": { "user_id": 1, "message": "pong" },
                "echo": "send_private_msg_5"
            }))
            .await
            .unwrap();

        let resp = rx.recv().await.unwrap();
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["echo"], "send_private_msg_5");
        assert_eq!(resp["data"]["message_id"], 1);
    }
}
