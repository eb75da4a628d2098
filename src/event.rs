//! 入站帧分类
//!
//! 每个 WebSocket 帧要么是 API 响应 (带 status)，要么是事件。
//! 只有群聊/私聊消息事件会被转换为 MessageEvent，其余事件忽略。

use crate::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod render;

pub use render::{is_at_me, render_message};

/// API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub echo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wording: Option<String>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// 协议端给出的错误描述 (msg 优先，其次 wording)
    pub fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.wording.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Group,
    Private,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Group => "group",
            MessageType::Private => "private",
        }
    }
}

/// 发送者信息，字段均为可选
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub title: String,
}

impl Sender {
    /// 显示名称 (优先群名片，其次昵称)
    pub fn display_name(&self) -> &str {
        if !self.card.is_empty() {
            &self.card
        } else if !self.nickname.is_empty() {
            &self.nickname
        } else {
            "Unknown"
        }
    }
}

/// 消息事件。每个入站消息帧构造一次，之后只读。
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message_type: MessageType,
    /// 私聊时为 0
    pub group_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    /// 可读文本 (消息段已渲染)
    pub plain_text: String,
    /// 原始消息 (带 CQ 码)
    pub raw_text: String,
    pub time: i64,
    /// 是否 @ 了机器人
    pub at_me: bool,
    pub sender: Sender,
    /// 原始 JSON
    pub raw: Value,
}

impl MessageEvent {
    pub fn is_group(&self) -> bool {
        self.group_id != 0
    }

    pub fn nickname(&self) -> &str {
        self.sender.display_name()
    }
}

/// 分类结果
#[derive(Debug)]
pub enum Frame {
    Response(ApiResponse),
    Message(Box<MessageEvent>),
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{0} 不存在或不是数字")]
    MissingField(&'static str),
}

/// 对入站帧进行分类
pub fn classify(frame: Value, self_id: i64) -> Result<Frame, EventError> {
    if frame.get("status").is_some() {
        match ApiResponse::deserialize(&frame) {
            Ok(response) => return Ok(Frame::Response(response)),
            // 心跳等事件也带 status 对象，解析失败时按普通事件继续处理
            Err(e) => debug!(target: "Event", "带 status 字段但不是 API 响应: {}", e),
        }
    }

    if frame.get("post_type").and_then(Value::as_str) != Some("message") {
        return Ok(Frame::Ignored);
    }

    let message_type = match frame.get("message_type").and_then(Value::as_str) {
        Some("group") => MessageType::Group,
        Some("private") => MessageType::Private,
        _ => return Ok(Frame::Ignored),
    };

    let user_id = get_int(&frame, "user_id").ok_or(EventError::MissingField("user_id"))?;
    let time = get_int(&frame, "time").ok_or(EventError::MissingField("time"))?;
    let group_id = match message_type {
        MessageType::Group => {
            get_int(&frame, "group_id").ok_or(EventError::MissingField("group_id"))?
        }
        MessageType::Private => 0,
    };

    let plain_text = render_message(frame.get("message"));
    let at_me = is_at_me(&plain_text, self_id);
    let raw_text = frame
        .get("raw_message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let message_id = get_int(&frame, "message_id").unwrap_or(0);
    let sender = frame
        .get("sender")
        .and_then(|s| Sender::deserialize(s).ok())
        .unwrap_or_default();

    Ok(Frame::Message(Box::new(MessageEvent {
        message_type,
        group_id,
        user_id,
        message_id,
        plain_text,
        raw_text,
        time,
        at_me,
        sender,
        raw: frame,
    })))
}

/// 读取数字字段，兼容整数与浮点编码
pub(crate) fn get_int(value: &Value, key: &str) -> Option<i64> {
    let v = value.get(key)?;
    v.as_i64()
        .or_else(|| v.as_u64().map(|n| n as i64))
        .or_else(|| v.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect_message(frame: Frame) -> MessageEvent {
        match frame {
            Frame::Message(ev) => *ev,
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn group_message_is_classified() {
        let frame = json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 987654321,
            "user_id": 111222333,
            "message": "hello",
            "time": 1234567890
        });

        let ev = expect_message(classify(frame, 1707899218).unwrap());
        assert_eq!(ev.plain_text, "hello");
        assert_eq!(ev.group_id, 987654321);
        assert_eq!(ev.user_id, 111222333);
        assert_eq!(ev.time, 1234567890);
        assert_eq!(ev.message_type, MessageType::Group);
        assert!(!ev.at_me);
        assert!(ev.is_group());
    }

    #[test]
    fn private_message_with_float_ids() {
        let frame = json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 42.0,
            "time": 1700000000.0,
            "message_id": 5,
            "raw_message": "hi[CQ:face,id=1]",
            "message": [
                { "type": "text", "data": { "text": "hi" } },
                { "type": "face", "data": { "id": "1" } }
            ],
            "sender": { "user_id": 42, "nickname": "小明" }
        });

        let ev = expect_message(classify(frame, 1).unwrap());
        assert_eq!(ev.group_id, 0);
        assert_eq!(ev.user_id, 42);
        assert_eq!(ev.message_id, 5);
        assert_eq!(ev.raw_text, "hi[CQ:face,id=1]");
        assert_eq!(ev.plain_text, "hi\n[QQ表情 ID:1]");
        assert_eq!(ev.nickname(), "小明");
        assert!(!ev.is_group());
    }

    #[test]
    fn mention_of_self_sets_at_me() {
        let frame = json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 1,
            "user_id": 2,
            "time": 3,
            "message": [
                { "type": "at", "data": { "qq": "10001" } },
                { "type": "text", "data": { "text": " 在吗" } }
            ]
        });

        let ev = expect_message(classify(frame, 10001).unwrap());
        assert!(ev.at_me);
        assert_eq!(ev.plain_text, "[@QQ:10001]\n 在吗");
    }

    #[test]
    fn missing_required_fields_are_errors() {
        let no_user = json!({
            "post_type": "message", "message_type": "private", "time": 1, "message": "x"
        });
        assert!(matches!(
            classify(no_user, 0),
            Err(EventError::MissingField("user_id"))
        ));

        let no_time = json!({
            "post_type": "message", "message_type": "private", "user_id": 1, "message": "x"
        });
        assert!(matches!(
            classify(no_time, 0),
            Err(EventError::MissingField("time"))
        ));

        let no_group = json!({
            "post_type": "message", "message_type": "group", "user_id": 1, "time": 1
        });
        assert!(matches!(
            classify(no_group, 0),
            Err(EventError::MissingField("group_id"))
        ));

        let string_user = json!({
            "post_type": "message", "message_type": "private", "user_id": "1", "time": 1
        });
        assert!(classify(string_user, 0).is_err());
    }

    #[test]
    fn non_message_frames_are_ignored() {
        let heartbeat = json!({
            "post_type": "meta_event", "meta_event_type": "heartbeat", "time": 1
        });
        assert!(matches!(classify(heartbeat, 0).unwrap(), Frame::Ignored));

        let notice = json!({ "post_type": "notice", "notice_type": "group_increase" });
        assert!(matches!(classify(notice, 0).unwrap(), Frame::Ignored));

        let guild = json!({ "post_type": "message", "message_type": "guild", "user_id": 1, "time": 1 });
        assert!(matches!(classify(guild, 0).unwrap(), Frame::Ignored));

        let heartbeat_with_status = json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
            "status": { "online": true, "good": true },
            "interval": 5000
        });
        assert!(matches!(
            classify(heartbeat_with_status, 0).unwrap(),
            Frame::Ignored
        ));
    }

    #[test]
    fn status_field_marks_api_response() {
        let frame = json!({
            "status": "ok",
            "retcode": 0,
            "data": { "message_id": 99 },
            "echo": "send_group_msg_42",
            "post_type": "message"
        });

        match classify(frame, 0).unwrap() {
            Frame::Response(resp) => {
                assert!(resp.is_ok());
                assert_eq!(resp.echo, "send_group_msg_42");
                assert_eq!(resp.data["message_id"], 99);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn failed_response_exposes_message() {
        let frame = json!({ "status": "failed", "retcode": 1404, "wording": "消息不存在", "echo": "get_msg_1" });
        match classify(frame, 0).unwrap() {
            Frame::Response(resp) => {
                assert!(!resp.is_ok());
                assert_eq!(resp.message(), Some("消息不存在"));
            }
            other => panic!("expected response, got {:?}", other),
        }
    }
}
