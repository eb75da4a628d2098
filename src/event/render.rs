//! 消息段 -> 可读文本

use serde_json::Value;

/// 将 message 字段渲染为可读文本。
/// 字符串原样返回；消息段数组逐段渲染，以换行连接，空片段跳过。
pub fn render_message(message: Option<&Value>) -> String {
    match message {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(segments)) => segments
            .iter()
            .filter(|seg| seg.is_object())
            .map(render_segment)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "[无法解析的消息]".to_string(),
    }
}

/// 文本中是否包含指向 self_id 的 @ 标记
pub fn is_at_me(plain_text: &str, self_id: i64) -> bool {
    plain_text.contains(&at_marker(self_id))
}

pub fn at_marker(user_id: i64) -> String {
    format!("[@QQ:{}]", user_id)
}

fn render_segment(seg: &Value) -> String {
    let Some(kind) = seg.get("type").and_then(Value::as_str) else {
        return "[未知消息]".to_string();
    };
    let Some(data) = seg.get("data").filter(|d| d.is_object()) else {
        return format!("[{}]", kind);
    };

    match kind {
        "text" => get_str(data, "text").to_string(),
        "at" => match get_id(data, "qq") {
            Some(qq) if qq == "all" => "[@全体成员]".to_string(),
            Some(qq) => format!("[@QQ:{}]", qq),
            None => "[@某人]".to_string(),
        },
        "face" => match get_id(data, "id") {
            Some(id) => format!("[QQ表情 ID:{}]", id),
            None => "[QQ表情]".to_string(),
        },
        "mface" => {
            let summary = get_str(data, "summary");
            let emoji_id = get_str(data, "emoji_id");
            if !summary.is_empty() {
                format!("[商城表情: {}]", summary)
            } else if !emoji_id.is_empty() {
                format!("[商城表情 ID:{}]", emoji_id)
            } else {
                "[商城表情]".to_string()
            }
        }
        "image" => {
            let mut info = vec!["[图片]".to_string()];
            push_labeled(&mut info, "描述", get_str(data, "summary"));
            push_labeled(&mut info, "文件", get_str(data, "file"));
            push_labeled(&mut info, "URL", get_str(data, "url"));
            if let Some(size) = format_size(get_num(data, "file_size")) {
                info.push(format!("大小:{}", size));
            }
            let sub_type = get_num(data, "sub_type");
            if sub_type > 0 {
                info.push(format!("子类型:{}", sub_type));
            }
            info.join(", ")
        }
        "record" => {
            let mut info = vec!["[语音]".to_string()];
            push_labeled(&mut info, "标识", get_str(data, "file"));
            push_labeled(&mut info, "URL", get_str(data, "url"));
            let size = get_num(data, "file_size");
            if size > 0 {
                info.push(format!("大小:{}KB", size / 1024));
            }
            push_labeled(&mut info, "路径", get_str(data, "path"));
            info.join(", ")
        }
        "video" => {
            let mut info = vec!["[视频]".to_string()];
            push_labeled(&mut info, "文件", get_str(data, "file"));
            push_labeled(&mut info, "在线", get_str(data, "url"));
            let size = get_num(data, "file_size");
            if size > 0 {
                info.push(format!("大小:{}MB", size / 1024 / 1024));
            }
            push_labeled(&mut info, "缩略图", get_str(data, "thumb"));
            info.join(", ")
        }
        "file" => {
            let mut info = vec!["[文件]".to_string()];
            let name = get_str(data, "name");
            if !name.is_empty() {
                info.push(format!("名称:{}", name));
            } else {
                push_labeled(&mut info, "文件", get_str(data, "file"));
            }
            push_labeled(&mut info, "ID", get_str(data, "file_id"));
            if let Some(size) = format_size(get_num(data, "file_size")) {
                info.push(format!("大小:{}", size));
            }
            info.join(", ")
        }
        "reply" => match get_id(data, "id") {
            Some(id) => format!("[回复消息 ID:{}]", id),
            None => "[回复]".to_string(),
        },
        "poke" => {
            let id = get_str(data, "id");
            if id.is_empty() {
                "[戳一戳]".to_string()
            } else {
                format!("[戳一戳 ID:{},TYPE:{}]", id, get_str(data, "type"))
            }
        }
        "dice" => format!("[骰子: {}]", get_str(data, "result")),
        "rps" => format!("[猜拳: {}]", get_str(data, "result")),
        "json" => "[卡片消息]".to_string(),
        "music" => "[音乐分享]".to_string(),
        "forward" => "[合并转发]".to_string(),
        other => format!("[{}]", other),
    }
}

fn push_labeled(info: &mut Vec<String>, label: &str, value: &str) {
    if !value.is_empty() {
        info.push(format!("{}:{}", label, value));
    }
}

/// 大于等于 1MB 时以 MB 显示，否则以 KB 显示
fn format_size(bytes: i64) -> Option<String> {
    if bytes <= 0 {
        return None;
    }
    if bytes >= 1024 * 1024 {
        Some(format!("{}MB", bytes / 1024 / 1024))
    } else {
        Some(format!("{}KB", bytes / 1024))
    }
}

fn get_str<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// 数字字段，协议端有时以字符串下发
fn get_num(data: &Value, key: &str) -> i64 {
    match data.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// ID 字段，兼容字符串与数字
fn get_id(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
