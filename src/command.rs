use crate::event::MessageEvent;

pub struct CommandMatch<'a> {
    /// 指令后的参数文本 (已去除首部空白)
    pub args: &'a str,
    /// 被跳过的 @ 标记中的 QQ 号
    pub at_ids: Vec<String>,
}

/// 解析指令：跳过头部的 @ 标记与空白，匹配 [Prefix][Command]，返回参数
pub fn match_command<'a>(
    event: &'a MessageEvent,
    prefix: &str,
    command_name: &str,
) -> Option<CommandMatch<'a>> {
    let mut rest = event.plain_text.trim_start();
    let mut at_ids = Vec::new();

    while let Some(after) = rest.strip_prefix("[@QQ:") {
        let end = after.find(']')?;
        at_ids.push(after[..end].to_string());
        rest = after[end + 1..].trim_start();
    }

    let after_cmd = rest.strip_prefix(prefix)?.strip_prefix(command_name)?;
    // 指令名之后必须是结尾或空白，避免 /echoes 命中 /echo
    if after_cmd.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }

    Some(CommandMatch {
        args: after_cmd.trim_start(),
        at_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MessageType, Sender};
    use serde_json::Value;

    fn event(text: &str) -> MessageEvent {
        MessageEvent {
            message_type: MessageType::Group,
            group_id: 1,
            user_id: 2,
            message_id: 3,
            plain_text: text.to_string(),
            raw_text: text.to_string(),
            time: 0,
            at_me: false,
            sender: Sender::default(),
            raw: Value::Null,
        }
    }

    #[test]
    fn matches_command_with_args() {
        let ev = event("/echo  你好 世界");
        let cmd = match_command(&ev, "/", "echo").unwrap();
        assert_eq!(cmd.args, "你好 世界");
        assert!(cmd.at_ids.is_empty());
    }

    #[test]
    fn skips_leading_mentions() {
        let ev = event("[@QQ:10001]\n /ping");
        let cmd = match_command(&ev, "/", "ping").unwrap();
        assert_eq!(cmd.args, "");
        assert_eq!(cmd.at_ids, vec!["10001".to_string()]);
    }

    #[test]
    fn rejects_other_text() {
        assert!(match_command(&event("/echoes hi"), "/", "echo").is_none());
        assert!(match_command(&event("echo hi"), "/", "echo").is_none());
        assert!(match_command(&event("[@QQ:1"), "/", "echo").is_none());
    }
}
