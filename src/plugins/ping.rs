use crate::bot::Bot;
use crate::command::match_command;
use crate::event::MessageEvent;
use crate::info;
use std::sync::Arc;

pub const NAME: &str = "ping";

/// `/ping` 或 @机器人 时回复 pong
pub async fn handle(_bot: Bot, event: Arc<MessageEvent>) -> String {
    if match_command(&event, "/", "ping").is_none() && !event.at_me {
        return String::new();
    }
    info!(target: "Plugin", "收到 ping: {} ({})", event.nickname(), event.user_id);
    "pong".to_string()
}
