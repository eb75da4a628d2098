use crate::bot::Bot;
use crate::command::match_command;
use crate::event::MessageEvent;
use std::sync::Arc;

pub const NAME: &str = "echo";

/// `/echo <内容>` 原样回显
pub async fn handle(_bot: Bot, event: Arc<MessageEvent>) -> String {
    match match_command(&event, "/", "echo") {
        Some(cmd) => cmd.args.to_string(),
        None => String::new(),
    }
}
