//! 入站帧处理与插件分发
//!
//! 读循环对每个帧调用 handle_frame：响应同步投递给等待者，
//! 消息事件为每个插件各开一个任务，读循环本身从不等待 API 调用。

use crate::bot::Bot;
use crate::event::{self, Frame, MessageEvent};
use crate::plugins::PluginRegistry;
use crate::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// handle_frame 的处理结果
#[derive(Debug)]
pub enum Handled {
    /// API 响应，是否找到了等待者
    Response(bool),
    /// 消息事件，每个插件一个任务
    Dispatched(Vec<JoinHandle<()>>),
    Ignored,
    /// 消息事件缺少必要字段，已丢弃
    Malformed,
}

#[derive(Clone)]
pub struct Dispatcher {
    bot: Bot,
    plugins: Arc<PluginRegistry>,
}

impl Dispatcher {
    pub fn new(bot: Bot, plugins: Arc<PluginRegistry>) -> Self {
        Self { bot, plugins }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn handle_frame(&self, frame: Value) -> Handled {
        match event::classify(frame, self.bot.self_id()) {
            Ok(Frame::Response(response)) => Handled::Response(self.bot.waiter().resolve(response)),
            Ok(Frame::Message(event)) => {
                log_message(&event);
                Handled::Dispatched(self.dispatch(*event))
            }
            Ok(Frame::Ignored) => Handled::Ignored,
            Err(e) => {
                warn!(target: "Event", "丢弃无效的消息事件: {}", e);
                Handled::Malformed
            }
        }
    }

    /// 将事件交给所有插件。每个插件在独立任务中运行，互不等待
    pub fn dispatch(&self, event: MessageEvent) -> Vec<JoinHandle<()>> {
        let event = Arc::new(event);
        self.plugins
            .get_all()
            .into_iter()
            .map(|(name, handler)| {
                let bot = self.bot.clone();
                let event = event.clone();
                tokio::spawn(async move {
                    let reply = handler(bot.clone(), event.clone()).await;
                    if reply.is_empty() {
                        return;
                    }
                    send_reply(&bot, &name, &event, reply).await;
                })
            })
            .collect()
    }
}

async fn send_reply(bot: &Bot, plugin: &str, event: &MessageEvent, reply: String) {
    let result = if event.group_id != 0 {
        bot.send_group_msg(event.group_id, reply).await
    } else {
        bot.send_private_msg(event.user_id, reply).await
    };

    match result {
        Ok(message_id) => {
            debug!(target: "Plugin", "[{}] 回复已发送 (message_id={})", plugin, message_id)
        }
        Err(e) => error!(target: "Plugin", "[{}] 回复发送失败: {}", plugin, e),
    }
}

fn log_message(event: &MessageEvent) {
    if event.is_group() {
        info!(
            target: "Chat",
            "[群:{}] {}({}): {}",
            event.group_id,
            event.nickname(),
            event.user_id,
            event.plain_text
        );
    } else {
        info!(
            target: "Chat",
            "[私聊] {}({}): {}",
            event.nickname(),
            event.user_id,
            event.plain_text
        );
    }
}
