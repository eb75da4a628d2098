use crate::bot::Bot;
use crate::command::match_command;
use crate::event::MessageEvent;
use crate::warn;
use futures_util::future::BoxFuture;
use std::sync::Arc;

pub const NAME: &str = "group_status";

/// 管理员在群内发送 `/状态` 时查询群信息。
/// 处理函数内部再次调用 API，等待期间不阻塞其他插件。
pub fn handler(
    admins: Vec<i64>,
) -> impl Fn(Bot, Arc<MessageEvent>) -> BoxFuture<'static, String> + Send + Sync + 'static {
    let admins = Arc::new(admins);
    move |bot: Bot, event: Arc<MessageEvent>| -> BoxFuture<'static, String> {
        let admins = admins.clone();
        Box::pin(async move { handle(bot, event, &admins).await })
    }
}

async fn handle(bot: Bot, event: Arc<MessageEvent>, admins: &[i64]) -> String {
    if !event.is_group() || match_command(&event, "/", "状态").is_none() {
        return String::new();
    }
    if !admins.contains(&event.user_id) {
        return String::new();
    }

    match bot.get_group_info(event.group_id).await {
        Ok(info) => format!(
            "群名: {}\n群号: {}\n成员: {}/{}",
            info.group_name, info.group_id, info.member_count, info.max_member_count
        ),
        Err(e) => {
            warn!(target: "Plugin", "获取群信息失败: {}", e);
            format!("获取群信息失败: {}", e)
        }
    }
}
