//! OneBot v11 动作封装

use crate::bot::Bot;
use crate::error::ApiError;
use crate::message::{Message, MessageContent};
use crate::warn;
use serde::Serialize;
use serde_json::json;

pub mod types;

use types::*;

// ================= 参数定义 =================

#[derive(Serialize)]
struct SendGroupMsgParams {
    group_id: i64,
    message: MessageContent,
}

#[derive(Serialize)]
struct SendPrivateMsgParams {
    user_id: i64,
    message: MessageContent,
}

#[derive(Serialize)]
struct SendMsgParams {
    message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    message: MessageContent,
}

#[derive(Serialize)]
struct MessageIdParams {
    message_id: i64,
}

#[derive(Serialize)]
struct ForwardIdParams<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct SendLikeParams {
    user_id: i64,
    times: u8,
}

#[derive(Serialize)]
struct UserParams {
    user_id: i64,
    no_cache: bool,
}

#[derive(Serialize)]
struct GroupParams {
    group_id: i64,
    no_cache: bool,
}

#[derive(Serialize)]
struct GroupMemberParams {
    group_id: i64,
    user_id: i64,
    no_cache: bool,
}

#[derive(Serialize)]
struct GroupBanParams {
    group_id: i64,
    user_id: i64,
    duration: u32,
}

#[derive(Serialize)]
struct GroupKickParams {
    group_id: i64,
    user_id: i64,
    reject_add_request: bool,
}

#[derive(Serialize)]
struct GroupCardParams<'a> {
    group_id: i64,
    user_id: i64,
    card: &'a str,
}

#[derive(Serialize)]
struct GroupWholeBanParams {
    group_id: i64,
    enable: bool,
}

#[derive(Serialize)]
struct GroupPokeParams {
    group_id: i64,
    user_id: i64,
}

#[derive(Serialize)]
struct FriendPokeParams {
    user_id: i64,
}

// ================= API 定义 =================

impl Bot {
    /// 发送群消息，返回消息 ID
    pub async fn send_group_msg(
        &self,
        group_id: i64,
        message: impl Into<MessageContent>,
    ) -> Result<i64, ApiError> {
        let params = SendGroupMsgParams {
            group_id,
            message: message.into(),
        };
        let resp: Option<MessageId> = self.call_as("send_group_msg", params).await?;
        Ok(resp.unwrap_or_default().message_id)
    }

    /// 发送私聊消息，返回消息 ID
    pub async fn send_private_msg(
        &self,
        user_id: i64,
        message: impl Into<MessageContent>,
    ) -> Result<i64, ApiError> {
        let params = SendPrivateMsgParams {
            user_id,
            message: message.into(),
        };
        let resp: Option<MessageId> = self.call_as("send_private_msg", params).await?;
        Ok(resp.unwrap_or_default().message_id)
    }

    /// 通用发送。group_id 非 0 时发往群聊，否则发往私聊
    pub async fn send_msg(
        &self,
        group_id: i64,
        user_id: i64,
        message: impl Into<MessageContent>,
    ) -> Result<i64, ApiError> {
        let params = if group_id != 0 {
            SendMsgParams {
                message_type: "group",
                group_id: Some(group_id),
                user_id: None,
                message: message.into(),
            }
        } else {
            SendMsgParams {
                message_type: "private",
                group_id: None,
                user_id: Some(user_id),
                message: message.into(),
            }
        };
        let resp: Option<MessageId> = self.call_as("send_msg", params).await?;
        Ok(resp.unwrap_or_default().message_id)
    }

    /// 撤回消息
    pub async fn delete_msg(&self, message_id: i64) -> Result<(), ApiError> {
        self.call("delete_msg", MessageIdParams { message_id })
            .await
            .map(drop)
    }

    pub async fn get_msg(&self, message_id: i64) -> Result<MessageInfo, ApiError> {
        self.call_as("get_msg", MessageIdParams { message_id }).await
    }

    pub async fn get_forward_msg(&self, id: &str) -> Result<ForwardMessage, ApiError> {
        self.call_as("get_forward_msg", ForwardIdParams { id }).await
    }

    /// 点赞，次数限制在 1..=10
    pub async fn send_like(&self, user_id: i64, times: i32) -> Result<(), ApiError> {
        let times = times.clamp(1, 10) as u8;
        self.call("send_like", SendLikeParams { user_id, times })
            .await
            .map(drop)
    }

    pub async fn get_login_info(&self) -> Result<LoginInfo, ApiError> {
        let info: Option<LoginInfo> = self.call_as("get_login_info", json!({})).await?;
        Ok(info.unwrap_or_default())
    }

    pub async fn get_stranger_info(&self, user_id: i64) -> Result<StrangerInfo, ApiError> {
        let params = UserParams {
            user_id,
            no_cache: false,
        };
        self.call_as("get_stranger_info", params).await
    }

    pub async fn get_group_info(&self, group_id: i64) -> Result<GroupInfo, ApiError> {
        let params = GroupParams {
            group_id,
            no_cache: false,
        };
        self.call_as("get_group_info", params).await
    }

    pub async fn get_group_list(&self) -> Result<Vec<GroupInfo>, ApiError> {
        self.call_as("get_group_list", json!({})).await
    }

    pub async fn get_group_member_info(
        &self,
        group_id: i64,
        user_id: i64,
        no_cache: bool,
    ) -> Result<GroupMemberInfo, ApiError> {
        let params = GroupMemberParams {
            group_id,
            user_id,
            no_cache,
        };
        self.call_as("get_group_member_info", params).await
    }

    pub async fn get_friend_list(&self) -> Result<Vec<FriendInfo>, ApiError> {
        self.call_as("get_friend_list", json!({})).await
    }

    /// 群禁言，duration 为 0 时解除
    pub async fn set_group_ban(
        &self,
        group_id: i64,
        user_id: i64,
        duration: u32,
    ) -> Result<(), ApiError> {
        let params = GroupBanParams {
            group_id,
            user_id,
            duration,
        };
        self.call("set_group_ban", params).await.map(drop)
    }

    pub async fn set_group_kick(
        &self,
        group_id: i64,
        user_id: i64,
        reject_add_request: bool,
    ) -> Result<(), ApiError> {
        let params = GroupKickParams {
            group_id,
            user_id,
            reject_add_request,
        };
        self.call("set_group_kick", params).await.map(drop)
    }

    pub async fn set_group_card(
        &self,
        group_id: i64,
        user_id: i64,
        card: &str,
    ) -> Result<(), ApiError> {
        let params = GroupCardParams {
            group_id,
            user_id,
            card,
        };
        self.call("set_group_card", params).await.map(drop)
    }

    pub async fn set_group_whole_ban(&self, group_id: i64, enable: bool) -> Result<(), ApiError> {
        let params = GroupWholeBanParams { group_id, enable };
        self.call("set_group_whole_ban", params).await.map(drop)
    }

    /// 群聊戳一戳。请求写出失败时改为发送 poke 消息段
    pub async fn group_poke(&self, group_id: i64, user_id: i64) -> Result<(), ApiError> {
        match self
            .call("group_poke", GroupPokeParams { group_id, user_id })
            .await
        {
            Err(ApiError::Transport(e)) => {
                warn!(target: "Api", "group_poke 发送失败，改用消息段: {}", e);
                let msg = Message::new().poke(user_id);
                self.send_group_msg(group_id, msg).await.map(drop)
            }
            other => other.map(drop),
        }
    }

    /// 私聊戳一戳。请求写出失败时改为发送 poke 消息段
    pub async fn friend_poke(&self, user_id: i64) -> Result<(), ApiError> {
        match self.call("friend_poke", FriendPokeParams { user_id }).await {
            Err(ApiError::Transport(e)) => {
                warn!(target: "Api", "friend_poke 发送失败，改用消息段: {}", e);
                let msg = Message::new().poke(user_id);
                self.send_private_msg(user_id, msg).await.map(drop)
            }
            other => other.map(drop),
        }
    }

    pub async fn get_status(&self) -> Result<Status, ApiError> {
        self.call_as("get_status", json!({})).await
    }

    pub async fn get_version_info(&self) -> Result<VersionInfo, ApiError> {
        self.call_as("get_version_info", json!({})).await
    }

    pub async fn can_send_image(&self) -> Result<bool, ApiError> {
        let resp: CanSend = self.call_as("can_send_image", json!({})).await?;
        Ok(resp.yes)
    }

    pub async fn can_send_record(&self) -> Result<bool, ApiError> {
        let resp: CanSend = self.call_as("can_send_record", json!({})).await?;
        Ok(resp.yes)
    }
}

#[cfg(test)]
mod tests {
    use crate::bot::tests::mock_bot;
    use crate::event::ApiResponse;
    use serde_json::{Value, json};
    use std::sync::atomic::Ordering;

    fn ok(echo: &str, data: Value) -> ApiResponse {
        ApiResponse {
            status: "ok".to_string(),
            retcode: 0,
            data,
            echo: echo.to_string(),
            msg: None,
            wording: None,
        }
    }

    #[tokio::test]
    async fn send_group_msg_returns_message_id() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.send_group_msg(10, "hello").await })
        };

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame["action"], "send_group_msg");
        assert_eq!(frame["params"], json!({ "group_id": 10, "message": "hello" }));
        bot.waiter()
            .resolve(ok(frame["echo"].as_str().unwrap(), json!({ "message_id": 77 })));

        assert_eq!(caller.await.unwrap().unwrap(), 77);
    }

    #[tokio::test]
    async fn send_group_msg_accepts_ok_without_message_id() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move {
                let first = bot.send_group_msg(10, "hello").await;
                let second = bot.send_private_msg(20, "hi").await;
                (first, second)
            })
        };

        let frame = rx.recv().await.unwrap();
        bot.waiter().resolve(ok(frame["echo"].as_str().unwrap(), Value::Null));
        let frame = rx.recv().await.unwrap();
        bot.waiter().resolve(ok(frame["echo"].as_str().unwrap(), json!({})));

        let (first, second) = caller.await.unwrap();
        assert_eq!(first.unwrap(), 0);
        assert_eq!(second.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_login_info_tolerates_null_data() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.get_login_info().await })
        };

        let frame = rx.recv().await.unwrap();
        bot.waiter().resolve(ok(frame["echo"].as_str().unwrap(), Value::Null));

        let info = caller.await.unwrap().unwrap();
        assert_eq!(info.user_id, 0);
        assert!(info.nickname.is_empty());
    }

    #[tokio::test]
    async fn send_msg_picks_target_by_group_id() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.send_msg(0, 42, "hi").await })
        };

        let frame = rx.recv().await.unwrap();
        assert_eq!(
            frame["params"],
            json!({ "message_type": "private", "user_id": 42, "message": "hi" })
        );
        bot.waiter()
            .resolve(ok(frame["echo"].as_str().unwrap(), json!({ "message_id": 1 })));
        caller.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn send_like_clamps_times() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.send_like(5, 99).await })
        };

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame["params"]["times"], 10);
        bot.waiter()
            .resolve(ok(frame["echo"].as_str().unwrap(), Value::Null));
        caller.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn group_info_is_decoded() {
        let (bot, _t, mut rx) = mock_bot();
        let caller = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.get_group_info(7).await })
        };

        let frame = rx.recv().await.unwrap();
        bot.waiter().resolve(ok(
            frame["echo"].as_str().unwrap(),
            json!({ "group_id": 7, "group_name": "测试群", "member_count": 3 }),
        ));

        let info = caller.await.unwrap().unwrap();
        assert_eq!(info.group_name, "测试群");
        assert_eq!(info.member_count, 3);
        assert_eq!(info.max_member_count, 0);
    }

    #[tokio::test]
    async fn poke_without_transport_reports_error() {
        let (bot, transport, _rx) = mock_bot();
        transport.fail.store(true, Ordering::SeqCst);
        assert!(bot.group_poke(1, 2).await.is_err());
        assert!(bot.waiter().is_empty());
    }
}
