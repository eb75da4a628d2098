use crate::bot::Bot;
use crate::config::BotConfig;
use crate::dispatch::Dispatcher;
use crate::error::BoxError;
use crate::event::get_int;
use crate::plugins::PluginRegistry;
use crate::transport::{Transport, WsTransport};
use crate::{debug, info, warn};
use anyhow::Context as _;
use futures_util::StreamExt;
use http::HeaderValue;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{
    WebSocketStream, accept_hdr_async, connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};

/// 反向 WebSocket：监听端口，每个接入的协议端连接独立运行
pub async fn serve_reverse(config: &BotConfig, plugins: Arc<PluginRegistry>) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("反向 WS 监听失败: {}", addr))?;
    info!(target: "Bot", "反向 WS 服务器监听于 ws://{}", addr);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(target: "Bot", "接受连接失败: {}", e);
                continue;
            }
        };

        let token = config.access_token.clone();
        let self_id = config.self_id;
        let timeout = config.api_timeout();
        let plugins = plugins.clone();

        tokio::spawn(async move {
            let callback = |req: &Request, mut res: Response| -> Result<Response, ErrorResponse> {
                if !authorized(req, &token) {
                    *res.status_mut() = http::StatusCode::UNAUTHORIZED;
                    return Err(ErrorResponse::new(Some("Unauthorized".to_string())));
                }
                Ok(res)
            };

            let ws_stream = match accept_hdr_async(stream, callback).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(target: "Bot", "WS 握手失败 {}: {}", peer_addr, e);
                    return;
                }
            };

            info!(target: "Bot", "协议端已连接: {}", peer_addr);
            match run_connection(ws_stream, self_id, timeout, plugins).await {
                Ok(()) => info!(target: "Bot", "协议端断开: {}", peer_addr),
                Err(e) => warn!(target: "Bot", "连接异常断开 {}: {}", peer_addr, e),
            }
        });
    }
}

/// 正向 WebSocket：连接一次，连接结束即返回
pub async fn connect_forward(config: &BotConfig, plugins: Arc<PluginRegistry>) -> anyhow::Result<()> {
    let url = config.url.as_str();
    let mut request = url.into_client_request()?;

    if !config.access_token.is_empty() {
        let token_header = format!("Bearer {}", config.access_token);
        request
            .headers_mut()
            .insert("Authorization", HeaderValue::from_str(&token_header)?);
    }

    let (ws_stream, _) = connect_async(request)
        .await
        .with_context(|| format!("连接协议端失败: {}", url))?;
    info!(target: "Bot", "已连接协议端: {}", url);

    run_connection(ws_stream, config.self_id, config.api_timeout(), plugins)
        .await
        .map_err(|e| anyhow::anyhow!("连接异常断开: {}", e))?;
    warn!(target: "Bot", "协议端连接已关闭: {}", url);
    Ok(())
}

/// 驱动单个连接：顺序读取帧并交给分发器，直到连接关闭
pub async fn run_connection<S>(
    ws_stream: WebSocketStream<S>,
    self_id: i64,
    timeout: Duration,
    plugins: Arc<PluginRegistry>,
) -> Result<(), BoxError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (write_half, mut read_half) = ws_stream.split();
    let transport = Arc::new(WsTransport::new(Box::new(write_half), self_id));
    let bot = Bot::with_timeout(transport.clone(), timeout);
    let dispatcher = Dispatcher::new(bot.clone(), plugins);

    // 启动后台任务获取登录信息
    tokio::spawn(fetch_login_info(bot, transport.clone()));

    while let Some(message) = read_half.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let mut data = text.as_bytes().to_vec();
                let frame: Value = match simd_json::serde::from_slice(&mut data) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(target: "Bot", "无法解析的帧: {}", e);
                        continue;
                    }
                };

                if transport.self_id() == 0
                    && let Some(id) = get_int(&frame, "self_id").filter(|&id| id != 0)
                {
                    transport.set_self_id(id);
                    info!(target: "Bot", "机器人 QQ: {}", id);
                }

                dispatcher.handle_frame(frame);
            }
            Ok(WsMessage::Close(_)) => break,
            Err(e) => return Err(Box::new(e)),
            _ => {}
        }
    }

    if let Err(e) = transport.close().await {
        debug!(target: "Bot", "关闭写端失败: {}", e);
    }
    Ok(())
}

async fn fetch_login_info(bot: Bot, transport: Arc<WsTransport>) {
    match bot.get_login_info().await {
        Ok(info) => {
            if transport.self_id() == 0 && info.user_id != 0 {
                transport.set_self_id(info.user_id);
            }
            info!(target: "Bot", "已获取登录信息: {} ({})", info.nickname, info.user_id);
        }
        Err(e) => warn!(target: "Bot", "获取登录信息失败: {}", e),
    }
}

/// 检查 Authorization: Bearer <token> 或 access_token 查询参数
fn authorized(req: &Request, token: &str) -> bool {
    if token.is_empty() {
        return true;
    }

    let header_ok = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|v| v == token);

    let query_ok = req.uri().query().is_some_and(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(k, v)| k == "access_token" && v == token)
    });

    header_ok || query_ok
}
