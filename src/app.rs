use crate::adapters::{console, onebot};
use crate::bot::Bot;
use crate::config::{AppConfig, ConnectMode};
use crate::event::MessageEvent;
use crate::plugins::{PluginHandler, PluginRegistry};
use crate::{info, warn};
use std::future::Future;
use std::sync::Arc;

/// 框架构建器
#[derive(Default)]
pub struct MiloraBuilder {
    config: AppConfig,
    plugins: PluginRegistry,
}

impl MiloraBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// 注册插件
    pub fn plugin<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Bot, Arc<MessageEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.plugins.register(name, handler);
        self
    }

    pub fn plugin_handler(self, name: impl Into<String>, handler: PluginHandler) -> Self {
        self.plugins.register_handler(name, handler);
        self
    }

    /// 构建框架实例，按配置过滤未启用的插件
    pub fn build(self) -> Milora {
        let enabled = &self.config.plugins;
        self.plugins.retain(|name| {
            let keep = enabled.is_enabled(name);
            if !keep {
                info!(target: "Plugin", "插件 [{}] 未启用", name);
            }
            keep
        });

        for name in &enabled.enabled {
            if !self.plugins.names().contains(name) {
                warn!(target: "Plugin", "配置中启用的插件 [{}] 未注册", name);
            }
        }

        Milora {
            config: self.config,
            plugins: Arc::new(self.plugins),
        }
    }
}

/// 框架入口
pub struct Milora {
    config: AppConfig,
    plugins: Arc<PluginRegistry>,
}

impl Milora {
    pub fn builder() -> MiloraBuilder {
        MiloraBuilder::new()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn list_plugins(&self) -> Vec<String> {
        self.plugins.names()
    }

    /// 按配置的连接方式运行，直到连接结束或出错
    pub async fn run(&self) -> anyhow::Result<()> {
        let bot_config = &self.config.bot;
        info!(target: "System", "已加载 {} 个插件: {:?}", self.plugin_count(), self.list_plugins());

        match bot_config.mode {
            ConnectMode::Reverse => onebot::serve_reverse(bot_config, self.plugins.clone()).await,
            ConnectMode::Forward => onebot::connect_forward(bot_config, self.plugins.clone()).await,
            ConnectMode::Console => console::run(
                bot_config.self_id,
                bot_config.api_timeout(),
                self.plugins.clone(),
            )
            .await
            .map_err(|e| anyhow::anyhow!("控制台模式出错: {}", e)),
        }
    }
}
