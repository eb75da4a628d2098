//! 插件注册表
//!
//! 插件是一个异步函数：接收连接句柄与只读的消息事件，返回回复文本。
//! 返回空字符串表示不回复。

use crate::bot::Bot;
use crate::event::MessageEvent;
use crate::warn;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

pub mod echo;
pub mod group_status;
pub mod ping;

pub type PluginHandler =
    Arc<dyn Fn(Bot, Arc<MessageEvent>) -> BoxFuture<'static, String> + Send + Sync>;

/// 按注册顺序保存的 名称 -> 处理函数 表
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<(String, PluginHandler)>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册插件。同名插件会被替换
    pub fn register<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Bot, Arc<MessageEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let handler: PluginHandler =
            Arc::new(move |bot: Bot, event: Arc<MessageEvent>| -> BoxFuture<'static, String> {
                Box::pin(f(bot, event))
            });
        self.register_handler(name, handler);
    }

    pub fn register_handler(&self, name: impl Into<String>, handler: PluginHandler) {
        let name = name.into();
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        match plugins.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                warn!(target: "Plugin", "插件 [{}] 重复注册，已替换", name);
                slot.1 = handler;
            }
            None => plugins.push((name, handler)),
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let before = plugins.len();
        plugins.retain(|(n, _)| n != name);
        plugins.len() != before
    }

    /// 只保留满足条件的插件
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(n, _)| keep(n));
    }

    /// 当前插件快照。返回后锁即释放，调用处理函数时不持有锁
    pub fn get_all(&self) -> Vec<(String, PluginHandler)> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
