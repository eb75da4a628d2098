use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    // Bot 连接配置
    #[serde(default)]
    pub bot: BotConfig,

    // 日志配置
    #[serde(default)]
    pub log: LogConfig,

    // 插件配置
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// 连接方式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    /// 监听端口，等待协议端反向连接
    #[default]
    Reverse,
    /// 主动连接协议端
    Forward,
    /// 从标准输入读取消息，用于本地调试
    Console,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default)]
    pub mode: ConnectMode,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    // 正向连接地址
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub access_token: String,

    // 机器人 QQ 号，为 0 时从连接中获取
    #[serde(default)]
    pub self_id: i64,

    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,
}

impl BotConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs.max(1))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            mode: ConnectMode::default(),
            host: default_host(),
            port: default_port(),
            url: default_url(),
            access_token: String::new(),
            self_id: 0,
            api_timeout_secs: default_api_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PluginsConfig {
    // 启用的插件，为空时启用全部
    #[serde(default)]
    pub enabled: Vec<String>,

    // 管理员 QQ 号
    #[serde(default)]
    pub admins: Vec<i64>,
}

impl PluginsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_url() -> String {
    "ws://127.0.0.1:3001".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// 加载配置，如果文件不存在则创建默认配置
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if fs::try_exists(path).await? {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            let cfg = toml::from_str(&content)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
            return Ok(cfg);
        }

        let cfg = AppConfig::default();
        cfg.save(path).await?;
        Ok(cfg)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, toml_string)
            .await
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.bot.mode, ConnectMode::Reverse);
        assert_eq!(cfg.bot.listen_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.bot.api_timeout(), Duration::from_secs(30));
        assert!(cfg.log.enabled);
        assert_eq!(cfg.log.level, "info");
        assert!(cfg.plugins.is_enabled("anything"));
    }

    #[test]
    fn partial_sections_are_filled() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [bot]
            mode = "forward"
            url = "ws://10.0.0.2:6700"
            self_id = 10001

            [plugins]
            enabled = ["echo"]
            admins = [1, 2]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.bot.mode, ConnectMode::Forward);
        assert_eq!(cfg.bot.url, "ws://10.0.0.2:6700");
        assert_eq!(cfg.bot.self_id, 10001);
        assert_eq!(cfg.bot.port, 8080);
        assert!(cfg.plugins.is_enabled("echo"));
        assert!(!cfg.plugins.is_enabled("ping"));
        assert_eq!(cfg.plugins.admins, vec![1, 2]);
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = std::env::temp_dir().join(format!("milora-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path).await;

        let cfg = AppConfig::load(&path).await.unwrap();
        assert_eq!(cfg.bot.port, 8080);
        assert!(fs::try_exists(&path).await.unwrap());

        let reloaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(reloaded.bot.url, cfg.bot.url);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
