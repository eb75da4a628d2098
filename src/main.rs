use milora::config::AppConfig;
use milora::log::{self, Level};
use milora::plugins::{echo, group_status, ping};
use milora::{Milora, error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = AppConfig::load(&config_path).await?;

    let level = if config.log.enabled {
        Level::parse(&config.log.level).unwrap_or_else(|| {
            warn!("无法识别的日志级别 {:?}，使用 info", config.log.level);
            Level::Info
        })
    } else {
        Level::Off
    };
    log::set_level(level);
    info!("已加载配置: {}", config_path);

    let admins = config.plugins.admins.clone();
    let milora = Milora::builder()
        .config(config)
        .plugin(echo::NAME, echo::handle)
        .plugin(ping::NAME, ping::handle)
        .plugin(group_status::NAME, group_status::handler(admins))
        .build();

    tokio::select! {
        result = milora.run() => {
            if let Err(e) = &result {
                error!("运行出错: {:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号，正在关闭...");
            Ok(())
        }
    }
}
