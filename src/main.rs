//! Bee Chat - 终端对话客户端
//!
//! 入口：加载配置、初始化日志、创建对话编排器与 TUI，并运行主循环。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use bee_chat::{
    config::{load_config, AppConfig},
    core::create_chat,
    observability,
    ui::run_app,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 可选：第一个参数为额外的配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    // 日志依赖配置，加载失败先记下，日志就绪后再报告
    let (cfg, load_err) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    observability::init(cfg.app.log_file.as_deref()).context("Failed to init logging")?;
    if let Some(e) = load_err {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    let handles = create_chat(&cfg).context("Failed to create chat")?;

    run_app(
        handles.state_rx,
        handles.notice_rx,
        handles.cmd_tx,
        Duration::from_secs(cfg.ui.notice_secs),
    )
    .await
    .context("App run failed")?;

    // run_app 退出时命令发送端已释放，后台任务随之结束
    handles.task.await.context("Chat task failed")?;

    Ok(())
}
