use anyhow::Result;
use transgrade_upload::orchestrator::spawn_ctrl_c_handler;
use transgrade_upload::utils::logging;
use transgrade_upload::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init_log_file(&config.output_log_file)?;
    logging::init(&config.output_log_file, config.verbose_logging)?;

    // 初始化应用，Ctrl+C 触发取消
    let app = App::initialize(config).await?;
    spawn_ctrl_c_handler(app.cancellation_token());

    let _stats = app.run().await?;

    Ok(())
}
