use anyhow::Result;
use question_forge::utils::logging::log_startup;
use question_forge::{build_chat_model, logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（可选）
    dotenvy::dotenv().ok();

    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env()?;
    log_startup(&config);

    let model = build_chat_model(&config)?;

    // 初始化并运行应用
    App::initialize(config, model).run().await?;

    Ok(())
}
