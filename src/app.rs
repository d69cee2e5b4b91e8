use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::api;
use crate::clients::ChatModel;
use crate::config::Config;
use crate::state::AppState;

/// 应用主结构
pub struct App {
    port: u16,
    router: Router,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, model: Arc<dyn ChatModel>) -> Self {
        let port = config.port;
        let state = Arc::new(AppState::new(config, model));

        Self {
            port,
            router: api::router(state),
        }
    }

    /// 监听端口直到收到退出信号
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("✓ 服务已就绪: http://{}", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("👋 服务已退出");
        Ok(())
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C"),
        _ = terminate => info!("收到 SIGTERM"),
    }

    info!("正在关闭服务...");
}
