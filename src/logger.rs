//! 日志初始化
//!
//! 通过 `RUST_LOG` 控制级别，缺省为 `info`。

use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅者，重复调用时忽略
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
