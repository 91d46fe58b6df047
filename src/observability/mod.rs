//! 可观测性

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局 subscriber：`RUST_LOG` 优先，未设置时为 info
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
