//! 追踪初始化与会话 ID 生成。

use tracing_subscriber::{EnvFilter, fmt};

/// 所有模块共用的日志 target。
pub const LOG_TARGET: &str = "citydb_explorer";

/// dock 会话级追踪标识。
#[derive(Debug, Clone)]
pub struct SessionIds {
    pub session_id: String,
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 session_id。
pub fn new_session_ids() -> SessionIds {
    SessionIds {
        session_id: uuid::Uuid::new_v4().to_string(),
    }
}
