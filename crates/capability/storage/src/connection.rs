//! 数据库连接管理
//!
//! 提供单连接建立功能：
//! - connect_options：由连接参数构造 PgConnectOptions
//! - connect：建立一条 Postgres 连接
//!
//! 设计原则：
//! - 每个会话只持有一条连接，不使用连接池
//! - 连接参数除端口解析外不做校验，失败统一归为 Connection 错误
//! - 不自动重试

use crate::error::StorageError;
use domain::ConnectionParams;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

/// 未配置端口时使用的 PostgreSQL 默认端口。
pub const DEFAULT_PORT: u16 = 5432;

/// 由连接参数构造连接选项。
pub fn connect_options(params: &ConnectionParams) -> Result<PgConnectOptions, StorageError> {
    let port = match params.port.trim() {
        "" => DEFAULT_PORT,
        text => text.parse::<u16>().map_err(|_| {
            StorageError::Connection(format!("Error connecting to database: invalid port {text}"))
        })?,
    };
    let mut options = PgConnectOptions::new()
        .host(&params.host)
        .port(port)
        .database(&params.database)
        .username(&params.username);
    if !params.password.is_empty() {
        options = options.password(&params.password);
    }
    Ok(options)
}

/// 建立 Postgres 连接
///
/// # 返回
/// - `Result<PgConnection, StorageError>`：连接或 Connection 错误（不会留下半开连接）
pub async fn connect(params: &ConnectionParams) -> Result<PgConnection, StorageError> {
    let options = connect_options(params)?;
    let connection = PgConnection::connect_with(&options)
        .await
        .map_err(|err| StorageError::Connection(format!("Error connecting to database: {err}")))?;
    Ok(connection)
}
