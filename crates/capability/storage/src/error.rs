//! 存储层错误类型
//!
//! 定义统一的存储错误类型，用于封装底层驱动错误：
//! - Connection：无法连接或认证，连接已断开
//! - Schema：已连接，但 schema 缺失或不符合 3D City Database
//! - Query：某条语句执行失败（已回滚）
//! - AlreadyClosed：重复关闭连接
//!
//! `sqlx::Error` 不会越过本 crate 的边界。

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// schema 错误
    #[error("schema error: {0}")]
    Schema(String),

    /// 查询错误
    #[error("query error: {0}")]
    Query(String),

    /// 连接已关闭
    #[error("connection already closed")]
    AlreadyClosed,
}

impl StorageError {
    /// 连接类故障（网络、TLS、协议）。
    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }

    /// 将驱动错误归类为查询错误（连接类故障除外）。
    pub(crate) fn query(err: sqlx::Error, message: &str) -> Self {
        if is_connection_failure(&err) {
            StorageError::Connection(format!("{message}: {err}"))
        } else {
            StorageError::Query(format!("{message}: {err}"))
        }
    }

    /// 将驱动错误归类为 schema 错误（连接类故障除外）。
    pub(crate) fn schema(err: sqlx::Error, message: &str) -> Self {
        if is_connection_failure(&err) {
            StorageError::Connection(format!("{message}: {err}"))
        } else {
            StorageError::Schema(format!("{message}: {err}"))
        }
    }
}

/// 连接层面的故障，与具体语句无关。
pub(crate) fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
