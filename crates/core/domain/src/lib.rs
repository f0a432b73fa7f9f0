pub mod data;

pub use data::{
    Extent, Feature, FeatureId, GenericAttribute, GenericAttributeUpdate, PixelPoint,
    SchemaVersion,
};

use serde::{Deserialize, Serialize};

/// 数据库连接参数：来自设置存储，连接前不做校验。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl ConnectionParams {
    /// 构造显式连接参数。
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// 用于日志的连接描述（不含口令）。
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}
