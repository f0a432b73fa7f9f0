//! PostgreSQL 图层数据源 URI。
//!
//! 格式与地图宿主的 postgres provider 一致：
//! `dbname='..' host=.. port=.. user='..' password='..' estimatedmetadata=true srid=.. key='id' table="(<sql>)" (geom)`

use citydb_storage::{BUILDING_GEOMETRY_COLUMN, BUILDING_KEY_COLUMN, BuildingQuery};
use domain::ConnectionParams;

const REDACTED: &str = "***";

/// 以子查询为表的数据源描述。
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceUri {
    params: ConnectionParams,
    sql: String,
    srid: i32,
    key_column: String,
    geometry_column: String,
    estimated_metadata: bool,
}

impl DataSourceUri {
    /// 建筑图层数据源。
    pub fn for_buildings(params: &ConnectionParams, query: &BuildingQuery) -> Self {
        Self {
            params: params.clone(),
            sql: query.render_inline(),
            srid: query.srid(),
            key_column: BUILDING_KEY_COLUMN.to_string(),
            geometry_column: BUILDING_GEOMETRY_COLUMN.to_string(),
            estimated_metadata: true,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn to_uri_string(&self) -> String {
        self.render(false)
    }

    /// 密码被遮盖的形式，用于日志输出。
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact_password: bool) -> String {
        let mut parts = Vec::new();
        if !self.params.database.is_empty() {
            parts.push(format!("dbname={}", quoted(&self.params.database)));
        }
        if !self.params.host.is_empty() {
            parts.push(format!("host={}", self.params.host));
        }
        if !self.params.port.is_empty() {
            parts.push(format!("port={}", self.params.port));
        }
        if !self.params.username.is_empty() {
            parts.push(format!("user={}", quoted(&self.params.username)));
        }
        if !self.params.password.is_empty() {
            let password = if redact_password {
                REDACTED
            } else {
                self.params.password.as_str()
            };
            parts.push(format!("password={}", quoted(password)));
        }
        if self.estimated_metadata {
            parts.push("estimatedmetadata=true".to_string());
        }
        parts.push(format!("srid={}", self.srid));
        parts.push(format!("key={}", quoted(&self.key_column)));
        parts.push(format!(
            "table=\"({})\" ({})",
            self.sql.replace('"', "\\\""),
            self.geometry_column
        ));
        parts.join(" ")
    }
}

impl std::fmt::Display for DataSourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uri_string())
    }
}

fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
