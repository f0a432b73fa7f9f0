//! 应用运行配置与设置存储读取。
//!
//! - `SettingsProvider`：宿主设置存储的只读抽象（注入，不做全局可变状态）
//! - `MapSettings`：基于 BTreeMap 的实现，可从扁平 JSON 对象加载
//! - `postgres_connections` / `connection_params`：读取 `PostgreSQL/connections/<name>/...`
//! - `AppConfig`：无界面运行入口的环境变量配置

use domain::{ConnectionParams, Extent};
use std::collections::BTreeMap;
use std::env;

/// PostgreSQL 连接配置所在的设置分组。
pub const CONNECTIONS_GROUP: &str = "PostgreSQL/connections";

/// 默认最大要素数。
pub const DEFAULT_MAX_FEATURES: u32 = 1000;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("settings file error: {0}")]
    Settings(String),
}

/// 只读键值设置存储。
pub trait SettingsProvider {
    /// 读取单个键的值。
    fn value(&self, key: &str) -> Option<String>;

    /// 列出 `prefix` 下一级子分组名（去重、有序）。
    fn child_groups(&self, prefix: &str) -> Vec<String>;
}

/// 内存设置存储。
#[derive(Debug, Clone, Default)]
pub struct MapSettings {
    values: BTreeMap<String, String>,
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// 从扁平 JSON 对象加载；数值与布尔值按文本保存。
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let parsed: serde_json::Value =
            serde_json::from_str(text).map_err(|err| ConfigError::Settings(err.to_string()))?;
        let object = parsed
            .as_object()
            .ok_or_else(|| ConfigError::Settings("settings root must be an object".to_string()))?;
        let mut settings = Self::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::String(text) => text.clone(),
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::Bool(flag) => flag.to_string(),
                serde_json::Value::Null => String::new(),
                _ => {
                    return Err(ConfigError::Settings(format!(
                        "unsupported value for {key}"
                    )));
                }
            };
            settings.insert(key.clone(), text);
        }
        Ok(settings)
    }

    /// 从文件加载设置。
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Settings(format!("{path}: {err}")))?;
        Self::from_json_str(&text)
    }
}

impl SettingsProvider for MapSettings {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn child_groups(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut groups: Vec<String> = self
            .values
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split_once('/').map(|(group, _)| group.to_string()))
            .collect();
        groups.dedup();
        groups
    }
}

/// 列出已保存的 PostgreSQL 连接名。
pub fn postgres_connections(settings: &dyn SettingsProvider) -> Vec<String> {
    settings.child_groups(CONNECTIONS_GROUP)
}

/// 读取指定连接的参数；缺失的键按空字符串处理。
pub fn connection_params(settings: &dyn SettingsProvider, name: &str) -> ConnectionParams {
    let read = |field: &str| {
        settings
            .value(&format!("{CONNECTIONS_GROUP}/{name}/{field}"))
            .unwrap_or_default()
    };
    ConnectionParams {
        host: read("host"),
        port: read("port"),
        database: read("database"),
        username: read("username"),
        password: read("password"),
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings_file: String,
    pub connection_name: Option<String>,
    pub max_features: u32,
    pub extent: Option<Extent>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings_file = env::var("CITYDB_SETTINGS_FILE")
            .map_err(|_| ConfigError::Missing("CITYDB_SETTINGS_FILE".to_string()))?;
        let connection_name = read_optional("CITYDB_CONNECTION");
        let max_features = read_u32_with_default("CITYDB_MAX_FEATURES", DEFAULT_MAX_FEATURES)?;
        let extent = read_optional_extent("CITYDB_EXTENT")?;

        Ok(Self {
            settings_file,
            connection_name,
            max_features,
            extent,
        })
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_extent(key: &str) -> Result<Option<Extent>, ConfigError> {
    let Some(value) = read_optional(key) else {
        return Ok(None);
    };
    parse_extent(&value)
        .map(Some)
        .ok_or_else(|| ConfigError::Invalid(key.to_string(), value))
}

/// 解析 `xmin,ymin,xmax,ymax`。
pub fn parse_extent(value: &str) -> Option<Extent> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [xmin, ymin, xmax, ymax] => {
            let extent = Extent::new(*xmin, *ymin, *xmax, *ymax);
            extent.is_finite().then_some(extent)
        }
        _ => None,
    }
}
