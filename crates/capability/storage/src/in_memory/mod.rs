//! 内存存储实现模块
//!
//! 仅用于测试和无数据库演示。
//!
//! 包含以下实现：
//! - CityDbStore: InMemoryCityDb
//! - Connector: InMemoryConnector

pub mod citydb;

pub use citydb::*;
