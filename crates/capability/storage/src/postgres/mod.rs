//! # PostgreSQL 存储实现模块
//!
//! 基于 sqlx 单连接访问 3D City Database（PostGIS + `citydb` schema）。
//!
//! ## 数据库模式要求
//!
//! - `citydb.cityobject`、`citydb.building`、`citydb.surface_geometry`、
//!   `citydb.thematic_surface`、`citydb.cityobject_genericattrib`
//! - `citydb.database_srs`：恰好一行 srid
//! - 版本函数 `citydb_pkg.citydb_version()`（4.x）或 `citydb_version()`（3.x）
//!
//! ## 事务
//!
//! 每条读语句都在独立事务中执行，失败后显式回滚再返回错误；
//! 通用属性的批量改写共用一个事务，全部成功才提交。
//!
//! ## 安全考虑
//!
//! 所有查询使用参数绑定（`$1`, `$2` 等），要素 ID 同样绑定，不拼接 SQL。

pub mod citydb;

pub use citydb::*;
