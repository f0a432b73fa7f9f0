//! # CityDB Storage 模块
//!
//! 本模块是 3D City Database（PostGIS 上的 CityGML schema）的访问层。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：`CityDbStore` 与 `Connector`
//! 2. **错误处理层** (`error.rs`)：Connection / Schema / Query / AlreadyClosed
//! 3. **查询定义层** (`query.rs`)：SQL 常量与参数化建筑查询
//! 4. **连接管理层** (`connection.rs`)：单连接建立
//! 5. **实现层**：
//!    - `postgres/`：sqlx 实现（生产环境使用）
//!    - `in_memory/`：内存实现（测试与演示）
//!
//! ## 核心约束
//!
//! - **单连接**：每个 store 独占一条连接，不使用连接池
//! - **显式回滚**：失败语句先回滚事务，再转换为领域错误
//! - **参数化查询**：范围、srid、上限、要素 ID 全部参数绑定
//! - **版本探测不抛错**：非 3D City Database 返回 `SchemaVersion::NotACityDatabase`
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use citydb_storage::{CityDbStore, PgCityDb};
//! use domain::{ConnectionParams, Extent};
//!
//! let params = ConnectionParams::new("localhost", "5432", "citydb", "postgres", "postgres");
//! let store = PgCityDb::connect(&params).await?;
//! let version = store.schema_version().await?;
//! let srid = store.spatial_reference_id().await?;
//! let query = store.building_query(Extent::new(0.0, 0.0, 10.0, 10.0), srid, 50)?;
//! let ids = store.fetch_building_ids(&query).await?;
//! store.close().await?;
//! ```

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use query::*;
pub use traits::*;

pub use in_memory::{InMemoryCityDb, InMemoryConnector, InMemorySurface};
pub use postgres::{PgCityDb, PgConnector};
