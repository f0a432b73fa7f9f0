//! 存储接口 Trait 定义
//!
//! - CityDbStore：单条连接上的 3D City Database 访问
//! - Connector：由连接参数建立 CityDbStore
//!
//! 设计原则：
//! - 所有接口返回 StorageError，驱动错误不外泄
//! - 使用 async_trait 支持动态分发（编排层持有 `Box<dyn CityDbStore>`）

use crate::error::StorageError;
use crate::query::BuildingQuery;
use async_trait::async_trait;
use domain::{
    ConnectionParams, Extent, FeatureId, GenericAttribute, GenericAttributeUpdate, SchemaVersion,
};

/// 3D City Database 访问接口
///
/// 每个实例独占一条连接；失败的语句都会先回滚再返回错误。
#[async_trait]
pub trait CityDbStore: Send + Sync {
    /// 探测 schema 版本
    ///
    /// 先尝试 4.x 版本函数，失败回滚后尝试 3.x 版本函数；
    /// 两者都失败时返回 `SchemaVersion::NotACityDatabase`，只有连接故障才返回错误。
    async fn schema_version(&self) -> Result<SchemaVersion, StorageError>;

    /// 读取 `citydb.database_srs` 中的 srid
    async fn spatial_reference_id(&self) -> Result<i32, StorageError>;

    /// 基于统计信息的 cityobject 范围估计（非精确边界）
    async fn estimated_extent(&self) -> Result<Extent, StorageError>;

    /// 统计与范围相交的建筑数量
    async fn count_buildings(&self, extent: &Extent, srid: i32) -> Result<i64, StorageError>;

    /// 执行建筑查询，仅返回建筑 ID
    async fn fetch_building_ids(&self, query: &BuildingQuery)
    -> Result<Vec<FeatureId>, StorageError>;

    /// 读取要素的通用属性（按 attrname 排序）
    async fn generic_attributes(
        &self,
        feature_id: FeatureId,
    ) -> Result<Vec<GenericAttribute>, StorageError>;

    /// 在单个事务中逐行改写通用属性
    ///
    /// 任一行失败则整体回滚；成功返回受影响的行数。
    async fn save_generic_attributes(
        &self,
        feature_id: FeatureId,
        updates: &[GenericAttributeUpdate],
    ) -> Result<u64, StorageError>;

    /// 关闭连接；重复关闭返回 `StorageError::AlreadyClosed`
    async fn close(&self) -> Result<(), StorageError>;

    /// 构造建筑查询
    fn building_query(
        &self,
        extent: Extent,
        srid: i32,
        limit: u32,
    ) -> Result<BuildingQuery, StorageError> {
        BuildingQuery::new(extent, srid, limit)
    }
}

/// 连接建立接口
#[async_trait]
pub trait Connector: Send + Sync {
    /// 建立连接；失败返回 `StorageError::Connection`，不自动重试
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn CityDbStore>, StorageError>;
}
