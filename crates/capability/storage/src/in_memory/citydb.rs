//! 3D City Database 内存实现
//!
//! 仅用于测试和无数据库演示。
//!
//! 功能：
//! - 可配置的版本函数、srid、估计范围
//! - 表面几何（仅保存包围盒）按建筑 ID 聚合，忽略空 ID
//! - 通用属性读写，批量改写全有或全无
//! - 注入指定属性的更新失败

use crate::error::StorageError;
use crate::query::{BuildingQuery, ensure_finite};
use crate::traits::{CityDbStore, Connector};
use async_trait::async_trait;
use domain::{
    ConnectionParams, Extent, FeatureId, GenericAttribute, GenericAttributeUpdate, SchemaVersion,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// 表面几何记录（仅保存包围盒）。
#[derive(Debug, Clone)]
pub struct InMemorySurface {
    pub building_id: Option<FeatureId>,
    pub envelope: Extent,
}

#[derive(Debug, Default)]
struct CityDbData {
    v4_version: Option<String>,
    v3_version: Option<String>,
    srid: Option<i32>,
    extent: Option<Extent>,
    surfaces: Vec<InMemorySurface>,
    attributes: Vec<GenericAttribute>,
    failing_updates: HashSet<String>,
}

/// 3D City Database 内存存储
///
/// 数据由所有句柄共享，关闭状态按句柄记录。
pub struct InMemoryCityDb {
    data: Arc<RwLock<CityDbData>>,
    open_handles: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl InMemoryCityDb {
    /// 创建空数据库（不含版本函数，即非 3D City Database）
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(CityDbData::default())),
            open_handles: Arc::new(AtomicUsize::new(1)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_v4_version(self, version: impl Into<String>) -> Self {
        self.update(|data| data.v4_version = Some(version.into()));
        self
    }

    /// 旧版版本函数的复合值文本，例如 `(3.3.1,3,3,1)`
    pub fn with_v3_version(self, raw: impl Into<String>) -> Self {
        self.update(|data| data.v3_version = Some(raw.into()));
        self
    }

    pub fn with_srid(self, srid: i32) -> Self {
        self.update(|data| data.srid = Some(srid));
        self
    }

    pub fn with_extent(self, extent: Extent) -> Self {
        self.update(|data| data.extent = Some(extent));
        self
    }

    pub fn with_surface(self, building_id: Option<FeatureId>, envelope: Extent) -> Self {
        self.update(|data| {
            data.surfaces.push(InMemorySurface {
                building_id,
                envelope,
            })
        });
        self
    }

    pub fn with_attribute(self, attribute: GenericAttribute) -> Self {
        self.update(|data| data.attributes.push(attribute));
        self
    }

    /// 对指定属性名的改写返回数据库错误
    pub fn with_failing_update(self, attrname: impl Into<String>) -> Self {
        self.update(|data| {
            data.failing_updates.insert(attrname.into());
        });
        self
    }

    /// 新建共享同一份数据的句柄（模拟新连接）
    pub fn handle(&self) -> Self {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Self {
            data: Arc::clone(&self.data),
            open_handles: Arc::clone(&self.open_handles),
            closed: AtomicBool::new(false),
        }
    }

    /// 当前未关闭的句柄数
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn update(&self, apply: impl FnOnce(&mut CityDbData)) {
        if let Ok(mut data) = self.data.write() {
            apply(&mut data);
        }
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Connection("connection is closed".to_string()));
        }
        Ok(())
    }

    fn read<T>(&self, view: impl FnOnce(&CityDbData) -> T) -> Result<T, StorageError> {
        self.ensure_open()?;
        self.data
            .read()
            .map(|data| view(&data))
            .map_err(|_| StorageError::Query("storage lock poisoned".to_string()))
    }
}

impl Default for InMemoryCityDb {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CityDbStore for InMemoryCityDb {
    async fn schema_version(&self) -> Result<SchemaVersion, StorageError> {
        self.read(|data| {
            if let Some(version) = &data.v4_version {
                return SchemaVersion::V4(version.clone());
            }
            if let Some(raw) = &data.v3_version {
                return SchemaVersion::V3(crate::query::parse_legacy_version(raw));
            }
            SchemaVersion::NotACityDatabase
        })
    }

    async fn spatial_reference_id(&self) -> Result<i32, StorageError> {
        self.read(|data| data.srid)?.ok_or_else(|| {
            StorageError::Schema("Error getting SRS from Database: database_srs is empty".to_string())
        })
    }

    async fn estimated_extent(&self) -> Result<Extent, StorageError> {
        self.read(|data| data.extent)?.ok_or_else(|| {
            StorageError::Schema("Error getting estimated extent from Database".to_string())
        })
    }

    async fn count_buildings(&self, extent: &Extent, _srid: i32) -> Result<i64, StorageError> {
        ensure_finite(extent)?;
        let ids = self.read(|data| intersecting_buildings(data, extent))?;
        Ok(ids.len() as i64)
    }

    async fn fetch_building_ids(
        &self,
        query: &BuildingQuery,
    ) -> Result<Vec<FeatureId>, StorageError> {
        let ids = self.read(|data| intersecting_buildings(data, query.extent()))?;
        Ok(ids.into_iter().take(query.limit() as usize).collect())
    }

    async fn generic_attributes(
        &self,
        feature_id: FeatureId,
    ) -> Result<Vec<GenericAttribute>, StorageError> {
        let mut attributes = self.read(|data| {
            data.attributes
                .iter()
                .filter(|attribute| attribute.cityobject_id == feature_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        attributes.sort_by(|left, right| left.attrname.cmp(&right.attrname));
        Ok(attributes)
    }

    async fn save_generic_attributes(
        &self,
        feature_id: FeatureId,
        updates: &[GenericAttributeUpdate],
    ) -> Result<u64, StorageError> {
        self.ensure_open()?;
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Query("storage lock poisoned".to_string()))?;

        // 在副本上执行，全部成功后再替换
        let mut staged = data.attributes.clone();
        let mut affected = 0;
        for update in updates {
            if data.failing_updates.contains(&update.attrname) {
                return Err(StorageError::Query(format!(
                    "Error saving data: update of {} rejected",
                    update.attrname
                )));
            }
            for attribute in staged.iter_mut().filter(|attribute| {
                attribute.cityobject_id == feature_id && attribute.attrname == update.attrname
            }) {
                attribute.strval = update.strval.clone();
                attribute.intval = update.intval;
                attribute.realval = update.realval;
                affected += 1;
            }
        }
        data.attributes = staged;
        Ok(affected)
    }

    async fn close(&self) -> Result<(), StorageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StorageError::AlreadyClosed);
        }
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 与范围相交的非空建筑 ID（升序去重）。
fn intersecting_buildings(data: &CityDbData, extent: &Extent) -> Vec<FeatureId> {
    data.surfaces
        .iter()
        .filter(|surface| surface.envelope.intersects(extent))
        .filter_map(|surface| surface.building_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 内存连接器：每次连接返回共享数据的新句柄。
pub struct InMemoryConnector {
    database: InMemoryCityDb,
    reachable: bool,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(database: InMemoryCityDb) -> Self {
        Self {
            database,
            reachable: true,
            connects: AtomicUsize::new(0),
        }
    }

    /// 所有连接尝试都失败（模拟不可达主机）
    pub fn unreachable() -> Self {
        Self {
            database: InMemoryCityDb::new(),
            reachable: false,
            connects: AtomicUsize::new(0),
        }
    }

    /// 共享数据的根句柄
    pub fn database(&self) -> &InMemoryCityDb {
        &self.database
    }

    /// 成功建立的连接数
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 由连接器打开、尚未关闭的连接数
    pub fn open_connections(&self) -> usize {
        // 根句柄本身计为一个
        self.database.open_handles().saturating_sub(1)
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn CityDbStore>, StorageError> {
        if !self.reachable {
            return Err(StorageError::Connection(format!(
                "Error connecting to database: {} unreachable",
                params.host
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.database.handle()))
    }
}
