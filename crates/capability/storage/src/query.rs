//! 3D City Database SQL 定义与建筑查询构造
//!
//! 所有由用户或要素派生的值都以参数绑定（`$1`, `$2` ...）传入。
//! 建筑查询同时提供内联渲染，供地图宿主作为虚拟图层数据源使用；
//! 内联时只渲染强类型数值，不拼接任何文本输入。

use crate::error::StorageError;
use domain::Extent;

/// 建筑物 objectclass_id。
pub const BUILDING_OBJECTCLASS_ID: i32 = 26;

pub(crate) const VERSION_V4_SQL: &str = "SELECT version FROM citydb_pkg.citydb_version()";

pub(crate) const VERSION_V3_SQL: &str = "SELECT citydb_version()::text AS version";

pub(crate) const SRID_SQL: &str = "SELECT srid::integer AS srid FROM citydb.database_srs LIMIT 1";

pub(crate) const ESTIMATED_EXTENT_SQL: &str = "\
WITH estimated AS (
    SELECT ST_EstimatedExtent('citydb', 'cityobject', 'envelope') AS box
)
SELECT
    ST_XMin(box) AS x_min,
    ST_YMin(box) AS y_min,
    ST_XMax(box) AS x_max,
    ST_YMax(box) AS y_max
FROM estimated";

pub(crate) const COUNT_BUILDINGS_SQL: &str = "\
SELECT COUNT(*) AS total
FROM citydb.cityobject
WHERE objectclass_id = $6
  AND ST_Intersects(envelope, ST_MakeEnvelope($1, $2, $3, $4, $5))";

pub(crate) const GENERIC_ATTRIBUTES_SQL: &str = "\
SELECT
    cityobject_id::bigint AS cityobject_id,
    attrname,
    strval,
    intval::bigint AS intval,
    realval::float8 AS realval
FROM citydb.cityobject_genericattrib
WHERE cityobject_id = $1
ORDER BY attrname";

pub(crate) const UPDATE_GENERIC_ATTRIBUTE_SQL: &str = "\
UPDATE citydb.cityobject_genericattrib
SET (strval, intval, realval) = ($1, $2, $3)
WHERE cityobject_id = $4
  AND attrname = $5";

/// 建筑几何聚合查询：参数为 `$1..$4` 范围、`$5` srid、`$6` 行数上限。
pub const BUILDING_SQL: &str = "\
WITH geometry_data AS (
    SELECT b.id AS id, sg.geometry AS single_geom
    FROM citydb.surface_geometry sg
    LEFT JOIN citydb.thematic_surface ts ON ts.lod2_multi_surface_id = sg.root_id
    LEFT JOIN citydb.building b ON ts.building_id = b.building_root_id
    WHERE sg.geometry IS NOT NULL
      AND ts.lod2_multi_surface_id IS NOT NULL
      AND ST_Intersects(sg.geometry, ST_MakeEnvelope($1, $2, $3, $4, $5))
)
SELECT id, ST_Collect(single_geom) AS geom
FROM geometry_data
WHERE id IS NOT NULL
GROUP BY id
ORDER BY id
LIMIT $6";

/// 建筑查询的主键列。
pub const BUILDING_KEY_COLUMN: &str = "id";

/// 建筑查询的几何列。
pub const BUILDING_GEOMETRY_COLUMN: &str = "geom";

/// 参数化的建筑查询。
///
/// 同样的参数总是得到同样的 SQL 文本和参数列表。
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingQuery {
    extent: Extent,
    srid: i32,
    limit: u32,
}

/// 绑定参数（按 `$1..$6` 顺序）。
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Float(f64),
    Int(i32),
    BigInt(i64),
}

impl std::fmt::Display for QueryParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryParam::Float(value) => write!(f, "{value}"),
            QueryParam::Int(value) => write!(f, "{value}"),
            QueryParam::BigInt(value) => write!(f, "{value}"),
        }
    }
}

impl BuildingQuery {
    /// 构造建筑查询；范围必须为有限值。
    pub fn new(extent: Extent, srid: i32, limit: u32) -> Result<Self, StorageError> {
        ensure_finite(&extent)?;
        Ok(Self {
            extent,
            srid,
            limit,
        })
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// 参数化 SQL 文本。
    pub fn sql(&self) -> &'static str {
        BUILDING_SQL
    }

    /// 绑定参数列表。
    pub fn params(&self) -> Vec<QueryParam> {
        vec![
            QueryParam::Float(self.extent.xmin),
            QueryParam::Float(self.extent.ymin),
            QueryParam::Float(self.extent.xmax),
            QueryParam::Float(self.extent.ymax),
            QueryParam::Int(self.srid),
            QueryParam::BigInt(i64::from(self.limit)),
        ]
    }

    /// 将数值参数内联到 SQL，用作数据源子查询。
    pub fn render_inline(&self) -> String {
        let mut sql = BUILDING_SQL.to_string();
        // 倒序替换，避免 `$1` 命中 `$1x`
        for (index, param) in self.params().iter().enumerate().rev() {
            sql = sql.replace(&format!("${}", index + 1), &param.to_string());
        }
        sql
    }
}

/// 范围坐标必须为有限值。
pub fn ensure_finite(extent: &Extent) -> Result<(), StorageError> {
    if !extent.is_finite() {
        return Err(StorageError::Query("extent must be finite".to_string()));
    }
    Ok(())
}

/// 解析旧版 `citydb_version()` 的复合值文本，例如 `(3.3.1,3,3,1)`。
pub fn parse_legacy_version(text: &str) -> String {
    text.split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .to_string()
}
