use serde::{Deserialize, Serialize};

/// 矩形范围（数据库空间参考下的坐标）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// 四个坐标均为有限值。
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    /// 两个范围是否相交（边界接触也算相交）。
    pub fn intersects(&self, other: &Extent) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }
}

/// 地图图层分配的要素 ID，仅在地图会话内有效。
pub type FeatureId = i64;

/// 点选结果中的要素。
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub layer_name: String,
}

impl Feature {
    pub fn new(id: FeatureId, layer_name: impl Into<String>) -> Self {
        Self {
            id,
            layer_name: layer_name.into(),
        }
    }
}

/// 画布像素坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 通用属性行（cityobject_genericattrib）。
///
/// `(cityobject_id, attrname)` 为自然键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericAttribute {
    pub cityobject_id: FeatureId,
    pub attrname: String,
    pub strval: Option<String>,
    pub intval: Option<i64>,
    pub realval: Option<f64>,
}

/// 通用属性的整行改写（三个值列全部覆盖）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericAttributeUpdate {
    pub attrname: String,
    pub strval: Option<String>,
    pub intval: Option<i64>,
    pub realval: Option<f64>,
}

impl From<&GenericAttribute> for GenericAttributeUpdate {
    fn from(attribute: &GenericAttribute) -> Self {
        Self {
            attrname: attribute.attrname.clone(),
            strval: attribute.strval.clone(),
            intval: attribute.intval,
            realval: attribute.realval,
        }
    }
}

/// 数据库 schema 版本探测结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// `citydb_pkg.citydb_version()` 可用（4.x 及以上）。
    V4(String),
    /// 仅旧版 `citydb_version()` 可用（3.x）。
    V3(String),
    /// 两个版本函数都不存在。
    NotACityDatabase,
}

impl SchemaVersion {
    pub fn is_city_database(&self) -> bool {
        !matches!(self, SchemaVersion::NotACityDatabase)
    }

    /// 版本号文本。
    pub fn version(&self) -> Option<&str> {
        match self {
            SchemaVersion::V4(version) | SchemaVersion::V3(version) => Some(version),
            SchemaVersion::NotACityDatabase => None,
        }
    }
}
