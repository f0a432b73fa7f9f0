use domain::{FeatureId, PixelPoint};

/// 可点选图层。
pub trait IdentifyLayer: Send + Sync {
    fn name(&self) -> &str;

    /// 像素下的要素，按绘制顺序自顶向下排列。
    fn identify(&self, point: PixelPoint) -> Vec<FeatureId>;
}

/// 像素矩形（含边界）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        (self.left..=self.right).contains(&point.x) && (self.top..=self.bottom).contains(&point.y)
    }
}

/// 内存图层：要素按添加顺序绘制，后添加的在上层。
#[derive(Debug, Clone, Default)]
pub struct InMemoryLayer {
    name: String,
    features: Vec<(FeatureId, PixelRect)>,
}

impl InMemoryLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, id: FeatureId, rect: PixelRect) -> Self {
        self.features.push((id, rect));
        self
    }
}

impl IdentifyLayer for InMemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn identify(&self, point: PixelPoint) -> Vec<FeatureId> {
        self.features
            .iter()
            .rev()
            .filter(|(_, rect)| rect.contains(point))
            .map(|(id, _)| *id)
            .collect()
    }
}
