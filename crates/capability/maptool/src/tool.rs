use crate::layer::IdentifyLayer;
use citydb_telemetry::LOG_TARGET;
use domain::{Feature, PixelPoint};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// 画布光标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Cross,
}

/// 工具状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Inactive,
    Active,
}

/// 工具向订阅者发出的事件。
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    FeatureIdentified(Feature),
    Deactivated,
}

/// 画布工具能力。
pub trait MapTool {
    fn activate(&mut self);

    /// 停用；重复调用不报错。
    fn deactivate(&mut self);

    fn cursor(&self) -> Cursor;

    fn state(&self) -> ToolState;

    /// 指针释放事件。
    fn canvas_release(&mut self, point: PixelPoint);
}

/// 点选要素工具
///
/// 自顶向下取第一个命中的要素（TopDownStopAtFirst）；未命中时不发事件。
/// 同一时刻最多一个订阅者。
pub struct IdentifyFeatureTool {
    layer: Arc<dyn IdentifyLayer>,
    state: ToolState,
    cursor: Cursor,
    listener: Option<mpsc::UnboundedSender<ToolEvent>>,
}

impl IdentifyFeatureTool {
    pub fn new(layer: Arc<dyn IdentifyLayer>) -> Self {
        Self {
            layer,
            state: ToolState::Inactive,
            cursor: Cursor::Default,
            listener: None,
        }
    }

    /// 注册订阅者，替换已有订阅者。
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ToolEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.listener = Some(sender);
        receiver
    }

    pub fn layer_name(&self) -> &str {
        self.layer.name()
    }

    /// 点选像素下最上层的要素。
    pub fn identify(&self, point: PixelPoint) -> Option<Feature> {
        self.layer
            .identify(point)
            .first()
            .map(|id| Feature::new(*id, self.layer.name()))
    }

    fn emit(&self, event: ToolEvent) {
        let Some(listener) = &self.listener else {
            return;
        };
        if listener.send(event).is_err() {
            debug!(target: LOG_TARGET, "tool listener dropped");
        }
    }
}

impl MapTool for IdentifyFeatureTool {
    fn activate(&mut self) {
        self.state = ToolState::Active;
        self.cursor = Cursor::Cross;
    }

    fn deactivate(&mut self) {
        if self.state == ToolState::Inactive {
            return;
        }
        self.state = ToolState::Inactive;
        self.cursor = Cursor::Default;
        self.emit(ToolEvent::Deactivated);
    }

    fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn canvas_release(&mut self, point: PixelPoint) {
        if self.state != ToolState::Active {
            return;
        }
        match self.identify(point) {
            Some(feature) => self.emit(ToolEvent::FeatureIdentified(feature)),
            None => debug!(target: LOG_TARGET, x = point.x, y = point.y, "no feature under cursor"),
        }
    }
}
