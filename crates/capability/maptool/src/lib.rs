//! 地图交互工具
//!
//! - `MapTool`：画布工具能力（激活、停用、光标、指针释放）
//! - `IdentifyFeatureTool`：点选图层最上层要素并通过事件通道上报
//! - `IdentifyLayer`：可点选图层抽象；`InMemoryLayer` 为基于像素矩形的实现
//!
//! 状态机：Inactive → Active（挂到画布）→ Inactive（停用或再次切换）。

pub mod layer;
pub mod tool;

pub use layer::{IdentifyLayer, InMemoryLayer, PixelRect};
pub use tool::{Cursor, IdentifyFeatureTool, MapTool, ToolEvent, ToolState};

/// 工具错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("no active layer")]
    NoActiveLayer,
}
