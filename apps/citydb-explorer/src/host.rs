//! 地图宿主抽象
//!
//! 编排层通过 `MapHost` 操作画布、图层与模态对话框；
//! `HeadlessHost` 是无界面实现，记录所有调用，供无界面运行和测试使用。

use citydb_editor::{AttributeEditor, DialogOutcome};
use citydb_maptool::{Cursor, IdentifyLayer};
use citydb_telemetry::LOG_TARGET;
use domain::Extent;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// 宿主地图环境。
pub trait MapHost {
    /// 当前画布范围
    fn canvas_extent(&self) -> Extent;

    fn set_canvas_extent(&mut self, extent: Extent);

    /// 以 EPSG 代码设置项目坐标系
    fn set_project_crs(&mut self, srid: i32);

    fn has_layer(&self, name: &str) -> bool;

    fn add_layer(&mut self, name: &str, uri: &str);

    /// 替换已有图层的数据源
    fn set_layer_source(&mut self, name: &str, uri: &str);

    fn trigger_repaint(&mut self, name: &str);

    fn active_layer(&self) -> Option<Arc<dyn IdentifyLayer>>;

    fn set_cursor(&mut self, cursor: Cursor);

    /// 以模态方式运行属性对话框
    fn run_attribute_dialog(&mut self, editor: &mut AttributeEditor) -> DialogOutcome;

    /// 对话框状态栏文本
    fn show_editor_status(&mut self, text: &str);
}

/// 宿主中的图层记录。
#[derive(Debug, Clone, PartialEq)]
pub struct HostLayer {
    pub name: String,
    pub uri: String,
    pub repaints: u32,
}

/// 预设的对话框交互：单元格编辑后以指定方式关闭。
#[derive(Debug, Clone)]
pub struct DialogScript {
    pub edits: Vec<(usize, usize, String)>,
    pub outcome: DialogOutcome,
}

impl DialogScript {
    pub fn save(edits: Vec<(usize, usize, String)>) -> Self {
        Self {
            edits,
            outcome: DialogOutcome::Save,
        }
    }

    pub fn cancel() -> Self {
        Self {
            edits: Vec::new(),
            outcome: DialogOutcome::Cancel,
        }
    }
}

/// 无界面宿主。
pub struct HeadlessHost {
    extent: Extent,
    crs: Option<i32>,
    layers: Vec<HostLayer>,
    active_layer: Option<Arc<dyn IdentifyLayer>>,
    cursor: Cursor,
    dialog_scripts: VecDeque<DialogScript>,
    dialog_renders: Vec<String>,
    editor_status: Vec<String>,
}

impl HeadlessHost {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            crs: None,
            layers: Vec::new(),
            active_layer: None,
            cursor: Cursor::Default,
            dialog_scripts: VecDeque::new(),
            dialog_renders: Vec::new(),
            editor_status: Vec::new(),
        }
    }

    pub fn with_active_layer(mut self, layer: Arc<dyn IdentifyLayer>) -> Self {
        self.active_layer = Some(layer);
        self
    }

    /// 追加一次对话框交互；没有预设时对话框按取消处理
    pub fn push_dialog(&mut self, script: DialogScript) {
        self.dialog_scripts.push_back(script);
    }

    pub fn crs(&self) -> Option<i32> {
        self.crs
    }

    pub fn layers(&self) -> &[HostLayer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&HostLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// 模拟用户删除图层
    pub fn remove_layer(&mut self, name: &str) {
        self.layers.retain(|layer| layer.name != name);
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// 每次打开对话框时的表格文本
    pub fn dialog_renders(&self) -> &[String] {
        &self.dialog_renders
    }

    pub fn editor_status(&self) -> &[String] {
        &self.editor_status
    }
}

impl MapHost for HeadlessHost {
    fn canvas_extent(&self) -> Extent {
        self.extent
    }

    fn set_canvas_extent(&mut self, extent: Extent) {
        self.extent = extent;
    }

    fn set_project_crs(&mut self, srid: i32) {
        self.crs = Some(srid);
    }

    fn has_layer(&self, name: &str) -> bool {
        self.layer(name).is_some()
    }

    fn add_layer(&mut self, name: &str, uri: &str) {
        self.layers.push(HostLayer {
            name: name.to_string(),
            uri: uri.to_string(),
            repaints: 0,
        });
    }

    fn set_layer_source(&mut self, name: &str, uri: &str) {
        if let Some(layer) = self.layers.iter_mut().find(|layer| layer.name == name) {
            layer.uri = uri.to_string();
        }
    }

    fn trigger_repaint(&mut self, name: &str) {
        if let Some(layer) = self.layers.iter_mut().find(|layer| layer.name == name) {
            layer.repaints += 1;
        }
    }

    fn active_layer(&self) -> Option<Arc<dyn IdentifyLayer>> {
        self.active_layer.clone()
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn run_attribute_dialog(&mut self, editor: &mut AttributeEditor) -> DialogOutcome {
        self.dialog_renders.push(editor.render());
        let Some(script) = self.dialog_scripts.pop_front() else {
            return DialogOutcome::Cancel;
        };
        for (row, column, text) in script.edits {
            if let Err(err) = editor.set_cell(row, column, text) {
                warn!(target: LOG_TARGET, error = %err, "dialog edit ignored");
            }
        }
        script.outcome
    }

    fn show_editor_status(&mut self, text: &str) {
        self.editor_status.push(text.to_string());
    }
}
