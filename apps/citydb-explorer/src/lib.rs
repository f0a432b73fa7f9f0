//! 3D City Database 浏览器：编排层与宿主抽象。
//!
//! - [`dock`]：dock 会话（连接、建筑图层、属性编辑工具）
//! - [`host`]：地图宿主抽象与无界面实现
//! - [`uri`]：建筑虚拟图层的数据源 URI

pub mod dock;
pub mod host;
pub mod uri;

pub use dock::{BUILDINGS_LAYER, DockError, ExplorerDock};
pub use host::{DialogScript, HeadlessHost, HostLayer, MapHost};
pub use uri::DataSourceUri;
