//! dock 会话：连接、建筑图层加载、属性编辑的编排。
//!
//! 所有操作都由宿主的 UI 事件触发，在同一线程上顺序执行。
//! 存储错误在这里转换为状态文本或日志，不会越过处理函数边界。

use crate::host::MapHost;
use crate::uri::DataSourceUri;
use citydb_config::{SettingsProvider, connection_params, postgres_connections};
use citydb_editor::{AttributeEditor, DialogOutcome, SaveStatus};
use citydb_maptool::{IdentifyFeatureTool, MapTool, ToolError, ToolEvent};
use citydb_storage::{BuildingQuery, CityDbStore, Connector, StorageError};
use citydb_telemetry::{LOG_TARGET, SessionIds, new_session_ids};
use domain::{ConnectionParams, Extent, FeatureId, PixelPoint, SchemaVersion};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{Instrument, Span, info, info_span, warn};

/// 建筑虚拟图层名称。
pub const BUILDINGS_LAYER: &str = "3D CityDB Buildings";

pub const STATUS_CONNECT_FAILED: &str = "Error connecting to database.";
pub const STATUS_NOT_CITY_DB: &str = "Error. Current DB is not a 3DCity DB.";
pub const STATUS_SCHEMA_FAILED: &str = "Error. Current DB schema is incomplete.";
pub const STATUS_ATTRIBUTES_FAILED: &str = "Error loading attributes.";

/// 编排层错误。
#[derive(Debug, thiserror::Error)]
pub enum DockError {
    #[error("not connected")]
    NotConnected,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// 已建立的 3D City Database 会话。
struct ActiveConnection {
    params: ConnectionParams,
    store: Box<dyn CityDbStore>,
    srid: i32,
}

pub struct ExplorerDock {
    connector: Arc<dyn Connector>,
    settings: Box<dyn SettingsProvider>,
    session: SessionIds,
    span: Span,
    connection_names: Vec<String>,
    selected: Option<String>,
    max_features: u32,
    connection: Option<ActiveConnection>,
    status_text: String,
    tracks_extent: bool,
    tool: Option<IdentifyFeatureTool>,
    tool_events: Option<UnboundedReceiver<ToolEvent>>,
}

impl ExplorerDock {
    pub fn new(connector: Arc<dyn Connector>, settings: Box<dyn SettingsProvider>) -> Self {
        let connection_names = postgres_connections(settings.as_ref());
        let selected = connection_names.first().cloned();
        let session = new_session_ids();
        let span = info_span!(target: LOG_TARGET, "dock", session_id = %session.session_id);
        Self {
            connector,
            settings,
            session,
            span,
            connection_names,
            selected,
            max_features: citydb_config::DEFAULT_MAX_FEATURES,
            connection: None,
            status_text: String::new(),
            tracks_extent: false,
            tool: None,
            tool_events: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// 会话 span，携带 session_id。
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn connection_names(&self) -> &[String] {
        &self.connection_names
    }

    pub fn selected_connection(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// 选择已保存的连接；未知名称返回 false。
    pub fn select_connection(&mut self, name: &str) -> bool {
        if !self.connection_names.iter().any(|item| item == name) {
            return false;
        }
        self.selected = Some(name.to_string());
        true
    }

    pub fn max_features(&self) -> u32 {
        self.max_features
    }

    pub fn set_max_features(&mut self, max_features: u32) {
        self.max_features = max_features;
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn tracks_extent(&self) -> bool {
        self.tracks_extent
    }

    pub fn edit_tool(&self) -> Option<&IdentifyFeatureTool> {
        self.tool.as_ref()
    }

    pub fn store(&self) -> Option<&dyn CityDbStore> {
        self.connection.as_ref().map(|active| active.store.as_ref())
    }

    /// 连接所选数据库并确认是 3D City Database。
    ///
    /// 已有连接会先关闭；成功后将项目坐标系和画布范围设置为数据库的 srid 与估计范围。
    pub async fn connect(&mut self, host: &mut dyn MapHost) {
        let span = self.span.clone();
        self.connect_inner(host).instrument(span).await
    }

    async fn connect_inner(&mut self, host: &mut dyn MapHost) {
        self.disconnect().await;

        let name = self.selected.clone().unwrap_or_default();
        let params = connection_params(self.settings.as_ref(), &name);
        info!(
            target: LOG_TARGET,
            connection = %name,
            database = %params.describe(),
            "connecting"
        );

        let store = match self.connector.connect(&params).await {
            Ok(store) => store,
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "connection failed");
                self.status_text = STATUS_CONNECT_FAILED.to_string();
                return;
            }
        };

        match inspect(store.as_ref()).await {
            Ok(Some((version, srid, extent))) => {
                host.set_project_crs(srid);
                host.set_canvas_extent(extent);
                self.status_text = format!(
                    "Connected. Current DB version is {}.",
                    version.version().unwrap_or_default()
                );
                info!(target: LOG_TARGET, srid, status = %self.status_text, "connected");
                self.connection = Some(ActiveConnection {
                    params,
                    store,
                    srid,
                });
            }
            Ok(None) => {
                self.status_text = STATUS_NOT_CITY_DB.to_string();
                release(store.as_ref()).await;
            }
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "database inspection failed");
                self.status_text = match err {
                    StorageError::Schema(_) => STATUS_SCHEMA_FAILED,
                    _ => STATUS_CONNECT_FAILED,
                }
                .to_string();
                release(store.as_ref()).await;
            }
        }
    }

    /// 当前画布范围下的建筑查询。
    pub fn building_query(&self, host: &dyn MapHost) -> Result<BuildingQuery, DockError> {
        let active = self.connection.as_ref().ok_or(DockError::NotConnected)?;
        let query = active
            .store
            .building_query(host.canvas_extent(), active.srid, self.max_features)?;
        Ok(query)
    }

    /// 当前范围的建筑图层数据源。
    pub fn buildings_source(&self, host: &dyn MapHost) -> Result<DataSourceUri, DockError> {
        let active = self.connection.as_ref().ok_or(DockError::NotConnected)?;
        let query = self.building_query(host)?;
        Ok(DataSourceUri::for_buildings(&active.params, &query))
    }

    fn buildings_uri(&self, host: &dyn MapHost) -> Result<String, DockError> {
        Ok(self.buildings_source(host)?.to_uri_string())
    }

    /// 加载当前范围的建筑图层，并开始跟随画布范围变化。
    ///
    /// 未连接时不做任何事并返回 false；图层已存在时只替换数据源。
    pub fn load_buildings(&mut self, host: &mut dyn MapHost) -> Result<bool, DockError> {
        let _entered = self.span.enter();
        if self.connection.is_none() {
            return Ok(false);
        }
        let uri = self.buildings_uri(host)?;
        if host.has_layer(BUILDINGS_LAYER) {
            host.set_layer_source(BUILDINGS_LAYER, &uri);
            host.trigger_repaint(BUILDINGS_LAYER);
        } else {
            host.add_layer(BUILDINGS_LAYER, &uri);
        }
        self.tracks_extent = true;
        info!(target: LOG_TARGET, limit = self.max_features, "building layer loaded");
        Ok(true)
    }

    /// 画布范围变化：更新建筑图层数据源并重绘。
    pub fn on_extent_changed(&mut self, host: &mut dyn MapHost) {
        if !self.tracks_extent {
            return;
        }
        let _entered = self.span.enter();
        if !host.has_layer(BUILDINGS_LAYER) {
            self.tracks_extent = false;
            return;
        }
        match self.buildings_uri(host) {
            Ok(uri) => {
                host.set_layer_source(BUILDINGS_LAYER, &uri);
                host.trigger_repaint(BUILDINGS_LAYER);
            }
            Err(err) => warn!(target: LOG_TARGET, error = %err, "building layer not updated"),
        }
    }

    /// 当前范围内建筑的 ID（实际执行建筑查询）。
    pub async fn visible_building_ids(
        &self,
        host: &dyn MapHost,
    ) -> Result<Vec<FeatureId>, DockError> {
        let active = self.connection.as_ref().ok_or(DockError::NotConnected)?;
        let query = self.building_query(host)?;
        Ok(active
            .store
            .fetch_building_ids(&query)
            .instrument(self.span.clone())
            .await?)
    }

    /// 当前范围内的建筑数量（不受要素上限约束）。
    pub async fn building_count(&self, host: &dyn MapHost) -> Result<i64, DockError> {
        let active = self.connection.as_ref().ok_or(DockError::NotConnected)?;
        Ok(active
            .store
            .count_buildings(&host.canvas_extent(), active.srid)
            .instrument(self.span.clone())
            .await?)
    }

    /// 切换属性编辑工具；返回切换后是否处于激活状态。
    pub fn toggle_edit_tool(&mut self, host: &mut dyn MapHost) -> Result<bool, DockError> {
        let _entered = self.span.enter();
        if let Some(mut tool) = self.tool.take() {
            tool.deactivate();
            host.set_cursor(tool.cursor());
            self.tool_events = None;
            return Ok(false);
        }

        let layer = host.active_layer().ok_or(ToolError::NoActiveLayer)?;
        let mut tool = IdentifyFeatureTool::new(layer);
        self.tool_events = Some(tool.subscribe());
        tool.activate();
        host.set_cursor(tool.cursor());
        info!(target: LOG_TARGET, layer = %tool.layer_name(), "edit tool activated");
        self.tool = Some(tool);
        Ok(true)
    }

    /// 画布切换到其他工具：停用编辑工具，引用在处理停用事件时释放。
    pub fn map_tool_replaced(&mut self) {
        if let Some(tool) = self.tool.as_mut() {
            tool.deactivate();
        }
    }

    /// 画布指针释放，转发给当前工具。
    pub fn canvas_release(&mut self, point: PixelPoint) {
        if let Some(tool) = self.tool.as_mut() {
            tool.canvas_release(point);
        }
    }

    /// 处理工具事件：点中要素时打开属性编辑器；工具停用时释放引用。
    pub async fn process_tool_events(&mut self, host: &mut dyn MapHost) {
        let span = self.span.clone();
        self.drain_tool_events(host).instrument(span).await
    }

    async fn drain_tool_events(&mut self, host: &mut dyn MapHost) {
        loop {
            let event = match self.tool_events.as_mut().map(|events| events.try_recv()) {
                Some(Ok(event)) => event,
                Some(Err(TryRecvError::Disconnected)) => {
                    self.tool_events = None;
                    return;
                }
                Some(Err(TryRecvError::Empty)) | None => return,
            };
            match event {
                ToolEvent::FeatureIdentified(feature) => {
                    if let Err(err) = self.open_attribute_editor(host, feature.id).await {
                        warn!(
                            target: LOG_TARGET,
                            error = %err,
                            feature_id = feature.id,
                            "attribute editor failed"
                        );
                        self.status_text = STATUS_ATTRIBUTES_FAILED.to_string();
                    }
                }
                ToolEvent::Deactivated => {
                    info!(target: LOG_TARGET, "edit tool deactivated");
                    self.tool = None;
                    self.tool_events = None;
                    return;
                }
            }
        }
    }

    /// 打开要素的属性编辑器；取消时返回 None 且不访问数据库。
    pub async fn open_attribute_editor(
        &self,
        host: &mut dyn MapHost,
        feature_id: FeatureId,
    ) -> Result<Option<SaveStatus>, DockError> {
        self.edit_attributes(host, feature_id)
            .instrument(self.span.clone())
            .await
    }

    async fn edit_attributes(
        &self,
        host: &mut dyn MapHost,
        feature_id: FeatureId,
    ) -> Result<Option<SaveStatus>, DockError> {
        let active = self.connection.as_ref().ok_or(DockError::NotConnected)?;
        let attributes = active.store.generic_attributes(feature_id).await?;
        let mut editor = AttributeEditor::from_attributes(feature_id, &attributes);

        match host.run_attribute_dialog(&mut editor) {
            DialogOutcome::Save => {
                let status = editor.save(active.store.as_ref()).await;
                host.show_editor_status(editor.status_text());
                Ok(Some(status))
            }
            DialogOutcome::Cancel => {
                info!(target: LOG_TARGET, feature_id, "attribute dialog cancelled");
                Ok(None)
            }
        }
    }

    /// 关闭 dock：停止范围跟随、停用工具并关闭连接。
    pub async fn close(&mut self) {
        let span = self.span.clone();
        async {
            self.tracks_extent = false;
            if let Some(mut tool) = self.tool.take() {
                tool.deactivate();
            }
            self.tool_events = None;
            self.disconnect().await;
        }
        .instrument(span)
        .await
    }

    async fn disconnect(&mut self) {
        if let Some(active) = self.connection.take() {
            release(active.store.as_ref()).await;
        }
    }
}

/// 读取版本、srid 与估计范围；非 3D City Database 返回 None。
async fn inspect(
    store: &dyn CityDbStore,
) -> Result<Option<(SchemaVersion, i32, Extent)>, StorageError> {
    let version = store.schema_version().await?;
    if !version.is_city_database() {
        return Ok(None);
    }
    let srid = store.spatial_reference_id().await?;
    let extent = store.estimated_extent().await?;
    Ok(Some((version, srid, extent)))
}

async fn release(store: &dyn CityDbStore) {
    match store.close().await {
        Ok(()) => info!(target: LOG_TARGET, "connection closed"),
        Err(StorageError::AlreadyClosed) => {
            warn!(target: LOG_TARGET, "connection already closed")
        }
        Err(err) => warn!(target: LOG_TARGET, error = %err, "Error closing connection"),
    }
}
