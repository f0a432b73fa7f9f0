//! 无界面运行入口：连接已保存的 3D City Database，加载建筑图层并输出数据源。

use citydb_config::{AppConfig, MapSettings};
use citydb_explorer::{ExplorerDock, HeadlessHost, MapHost};
use citydb_storage::PgConnector;
use citydb_telemetry::{LOG_TARGET, init_tracing};
use domain::Extent;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 设置存储（PostgreSQL/connections/<name>/...）
    let settings = MapSettings::from_file(&config.settings_file)?;
    let mut dock = ExplorerDock::new(Arc::new(PgConnector), Box::new(settings));
    dock.set_max_features(config.max_features);
    if let Some(name) = config.connection_name.as_deref() {
        if !dock.select_connection(name) {
            warn!(target: LOG_TARGET, connection = %name, "unknown connection, using default");
        }
    }
    info!(
        target: LOG_TARGET,
        session_id = %dock.session_id(),
        connections = ?dock.connection_names(),
        "settings loaded"
    );

    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 0.0, 0.0));
    dock.connect(&mut host).await;
    info!(target: LOG_TARGET, status = %dock.status_text(), "connect finished");
    if !dock.is_connected() {
        return Ok(());
    }

    // 未指定范围时使用数据库的估计范围
    if let Some(extent) = config.extent {
        host.set_canvas_extent(extent);
    }
    dock.load_buildings(&mut host)?;
    // 数据源包含连接密码，只输出遮盖后的形式
    let source = dock.buildings_source(&host)?;
    info!(target: LOG_TARGET, uri = %source.redacted(), "building layer source");
    match dock.building_count(&host).await {
        Ok(count) => info!(target: LOG_TARGET, count, "buildings in extent"),
        Err(err) => warn!(target: LOG_TARGET, error = %err, "building count failed"),
    }
    match dock.visible_building_ids(&host).await {
        Ok(ids) => info!(target: LOG_TARGET, loaded = ids.len(), "buildings in view"),
        Err(err) => warn!(target: LOG_TARGET, error = %err, "building query failed"),
    }

    dock.close().await;
    Ok(())
}
