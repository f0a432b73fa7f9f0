use citydb_config::MapSettings;
use citydb_editor::SaveStatus;
use citydb_explorer::{
    BUILDINGS_LAYER, DialogScript, DockError, ExplorerDock, HeadlessHost, MapHost,
};
use citydb_maptool::{Cursor, InMemoryLayer, MapTool, PixelRect, ToolState};
use citydb_storage::{CityDbStore, InMemoryCityDb, InMemoryConnector};
use domain::{Extent, GenericAttribute, PixelPoint};
use std::sync::Arc;

fn settings() -> MapSettings {
    MapSettings::new()
        .with_value("PostgreSQL/connections/local/host", "localhost")
        .with_value("PostgreSQL/connections/local/port", "5432")
        .with_value("PostgreSQL/connections/local/database", "citydb")
        .with_value("PostgreSQL/connections/local/username", "citydb_user")
        .with_value("PostgreSQL/connections/local/password", "secret")
        .with_value("PostgreSQL/connections/remote/host", "remote.local")
}

fn attribute(id: i64, name: &str, strval: Option<&str>, intval: Option<i64>) -> GenericAttribute {
    GenericAttribute {
        cityobject_id: id,
        attrname: name.to_string(),
        strval: strval.map(str::to_string),
        intval,
        realval: None,
    }
}

fn city_database() -> InMemoryCityDb {
    InMemoryCityDb::new()
        .with_v4_version("4.1.0")
        .with_srid(25832)
        .with_extent(Extent::new(0.0, 0.0, 10.0, 10.0))
        .with_surface(Some(1), Extent::new(1.0, 1.0, 2.0, 2.0))
        .with_surface(Some(2), Extent::new(3.0, 3.0, 4.0, 4.0))
        .with_surface(Some(3), Extent::new(8.0, 8.0, 9.0, 9.0))
        .with_surface(None, Extent::new(5.0, 5.0, 6.0, 6.0))
        .with_surface(Some(4), Extent::new(40.0, 40.0, 41.0, 41.0))
        .with_attribute(attribute(1, "roof", Some("flat"), None))
        .with_attribute(attribute(1, "floors", None, Some(3)))
}

fn buildings_layer() -> Arc<InMemoryLayer> {
    Arc::new(
        InMemoryLayer::new(BUILDINGS_LAYER)
            .with_feature(1, PixelRect::new(0, 0, 20, 20))
            .with_feature(2, PixelRect::new(40, 40, 60, 60)),
    )
}

fn dock_with(connector: Arc<InMemoryConnector>) -> ExplorerDock {
    ExplorerDock::new(connector, Box::new(settings()))
}

async fn connected_dock(host: &mut HeadlessHost) -> (ExplorerDock, Arc<InMemoryConnector>) {
    let connector = Arc::new(InMemoryConnector::new(city_database()));
    let mut dock = dock_with(connector.clone());
    dock.select_connection("local");
    dock.connect(host).await;
    assert!(dock.is_connected());
    (dock, connector)
}

#[test]
fn lists_saved_connections() {
    let dock = dock_with(Arc::new(InMemoryConnector::new(city_database())));
    assert_eq!(dock.connection_names(), ["local", "remote"]);
    assert_eq!(dock.selected_connection(), Some("local"));
}

#[tokio::test]
async fn connect_sets_project_crs_and_extent() {
    let mut host = HeadlessHost::new(Extent::new(100.0, 100.0, 200.0, 200.0));
    let (dock, _) = connected_dock(&mut host).await;

    assert_eq!(dock.status_text(), "Connected. Current DB version is 4.1.0.");
    assert_eq!(host.crs(), Some(25832));
    assert_eq!(host.canvas_extent(), Extent::new(0.0, 0.0, 10.0, 10.0));
}

#[tokio::test]
async fn unreachable_database_reports_status() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let mut dock = dock_with(Arc::new(InMemoryConnector::unreachable()));

    dock.connect(&mut host).await;
    assert!(!dock.is_connected());
    assert_eq!(dock.status_text(), "Error connecting to database.");
    assert!(host.crs().is_none());
}

#[tokio::test]
async fn non_city_database_is_rejected_and_closed() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let connector = Arc::new(InMemoryConnector::new(InMemoryCityDb::new()));
    let mut dock = dock_with(connector.clone());

    dock.connect(&mut host).await;
    assert!(!dock.is_connected());
    assert_eq!(dock.status_text(), "Error. Current DB is not a 3DCity DB.");
    assert_eq!(connector.open_connections(), 0);
}

#[tokio::test]
async fn missing_srs_is_reported_as_schema_problem() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let database = InMemoryCityDb::new().with_v4_version("4.1.0");
    let connector = Arc::new(InMemoryConnector::new(database));
    let mut dock = dock_with(connector.clone());

    dock.connect(&mut host).await;
    assert!(!dock.is_connected());
    assert_eq!(dock.status_text(), "Error. Current DB schema is incomplete.");
    assert_eq!(connector.open_connections(), 0);
}

#[tokio::test]
async fn reconnect_closes_previous_connection() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, connector) = connected_dock(&mut host).await;

    dock.connect(&mut host).await;
    assert!(dock.is_connected());
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.open_connections(), 1);
}

#[tokio::test]
async fn load_without_connection_is_noop() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let mut dock = dock_with(Arc::new(InMemoryConnector::new(city_database())));

    assert!(!dock.load_buildings(&mut host).expect("load"));
    assert!(host.layers().is_empty());
    assert!(matches!(
        dock.visible_building_ids(&host).await,
        Err(DockError::NotConnected)
    ));
}

#[tokio::test]
async fn load_adds_single_buildings_layer() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.set_max_features(50);

    assert!(dock.load_buildings(&mut host).expect("load"));
    assert_eq!(host.layers().len(), 1);
    let layer = &host.layers()[0];
    assert_eq!(layer.name, "3D CityDB Buildings");
    assert!(layer.uri.contains("ST_MakeEnvelope(0, 0, 10, 10, 25832)"));
    assert!(layer.uri.contains("LIMIT 50"));
    assert!(layer.uri.contains("key='id'"));

    let ids = dock.visible_building_ids(&host).await.expect("ids");
    assert_eq!(ids, vec![1, 2, 3]);

    // 重复加载不会产生第二个图层
    dock.load_buildings(&mut host).expect("reload");
    assert_eq!(host.layers().len(), 1);
}

#[tokio::test]
async fn extent_change_updates_layer_source() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.load_buildings(&mut host).expect("load");

    host.set_canvas_extent(Extent::new(35.0, 35.0, 45.0, 45.0));
    dock.on_extent_changed(&mut host);

    let layer = host.layer(BUILDINGS_LAYER).expect("layer");
    assert!(layer.uri.contains("ST_MakeEnvelope(35, 35, 45, 45, 25832)"));
    assert_eq!(layer.repaints, 1);
    assert_eq!(dock.visible_building_ids(&host).await.expect("ids"), vec![4]);

    host.remove_layer(BUILDINGS_LAYER);
    dock.on_extent_changed(&mut host);
    assert!(!dock.tracks_extent());
}

#[tokio::test]
async fn edit_tool_requires_active_layer() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, _) = connected_dock(&mut host).await;

    let err = dock.toggle_edit_tool(&mut host).expect_err("no layer");
    assert!(matches!(err, DockError::Tool(_)));
    assert!(dock.edit_tool().is_none());
}

#[tokio::test]
async fn edit_tool_toggles_on_and_off() {
    let mut host =
        HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0)).with_active_layer(buildings_layer());
    let (mut dock, _) = connected_dock(&mut host).await;

    assert!(dock.toggle_edit_tool(&mut host).expect("toggle"));
    assert_eq!(host.cursor(), Cursor::Cross);
    assert!(dock.edit_tool().is_some());

    assert!(!dock.toggle_edit_tool(&mut host).expect("toggle"));
    assert_eq!(host.cursor(), Cursor::Default);
    assert!(dock.edit_tool().is_none());
}

#[tokio::test]
async fn click_on_empty_space_opens_nothing() {
    let mut host =
        HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0)).with_active_layer(buildings_layer());
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.toggle_edit_tool(&mut host).expect("toggle");

    dock.canvas_release(PixelPoint::new(30, 30));
    dock.process_tool_events(&mut host).await;

    assert!(host.dialog_renders().is_empty());
    assert!(dock.edit_tool().is_some());
}

#[tokio::test]
async fn click_on_feature_edits_and_saves_attributes() {
    let mut host =
        HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0)).with_active_layer(buildings_layer());
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.toggle_edit_tool(&mut host).expect("toggle");
    host.push_dialog(DialogScript::save(vec![
        (0, 2, "5".to_string()),
        (1, 1, "gable".to_string()),
    ]));

    dock.canvas_release(PixelPoint::new(10, 10));
    dock.process_tool_events(&mut host).await;

    assert_eq!(host.dialog_renders().len(), 1);
    assert!(host.dialog_renders()[0].contains("floors"));
    assert_eq!(host.editor_status(), ["Data saved."]);

    let store = dock.store().expect("store");
    let attributes = store.generic_attributes(1).await.expect("attributes");
    assert_eq!(attributes[0].intval, Some(5));
    assert_eq!(attributes[1].strval.as_deref(), Some("gable"));
}

#[tokio::test]
async fn cancelled_dialog_leaves_database_untouched() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (dock, _) = connected_dock(&mut host).await;
    host.push_dialog(DialogScript {
        edits: vec![(0, 2, "99".to_string())],
        outcome: citydb_editor::DialogOutcome::Cancel,
    });

    let outcome = dock.open_attribute_editor(&mut host, 1).await.expect("open");
    assert!(outcome.is_none());
    assert!(host.editor_status().is_empty());

    let attributes = dock.store().expect("store").generic_attributes(1).await.expect("read");
    assert_eq!(attributes[0].intval, Some(3));
}

#[tokio::test]
async fn failing_batch_reports_error_status() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let database = city_database().with_failing_update("roof");
    let connector = Arc::new(InMemoryConnector::new(database));
    let mut dock = dock_with(connector);
    dock.connect(&mut host).await;
    host.push_dialog(DialogScript::save(vec![(0, 2, "8".to_string())]));

    let outcome = dock.open_attribute_editor(&mut host, 1).await.expect("open");
    assert_eq!(outcome, Some(SaveStatus::Failed));
    assert_eq!(host.editor_status(), ["Error saving data."]);

    let attributes = dock.store().expect("store").generic_attributes(1).await.expect("read");
    assert_eq!(attributes[0].intval, Some(3));
}

#[tokio::test]
async fn close_releases_connection_and_tool() {
    let mut host =
        HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0)).with_active_layer(buildings_layer());
    let (mut dock, connector) = connected_dock(&mut host).await;
    dock.load_buildings(&mut host).expect("load");
    dock.toggle_edit_tool(&mut host).expect("toggle");

    dock.close().await;
    assert!(!dock.is_connected());
    assert!(!dock.tracks_extent());
    assert!(dock.edit_tool().is_none());
    assert_eq!(connector.open_connections(), 0);

    // 再次关闭不报错
    dock.close().await;
}

#[test]
fn dock_span_carries_session_id() {
    let connector = Arc::new(InMemoryConnector::new(city_database()));
    let dock = tracing::subscriber::with_default(tracing_subscriber::registry(), || {
        dock_with(connector.clone())
    });

    let metadata = dock.span().metadata().expect("span metadata");
    assert_eq!(metadata.name(), "dock");
    assert!(metadata.fields().field("session_id").is_some());
    assert_eq!(dock.session_id().len(), 36);
}

#[tokio::test]
async fn logged_layer_source_hides_password() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.load_buildings(&mut host).expect("load");

    let source = dock.buildings_source(&host).expect("source");
    let logged = source.redacted();
    assert!(!logged.contains("secret"));
    assert!(logged.contains("password='***'"));
    // 图层本身仍使用完整凭据
    assert_eq!(host.layer(BUILDINGS_LAYER).expect("layer").uri, source.to_uri_string());
    assert!(source.to_uri_string().contains("password='secret'"));
}

#[tokio::test]
async fn building_count_ignores_feature_limit() {
    let mut host = HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0));
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.set_max_features(1);

    assert_eq!(dock.building_count(&host).await.expect("count"), 3);
    assert_eq!(dock.visible_building_ids(&host).await.expect("ids"), vec![1]);
}

#[tokio::test]
async fn replaced_map_tool_releases_edit_tool() {
    let mut host =
        HeadlessHost::new(Extent::new(0.0, 0.0, 10.0, 10.0)).with_active_layer(buildings_layer());
    let (mut dock, _) = connected_dock(&mut host).await;
    dock.toggle_edit_tool(&mut host).expect("toggle");

    dock.map_tool_replaced();
    let tool = dock.edit_tool().expect("tool kept until event is processed");
    assert_eq!(tool.state(), ToolState::Inactive);

    dock.process_tool_events(&mut host).await;
    assert!(dock.edit_tool().is_none());

    // 再次切换会重新创建并激活工具
    assert!(dock.toggle_edit_tool(&mut host).expect("toggle"));
    assert_eq!(host.cursor(), Cursor::Cross);
}
