use domain::{ConnectionParams, Extent, GenericAttribute, GenericAttributeUpdate, SchemaVersion};

#[test]
fn connection_params_describe_hides_password() {
    let params = ConnectionParams::new("db.local", "5432", "citydb", "citydb_user", "secret");

    let text = params.describe();
    assert_eq!(text, "citydb_user@db.local:5432/citydb");
    assert!(!text.contains("secret"));
}

#[test]
fn extent_intersection_includes_touching_edges() {
    let view = Extent::new(0.0, 0.0, 10.0, 10.0);

    assert!(view.intersects(&Extent::new(5.0, 5.0, 6.0, 6.0)));
    assert!(view.intersects(&Extent::new(10.0, 10.0, 12.0, 12.0)));
    assert!(!view.intersects(&Extent::new(10.5, 0.0, 12.0, 3.0)));
    assert!(!Extent::new(0.0, 0.0, f64::NAN, 1.0).is_finite());
}

#[test]
fn schema_version_reports_city_database() {
    assert_eq!(SchemaVersion::V4("4.1.0".to_string()).version(), Some("4.1.0"));
    assert!(SchemaVersion::V3("3.3.1".to_string()).is_city_database());
    assert!(!SchemaVersion::NotACityDatabase.is_city_database());
    assert_eq!(SchemaVersion::NotACityDatabase.version(), None);
}

#[test]
fn update_copies_attribute_values() {
    let attribute = GenericAttribute {
        cityobject_id: 7,
        attrname: "height".to_string(),
        strval: None,
        intval: Some(12),
        realval: Some(12.5),
    };

    let update = GenericAttributeUpdate::from(&attribute);
    assert_eq!(update.attrname, "height");
    assert_eq!(update.intval, Some(12));
    assert_eq!(update.realval, Some(12.5));
    assert!(update.strval.is_none());
}
