use citydb_storage::{Connector, PgConnector, StorageError, connect_options};
use domain::ConnectionParams;

#[test]
fn invalid_port_is_connection_error() {
    let params = ConnectionParams::new("localhost", "not-a-port", "citydb", "user", "secret");
    let err = connect_options(&params).err().expect("invalid port");
    assert!(matches!(err, StorageError::Connection(_)));
}

#[test]
fn empty_port_uses_default() {
    let params = ConnectionParams::new("localhost", "", "citydb", "user", "");
    let options = connect_options(&params).expect("options");
    assert_eq!(options.get_port(), 5432);
    assert_eq!(options.get_host(), "localhost");
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    // 端口 1 上没有 PostgreSQL 服务
    let params = ConnectionParams::new("127.0.0.1", "1", "citydb", "user", "secret");
    let err = PgConnector.connect(&params).await.err().expect("refused");
    assert!(err.is_connection());
}
