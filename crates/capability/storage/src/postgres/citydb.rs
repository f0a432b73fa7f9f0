//! Postgres 3D City Database 实现
//!
//! 设计要点：
//! - 独占一条连接（`Mutex<Option<PgConnection>>`），关闭后置为 None
//! - 失败语句先回滚，再归类为 Connection / Schema / Query 错误

use crate::error::{StorageError, is_connection_failure};
use crate::query::{
    BUILDING_OBJECTCLASS_ID, BUILDING_SQL, BuildingQuery, COUNT_BUILDINGS_SQL,
    ESTIMATED_EXTENT_SQL, GENERIC_ATTRIBUTES_SQL, SRID_SQL, UPDATE_GENERIC_ATTRIBUTE_SQL,
    VERSION_V3_SQL, VERSION_V4_SQL, ensure_finite, parse_legacy_version,
};
use crate::traits::{CityDbStore, Connector};
use async_trait::async_trait;
use citydb_telemetry::LOG_TARGET;
use domain::{
    ConnectionParams, Extent, FeatureId, GenericAttribute, GenericAttributeUpdate, SchemaVersion,
};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SAVE_ERROR: &str = "Error saving data";

pub struct PgCityDb {
    connection: Mutex<Option<PgConnection>>,
}

impl PgCityDb {
    pub fn new(connection: PgConnection) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
        }
    }

    pub async fn connect(params: &ConnectionParams) -> Result<Self, StorageError> {
        let connection = crate::connection::connect(params).await?;
        info!(target: LOG_TARGET, database = %params.describe(), "connected to database");
        Ok(Self::new(connection))
    }
}

/// 基于 sqlx 的连接器。
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn CityDbStore>, StorageError> {
        let store = PgCityDb::connect(params).await?;
        Ok(Box::new(store))
    }
}

#[async_trait]
impl CityDbStore for PgCityDb {
    async fn schema_version(&self) -> Result<SchemaVersion, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;

        match fetch_optional_tx(connection, sqlx::query(VERSION_V4_SQL)).await {
            Ok(row) => {
                if let Some(version) = row.and_then(|row| version_text(&row)) {
                    return Ok(SchemaVersion::V4(version));
                }
            }
            Err(err) if is_connection_failure(&err) => {
                return Err(StorageError::Connection(err.to_string()));
            }
            Err(err) => debug!(target: LOG_TARGET, error = %err, "citydb_pkg.citydb_version() unavailable"),
        }

        match fetch_optional_tx(connection, sqlx::query(VERSION_V3_SQL)).await {
            Ok(row) => {
                if let Some(version) = row.and_then(|row| version_text(&row)) {
                    return Ok(SchemaVersion::V3(parse_legacy_version(&version)));
                }
            }
            Err(err) if is_connection_failure(&err) => {
                return Err(StorageError::Connection(err.to_string()));
            }
            Err(err) => debug!(target: LOG_TARGET, error = %err, "citydb_version() unavailable"),
        }

        warn!(target: LOG_TARGET, "Error retrieving citydb version");
        Ok(SchemaVersion::NotACityDatabase)
    }

    async fn spatial_reference_id(&self) -> Result<i32, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;
        let message = "Error getting SRS from Database";

        let row = fetch_optional_tx(connection, sqlx::query(SRID_SQL))
            .await
            .map_err(|err| StorageError::schema(err, message))?;
        let Some(row) = row else {
            return Err(StorageError::Schema(format!("{message}: database_srs is empty")));
        };
        row.try_get::<i32, _>("srid")
            .map_err(|err| StorageError::schema(err, message))
    }

    async fn estimated_extent(&self) -> Result<Extent, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;
        let message = "Error getting estimated extent from Database";

        let row = fetch_optional_tx(connection, sqlx::query(ESTIMATED_EXTENT_SQL))
            .await
            .map_err(|err| StorageError::schema(err, message))?;
        let Some(row) = row else {
            return Err(StorageError::Schema(message.to_string()));
        };
        let read = |column: &str| {
            row.try_get::<Option<f64>, _>(column)
                .map_err(|err| StorageError::schema(err, message))?
                .ok_or_else(|| StorageError::Schema(format!("{message}: no statistics")))
        };
        Ok(Extent::new(
            read("x_min")?,
            read("y_min")?,
            read("x_max")?,
            read("y_max")?,
        ))
    }

    async fn count_buildings(&self, extent: &Extent, srid: i32) -> Result<i64, StorageError> {
        ensure_finite(extent)?;
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;
        let message = "Error counting buildings";

        let query = sqlx::query(COUNT_BUILDINGS_SQL)
            .bind(extent.xmin)
            .bind(extent.ymin)
            .bind(extent.xmax)
            .bind(extent.ymax)
            .bind(srid)
            .bind(BUILDING_OBJECTCLASS_ID);
        let row = fetch_optional_tx(connection, query)
            .await
            .map_err(|err| StorageError::query(err, message))?;
        match row {
            Some(row) => row
                .try_get::<i64, _>("total")
                .map_err(|err| StorageError::query(err, message)),
            None => Ok(0),
        }
    }

    async fn fetch_building_ids(
        &self,
        query: &BuildingQuery,
    ) -> Result<Vec<FeatureId>, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;
        let message = "Error loading buildings";

        let sql = format!("SELECT id::bigint AS id FROM ({BUILDING_SQL}) AS buildings");
        let extent = query.extent();
        let statement = sqlx::query(&sql)
            .bind(extent.xmin)
            .bind(extent.ymin)
            .bind(extent.xmax)
            .bind(extent.ymax)
            .bind(query.srid())
            .bind(i64::from(query.limit()));
        let rows = fetch_all_tx(connection, statement)
            .await
            .map_err(|err| StorageError::query(err, message))?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(
                row.try_get::<i64, _>("id")
                    .map_err(|err| StorageError::query(err, message))?,
            );
        }
        Ok(ids)
    }

    async fn generic_attributes(
        &self,
        feature_id: FeatureId,
    ) -> Result<Vec<GenericAttribute>, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;
        let message = "Error loading generic attributes";

        let query = sqlx::query(GENERIC_ATTRIBUTES_SQL).bind(feature_id);
        let rows = fetch_all_tx(connection, query)
            .await
            .map_err(|err| StorageError::query(err, message))?;
        let mut attributes = Vec::with_capacity(rows.len());
        for row in rows {
            attributes.push(
                attribute_from_row(&row).map_err(|err| StorageError::query(err, message))?,
            );
        }
        Ok(attributes)
    }

    async fn save_generic_attributes(
        &self,
        feature_id: FeatureId,
        updates: &[GenericAttributeUpdate],
    ) -> Result<u64, StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = live(&mut guard)?;

        let mut tx = connection
            .begin()
            .await
            .map_err(|err| StorageError::query(err, SAVE_ERROR))?;
        let mut affected = 0;
        for update in updates {
            info!(
                target: LOG_TARGET,
                feature_id,
                attrname = %update.attrname,
                "committing generic attribute"
            );
            let result = sqlx::query(UPDATE_GENERIC_ATTRIBUTE_SQL)
                .bind(update.strval.as_deref())
                .bind(update.intval)
                .bind(update.realval)
                .bind(feature_id)
                .bind(update.attrname.as_str())
                .execute(&mut *tx)
                .await;
            match result {
                Ok(done) => affected += done.rows_affected(),
                Err(err) => {
                    warn!(
                        target: LOG_TARGET,
                        error = %err,
                        attrname = %update.attrname,
                        "Error executing query"
                    );
                    rollback(tx).await;
                    return Err(StorageError::query(err, SAVE_ERROR));
                }
            }
        }
        tx.commit()
            .await
            .map_err(|err| StorageError::query(err, SAVE_ERROR))?;
        info!(target: LOG_TARGET, feature_id, rows = affected, "Committed data");
        Ok(affected)
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.connection.lock().await;
        let connection = guard.take().ok_or(StorageError::AlreadyClosed)?;
        connection
            .close()
            .await
            .map_err(|err| StorageError::Connection(format!("Error closing connection: {err}")))
    }
}

fn live(slot: &mut Option<PgConnection>) -> Result<&mut PgConnection, StorageError> {
    slot.as_mut()
        .ok_or_else(|| StorageError::Connection("connection is closed".to_string()))
}

fn version_text(row: &PgRow) -> Option<String> {
    row.try_get::<Option<String>, _>("version").ok().flatten()
}

fn attribute_from_row(row: &PgRow) -> Result<GenericAttribute, sqlx::Error> {
    Ok(GenericAttribute {
        cityobject_id: row.try_get("cityobject_id")?,
        attrname: row.try_get("attrname")?,
        strval: row.try_get("strval")?,
        intval: row.try_get("intval")?,
        realval: row.try_get("realval")?,
    })
}

async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(err) = tx.rollback().await {
        warn!(target: LOG_TARGET, error = %err, "rollback failed");
    }
}

async fn fetch_optional_tx(
    connection: &mut PgConnection,
    query: Query<'_, Postgres, PgArguments>,
) -> Result<Option<PgRow>, sqlx::Error> {
    let mut tx = connection.begin().await?;
    match query.fetch_optional(&mut *tx).await {
        Ok(row) => {
            tx.commit().await?;
            Ok(row)
        }
        Err(err) => {
            rollback(tx).await;
            Err(err)
        }
    }
}

async fn fetch_all_tx(
    connection: &mut PgConnection,
    query: Query<'_, Postgres, PgArguments>,
) -> Result<Vec<PgRow>, sqlx::Error> {
    let mut tx = connection.begin().await?;
    match query.fetch_all(&mut *tx).await {
        Ok(rows) => {
            tx.commit().await?;
            Ok(rows)
        }
        Err(err) => {
            rollback(tx).await;
            Err(err)
        }
    }
}
