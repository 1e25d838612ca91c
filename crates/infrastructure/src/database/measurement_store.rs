use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::DomainError;
use domain::measurement::{Measurement, MeasurementSample, MeasurementStore};
use domain::output::OutputId;
use sqlx::{Pool, Row, Sqlite};

/// Time series of output measurements in SQLite
#[derive(Clone)]
pub struct SqliteMeasurementStore {
    pool: Pool<Sqlite>,
}

impl SqliteMeasurementStore {
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS output_measurements (
                id INTEGER PRIMARY KEY,
                output_id TEXT NOT NULL,
                measurement TEXT NOT NULL,
                unit TEXT NOT NULL,
                channel INTEGER NOT NULL,
                value REAL NOT NULL,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Most recent samples of one series, newest first
    pub async fn recent(
        &self,
        output_id: &OutputId,
        measurement: Measurement,
        limit: i64,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, DomainError> {
        let rows = sqlx::query(
            "SELECT timestamp, value FROM output_measurements
             WHERE output_id = ? AND measurement = ?
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(output_id.as_str())
        .bind(measurement.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Metrics(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<DateTime<Utc>, _>(0), row.get::<f64, _>(1)))
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM output_measurements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MeasurementStore for SqliteMeasurementStore {
    async fn write_sample(&self, sample: &MeasurementSample) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO output_measurements
                (output_id, measurement, unit, channel, value, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(sample.output_id.as_str())
        .bind(sample.measurement.as_str())
        .bind(sample.unit())
        .bind(sample.channel as i64)
        .bind(sample.value)
        .bind(sample.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Metrics(e.to_string()))?;
        Ok(())
    }
}
