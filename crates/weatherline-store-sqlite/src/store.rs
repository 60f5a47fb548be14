//! [`SqliteStore`], the SQLite implementation of [`ObservationStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use weatherline_core::{NewObservation, Observation, ObservationStore, StaleLocation};

use crate::{
  Result,
  encode::{COLUMNS, RawObservation, decode_dt, encode_dt, encode_storable_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An observation store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Concurrent
/// callers are serialised onto the connection's thread, so parallel inserts
/// need no extra coordination.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  /// Missing parent directories are created.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened observation store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query returning whole rows and decode them.
  async fn select(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Observation>> {
    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  type Error = crate::Error;

  async fn save(&self, obs: NewObservation) -> Result<Observation> {
    // Checked before the INSERT so an unreadable row is never committed.
    let observed_at_str = encode_storable_dt(obs.observed_at)?;
    let fetched_at_str  = encode_storable_dt(obs.fetched_at)?;

    let raw: RawObservation = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO observations (
             location, latitude, longitude, observed_at, fetched_at,
             temperature_c, temperature_k, feels_like_c, humidity_pct,
             pressure_hpa, wind_speed_ms, wind_direction_deg,
             condition_main, condition_description, raw_payload
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
           RETURNING {COLUMNS}"
        );
        let row = conn.query_row(
          &sql,
          rusqlite::params![
            obs.location,
            obs.latitude,
            obs.longitude,
            observed_at_str,
            fetched_at_str,
            obs.temperature_c,
            obs.temperature_k,
            obs.feels_like_c,
            obs.humidity_pct,
            obs.pressure_hpa,
            obs.wind_speed_ms,
            obs.wind_direction_deg,
            obs.condition_main,
            obs.condition_description,
            obs.raw_payload,
          ],
          RawObservation::from_row,
        )?;
        Ok(row)
      })
      .await?;

    raw.into_observation()
  }

  async fn latest(&self, prefix: &str, limit: usize) -> Result<Vec<Observation>> {
    // `substr` keeps the match case-sensitive and free of LIKE wildcards.
    let sql = format!(
      "SELECT {COLUMNS} FROM (
         SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY location
                     ORDER BY fetched_at DESC, id DESC
                   ) AS rn
         FROM observations
         WHERE substr(location, 1, length(?1)) = ?1
       )
       WHERE rn = 1
       ORDER BY fetched_at DESC, id DESC
       LIMIT ?2"
    );
    self
      .select(sql, vec![prefix.to_owned().into(), to_sql_limit(limit).into()])
      .await
  }

  async fn recent(&self, limit: usize) -> Result<Vec<Observation>> {
    let sql = format!(
      "SELECT {COLUMNS} FROM observations
       ORDER BY fetched_at DESC, id DESC
       LIMIT ?1"
    );
    self.select(sql, vec![to_sql_limit(limit).into()]).await
  }

  async fn stale_locations(&self, threshold_minutes: u32) -> Result<Vec<StaleLocation>> {
    let cutoff = encode_dt(Utc::now() - Duration::minutes(i64::from(threshold_minutes)));

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT location, MAX(fetched_at) AS last_fetched
           FROM observations
           GROUP BY location
           HAVING MAX(fetched_at) < ?1
           ORDER BY location",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(location, last)| {
        Ok(StaleLocation { location, last_fetched_at: decode_dt(&last)? })
      })
      .collect()
  }

  async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM observations", [], |r| r.get(0))?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }
}

fn to_sql_limit(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }
