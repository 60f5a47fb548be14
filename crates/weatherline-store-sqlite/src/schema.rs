//! SQL schema for the Weatherline SQLite store.
//!
//! Executed once at connection startup. There is no migration machinery; the
//! `user_version` pragma records which layout a file was created with.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Observations are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS observations (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    location              TEXT    NOT NULL,
    latitude              REAL,
    longitude             REAL,
    observed_at           TEXT    NOT NULL,   -- RFC 3339 UTC, millisecond precision
    fetched_at            TEXT    NOT NULL
                          DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    temperature_c         REAL,
    temperature_k         REAL,
    feels_like_c          REAL,
    humidity_pct          INTEGER,
    pressure_hpa          INTEGER,
    wind_speed_ms         REAL,
    wind_direction_deg    INTEGER,
    condition_main        TEXT,
    condition_description TEXT,
    raw_payload           TEXT    NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS observations_location_observed_idx
    ON observations(location, observed_at);
CREATE INDEX IF NOT EXISTS observations_location_fetched_idx
    ON observations(location, fetched_at);
CREATE INDEX IF NOT EXISTS observations_fetched_idx
    ON observations(fetched_at);

PRAGMA user_version = 1;
";
