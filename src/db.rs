// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Coinclip", "coinclip"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("coinclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// Idempotent; also the first-run recovery path when the table is missing.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,      -- UTC, RFC 3339
        asset_id TEXT NOT NULL,
        asset_name TEXT NOT NULL,
        venue TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('buy','sell','adjust_increase','adjust_decrease')),
        quantity REAL NOT NULL CHECK(quantity >= 0),
        unit_price REAL NOT NULL DEFAULT 0,  -- reference currency (JPY)
        fee REAL NOT NULL DEFAULT 0,
        total REAL NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);

    -- Latest top-20 market rows, replaced wholesale on refresh.
    CREATE TABLE IF NOT EXISTS market_snapshot(
        asset_id TEXT PRIMARY KEY,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        price REAL NOT NULL,          -- reference currency
        change_24h REAL NOT NULL,     -- absolute, reference currency
        change_24h_pct REAL,
        market_cap REAL,
        fetched_at TEXT NOT NULL
    );

    -- Display cross-rates derived from the numeraire's dual quote.
    CREATE TABLE IF NOT EXISTS fx_rates(
        currency TEXT PRIMARY KEY,
        rate REAL NOT NULL,
        fetched_at TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}
