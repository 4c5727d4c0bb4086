// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! CoinGecko market data: the top-20 snapshot used for valuation and the
//! watchlist, and the display cross-rate derived from the numeraire's dual
//! quote. Refresh is always caller-triggered; nothing here runs on a timer.

use crate::models::{NUMERAIRE_ASSET, REFERENCE_CURRENCY};
use crate::portfolio::{MarketQuote, MarketView};
use crate::utils::http_client;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use std::collections::HashMap;

const API_BASE: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Deserialize)]
pub struct MarketEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Top 20 assets by market cap, quoted in the reference currency.
pub fn fetch_markets() -> Result<Vec<MarketEntry>> {
    let url = format!(
        "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page=20&page=1",
        API_BASE, REFERENCE_CURRENCY
    );
    let client = http_client()?;
    let resp = client.get(url).send()?.error_for_status()?;
    let entries: Vec<MarketEntry> = resp.json().context("Decode CoinGecko market data")?;
    Ok(entries)
}

/// Display cross-rate for `target`, anchored to the numeraire's quote:
/// r = price(numeraire, target) / price(numeraire, reference). Per-asset
/// cross-listings are deliberately not consulted.
pub fn fetch_cross_rate(target: &str) -> Result<f64> {
    let target = target.to_lowercase();
    if target == REFERENCE_CURRENCY {
        return Ok(1.0);
    }
    let url = format!(
        "{}/simple/price?ids={}&vs_currencies={},{}",
        API_BASE, NUMERAIRE_ASSET, REFERENCE_CURRENCY, target
    );
    let client = http_client()?;
    let resp = client.get(url).send()?.error_for_status()?;
    let prices: HashMap<String, HashMap<String, f64>> =
        resp.json().context("Decode CoinGecko simple price")?;
    let quote = prices
        .get(NUMERAIRE_ASSET)
        .ok_or_else(|| anyhow!("No {} quote in response", NUMERAIRE_ASSET))?;
    let reference = quote
        .get(REFERENCE_CURRENCY)
        .copied()
        .filter(|p| *p > 0.0)
        .ok_or_else(|| anyhow!("No usable {} price for {}", REFERENCE_CURRENCY, NUMERAIRE_ASSET))?;
    let display = quote
        .get(&target)
        .copied()
        .ok_or_else(|| anyhow!("No {} price for {}", target, NUMERAIRE_ASSET))?;
    Ok(display / reference)
}

/// Replace the stored snapshot wholesale with a fresh fetch.
pub fn save_snapshot(conn: &mut Connection, entries: &[MarketEntry]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM market_snapshot", [])?;
    {
        let mut insert = tx.prepare_cached(
            "INSERT INTO market_snapshot(asset_id, symbol, name, price, change_24h, change_24h_pct, market_cap, fetched_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        )?;
        for e in entries {
            insert.execute(params![
                e.id,
                e.symbol,
                e.name,
                e.current_price.unwrap_or(0.0),
                e.price_change_24h.unwrap_or(0.0),
                e.price_change_percentage_24h,
                e.market_cap,
                now
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_rate(conn: &Connection, currency: &str, rate: f64) -> Result<()> {
    conn.execute(
        "INSERT INTO fx_rates(currency, rate, fetched_at) VALUES(?1, ?2, ?3)
         ON CONFLICT(currency) DO UPDATE SET rate=excluded.rate, fetched_at=excluded.fetched_at",
        params![currency.to_lowercase(), rate, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn latest_rate(conn: &Connection, currency: &str) -> Result<Option<f64>> {
    let rate: Option<f64> = conn
        .query_row(
            "SELECT rate FROM fx_rates WHERE currency=?1",
            params![currency.to_lowercase()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(rate)
}

/// The stored snapshot as price/change/name maps for the valuation engine.
pub fn load_market_view(conn: &Connection) -> Result<MarketView> {
    let mut stmt =
        conn.prepare("SELECT asset_id, name, price, change_24h FROM market_snapshot")?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, f64>(2)?,
            r.get::<_, f64>(3)?,
        ))
    })?;
    let mut view = MarketView::default();
    for row in rows {
        let (asset_id, name, price, change_24h) = row?;
        view.quotes
            .insert(asset_id.clone(), MarketQuote { price, change_24h });
        view.names.insert(asset_id, name);
    }
    Ok(view)
}

/// Watchlist row straight from the snapshot table, market-cap descending.
#[derive(Debug, Clone)]
pub struct WatchRow {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub change_24h_pct: Option<f64>,
    pub market_cap: Option<f64>,
}

pub fn load_watchlist(conn: &Connection) -> Result<Vec<WatchRow>> {
    let mut stmt = conn.prepare(
        "SELECT name, symbol, price, change_24h_pct, market_cap
         FROM market_snapshot ORDER BY market_cap DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(WatchRow {
            name: r.get(0)?,
            symbol: r.get(1)?,
            price: r.get(2)?,
            change_24h_pct: r.get(3)?,
            market_cap: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
