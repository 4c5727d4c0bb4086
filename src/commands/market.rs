// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::market;
use crate::models::DisplayCurrency;
use crate::utils::{fmt_money, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("refresh", _)) => refresh(conn),
        Some(("watchlist", sub)) => watchlist(conn, sub),
        _ => Ok(()),
    }
}

/// Fetch the market snapshot and the USD cross-rate, persisting both. The
/// cross-rate failing on its own is only a warning; valuation falls back to
/// the last stored rate.
pub fn refresh_all(conn: &mut Connection) -> Result<()> {
    let entries = market::fetch_markets().context("Fetch market data")?;
    market::save_snapshot(conn, &entries)?;
    match market::fetch_cross_rate(DisplayCurrency::Usd.code()) {
        Ok(rate) => market::save_rate(conn, DisplayCurrency::Usd.code(), rate)?,
        Err(e) => eprintln!("warning: USD cross-rate fetch failed: {:#}", e),
    }
    Ok(())
}

fn refresh(conn: &mut Connection) -> Result<()> {
    refresh_all(conn)?;
    let view = market::load_market_view(conn)?;
    println!("Fetched {} market quotes", view.quotes.len());
    Ok(())
}

fn watchlist(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let currency = DisplayCurrency::parse(sub.get_one::<String>("currency").unwrap())?;
    let rate = if currency == DisplayCurrency::Jpy {
        1.0
    } else {
        market::latest_rate(conn, currency.code())?.unwrap_or_else(|| {
            eprintln!(
                "warning: no {} rate stored; showing reference-currency prices",
                currency.code()
            );
            1.0
        })
    };

    let rows = market::load_watchlist(conn)?;
    if rows.is_empty() {
        println!("No market snapshot. Run 'coinclip market refresh' first.");
        return Ok(());
    }

    let symbol = currency.symbol();
    let precision = currency.price_precision();
    let data = rows
        .into_iter()
        .map(|r| {
            vec![
                r.name,
                r.symbol.to_uppercase(),
                fmt_money(r.price * rate, symbol, precision),
                r.change_24h_pct
                    .map(|p| format!("{:+.2}%", p))
                    .unwrap_or_else(|| "n/a".into()),
                r.market_cap
                    .map(|c| fmt_money(c * rate, symbol, 0))
                    .unwrap_or_else(|| "n/a".into()),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Name", "Symbol", "Price", "24h", "Market Cap"], data)
    );
    Ok(())
}
