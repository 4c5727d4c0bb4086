// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger;
use crate::market;
use crate::models::{DisplayCurrency, HoldingKey, NUMERAIRE_ASSET};
use crate::portfolio::{
    FiatDelta, NumeraireDelta, PortfolioValuation, fiat_delta, group_by_asset, group_by_venue,
    numeraire_delta, numeraire_value, project, value_portfolio,
};
use crate::reconcile::{self, HoldingsMap};
use crate::utils::{fmt_money, fmt_quantity, maybe_print_json, parse_quantity, pretty_table};
use anyhow::{Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub),
        _ => show(conn, m),
    }
}

#[derive(Serialize)]
struct HoldingsReport {
    currency: String,
    rate: f64,
    valuation: PortfolioValuation,
    display_total: f64,
    fiat: FiatDelta,
    total_in_numeraire: f64,
    numeraire: Option<NumeraireDelta>,
}

fn show(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let currency = DisplayCurrency::parse(sub.get_one::<String>("currency").unwrap())?;
    if sub.get_flag("live") {
        // A dead provider downgrades to the stored snapshot, never aborts.
        if let Err(e) = super::market::refresh_all(conn) {
            eprintln!("warning: market refresh failed, using stored data: {:#}", e);
        }
    }

    let market_view = market::load_market_view(conn)?;
    if market_view.quotes.is_empty() {
        eprintln!("warning: no market snapshot; run 'coinclip market refresh' to fetch prices");
    }
    let rate = display_rate(conn, currency);

    let transactions = ledger::query_all(conn)?;
    let holdings = project(&transactions);
    let valuation = value_portfolio(&holdings, &market_view);
    let fiat = fiat_delta(valuation.total_value, valuation.total_change_24h, rate);
    let numeraire_quote = market_view.quote(NUMERAIRE_ASSET);
    let total_in_numeraire = numeraire_value(valuation.total_value, numeraire_quote.price);
    let numeraire = numeraire_delta(
        valuation.total_value,
        valuation.total_change_24h,
        numeraire_quote,
    );

    let report = HoldingsReport {
        currency: currency.code().to_string(),
        rate,
        display_total: valuation.total_value * rate,
        fiat,
        total_in_numeraire,
        numeraire,
        valuation,
    };
    if let Some(group) = sub.get_one::<String>("group-by") {
        return show_grouped(&report, group, currency, sub.get_flag("json"));
    }
    if maybe_print_json(sub.get_flag("json"), false, &report)? {
        return Ok(());
    }

    if report.valuation.positions.is_empty() {
        println!("No holdings. Record transactions with 'coinclip tx add'.");
        return Ok(());
    }

    let symbol = currency.symbol();
    let precision = currency.price_precision();
    let rows = report
        .valuation
        .positions
        .iter()
        .map(|p| {
            let share = if report.valuation.total_value > 0.0 {
                p.value / report.valuation.total_value * 100.0
            } else {
                0.0
            };
            vec![
                p.asset_name.clone(),
                p.venue.clone(),
                fmt_quantity(p.quantity),
                fmt_money(p.price * report.rate, symbol, precision),
                fmt_money(p.value * report.rate, symbol, 0),
                format!("{:.2}%", share),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Asset", "Venue", "Qty", "Price", "Value", "Share"], rows)
    );

    println!(
        "Total: {}  ({}{:.2}, {:+.2}% 24h)",
        fmt_money(report.display_total, symbol, 0),
        if report.fiat.display_change >= 0.0 { "+" } else { "" },
        report.fiat.display_change,
        report.fiat.change_pct
    );
    match report.numeraire {
        Some(d) => println!(
            "In BTC: {:.4} BTC ({:+.8} BTC, {:+.2}% 24h)",
            d.units_today, d.change_units, d.change_pct
        ),
        None => println!("In BTC: {:.4} BTC (24h change n/a)", report.total_in_numeraire),
    }
    Ok(())
}

/// Rolled-up view of the same valuation: one row per coin across venues, or
/// one row per venue across coins.
fn show_grouped(
    report: &HoldingsReport,
    group: &str,
    currency: DisplayCurrency,
    json: bool,
) -> Result<()> {
    let symbol = currency.symbol();
    match group {
        "coin" => {
            let groups = group_by_asset(&report.valuation);
            if maybe_print_json(json, false, &groups)? {
                return Ok(());
            }
            if groups.is_empty() {
                println!("No holdings. Record transactions with 'coinclip tx add'.");
                return Ok(());
            }
            let rows = groups
                .iter()
                .map(|g| {
                    vec![
                        g.asset_name.clone(),
                        fmt_quantity(g.quantity),
                        fmt_money(g.value * report.rate, symbol, 0),
                        format!("{:.2}%", g.share_pct),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Asset", "Qty", "Value", "Share"], rows));
        }
        "venue" => {
            let groups = group_by_venue(&report.valuation);
            if maybe_print_json(json, false, &groups)? {
                return Ok(());
            }
            if groups.is_empty() {
                println!("No holdings. Record transactions with 'coinclip tx add'.");
                return Ok(());
            }
            let rows = groups
                .iter()
                .map(|g| {
                    vec![
                        g.venue.clone(),
                        fmt_money(g.value * report.rate, symbol, 0),
                        format!("{:.2}%", g.share_pct),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Venue", "Value", "Share"], rows));
        }
        other => bail!("Unknown grouping: {} (use coin or venue)", other),
    }
    println!("Total: {}", fmt_money(report.display_total, symbol, 0));
    Ok(())
}

/// Cross-rate for the display currency; an unreachable or never-fetched rate
/// degrades to 1.0 with a warning.
fn display_rate(conn: &Connection, currency: DisplayCurrency) -> f64 {
    if currency == DisplayCurrency::Jpy {
        return 1.0;
    }
    match market::latest_rate(conn, currency.code()) {
        Ok(Some(rate)) => rate,
        Ok(None) => {
            eprintln!(
                "warning: no {} rate stored; run 'coinclip market refresh' (using 1.0)",
                currency.code()
            );
            1.0
        }
        Err(e) => {
            eprintln!("warning: could not read {} rate: {:#} (using 1.0)", currency.code(), e);
            1.0
        }
    }
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let asset = sub.get_one::<String>("asset").unwrap().to_lowercase();
    let venue = sub.get_one::<String>("venue").unwrap().clone();
    let quantity = parse_quantity(sub.get_one::<String>("quantity").unwrap())?;
    let key = HoldingKey::new(&asset, &venue);

    let mut session = reconcile::Session::new();
    let baseline = session.baseline_or_load(|| -> Result<HoldingsMap> {
        Ok(project(&ledger::query_all(conn)?))
    })?;

    if !baseline.contains_key(&key) {
        println!(
            "No current holding for {} at {}; record a buy instead of an adjustment.",
            asset, venue
        );
        return Ok(());
    }

    let plan = reconcile::plan_adjustments(baseline, &[(key.clone(), quantity)], Utc::now());
    if plan.is_empty() {
        println!("Quantity unchanged; nothing to reconcile.");
        return Ok(());
    }
    for adj in &plan {
        ledger::append(conn, adj)?;
        println!(
            "Booked {} of {} {} at {}",
            adj.kind.as_str(),
            fmt_quantity(adj.quantity),
            adj.asset_id,
            adj.venue
        );
    }
    // The baseline is stale the moment adjustments land.
    session.clear();

    let holdings = project(&ledger::query_all(conn)?);
    let now_qty = holdings.get(&key).map(|h| h.quantity).unwrap_or(0.0);
    println!("{} at {} now {}", asset, venue, fmt_quantity(now_qty));
    Ok(())
}
