// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::ledger::{self, Changes};
use crate::market;
use crate::models::{NaturalKey, NewTransaction, Transaction, TxKind};
use crate::utils::{
    date_to_utc, fmt_local, fmt_quantity, maybe_print_json, parse_amount, parse_date,
    parse_quantity, parse_timestamp, pretty_table,
};
use anyhow::{Result, anyhow, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap().trim())?;
    let asset_id = sub
        .get_one::<String>("asset")
        .map(|s| s.trim().to_lowercase())
        .unwrap();
    let venue = sub
        .get_one::<String>("venue")
        .map(|s| s.trim().to_string())
        .unwrap();
    let kind = TxKind::parse(sub.get_one::<String>("kind").unwrap().trim())?;
    if kind.is_adjustment() {
        bail!("Manual entries are buy or sell; adjustments are created by 'holdings set'");
    }
    let quantity = parse_quantity(sub.get_one::<String>("quantity").unwrap())?;
    let unit_price = parse_amount(sub.get_one::<String>("price").unwrap())?;
    let fee = match sub.get_one::<String>("fee") {
        Some(raw) => parse_amount(raw)?,
        None => 0.0,
    };

    // Prefer the snapshot's display name when the caller didn't give one.
    let asset_name = match sub.get_one::<String>("name") {
        Some(n) => n.trim().to_string(),
        None => {
            let view = market::load_market_view(conn)?;
            view.display_name(&asset_id).to_string()
        }
    };

    let tx = NewTransaction {
        timestamp: date_to_utc(date),
        asset_id,
        asset_name,
        venue,
        kind,
        quantity,
        unit_price,
        fee,
        total: quantity * unit_price,
    };
    let id = ledger::append(conn, &tx)?;
    println!(
        "Recorded {} {} x {} @ {} on {} (id {})",
        tx.kind.as_str(),
        fmt_quantity(tx.quantity),
        tx.asset_id,
        tx.unit_price,
        tx.venue,
        id
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    fmt_local(t.timestamp),
                    t.asset_name.clone(),
                    t.venue.clone(),
                    t.kind.as_str().to_string(),
                    fmt_quantity(t.quantity),
                    format!("{:.2}", t.unit_price),
                    format!("{:.2}", t.fee),
                    format!("{:.2}", t.total),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Asset", "Venue", "Kind", "Qty", "Price", "Fee", "Total"],
                rows,
            )
        );
    }
    Ok(())
}

/// Newest-first rows with the list filters applied.
pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<Transaction>> {
    let asset = sub.get_one::<String>("asset").map(|s| s.to_lowercase());
    let venue = sub.get_one::<String>("venue");
    let limit = sub.get_one::<usize>("limit").copied();

    let mut data: Vec<Transaction> = ledger::query_all(conn)?
        .into_iter()
        .filter(|t| asset.as_deref().is_none_or(|a| t.asset_id == a))
        .filter(|t| venue.is_none_or(|v| &t.venue == v))
        .collect();
    if let Some(n) = limit {
        data.truncate(n);
    }
    Ok(data)
}

fn changes_from(sub: &clap::ArgMatches) -> Result<Changes> {
    let quantity = match sub.get_one::<String>("set-quantity") {
        Some(raw) => Some(parse_quantity(raw)?),
        None => None,
    };
    let venue = sub.get_one::<String>("set-venue").map(|s| s.trim().to_string());
    Ok(Changes { quantity, venue })
}

/// Legacy identity for rows addressed without a surrogate id.
fn natural_key_from(sub: &clap::ArgMatches) -> Result<NaturalKey> {
    let missing = |flag: &str| anyhow!("Without --id, --{} is required to identify the row", flag);
    Ok(NaturalKey {
        timestamp: parse_timestamp(
            sub.get_one::<String>("timestamp")
                .ok_or_else(|| missing("timestamp"))?,
        )?,
        asset_id: sub
            .get_one::<String>("asset")
            .ok_or_else(|| missing("asset"))?
            .to_lowercase(),
        venue: sub
            .get_one::<String>("venue")
            .ok_or_else(|| missing("venue"))?
            .clone(),
        kind: TxKind::parse(sub.get_one::<String>("kind").ok_or_else(|| missing("kind"))?)?,
        quantity: parse_quantity(
            sub.get_one::<String>("quantity")
                .ok_or_else(|| missing("quantity"))?,
        )?,
    })
}

/// The flag hint belongs to the CLI, not to the gateway's error.
fn suggest_all(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::AmbiguousMatch { .. }) => {
            err.context("pass --all to apply to every matching transaction")
        }
        _ => err,
    }
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let changes = changes_from(sub)?;
    if changes.is_empty() {
        println!("Nothing to change (pass --set-quantity and/or --set-venue)");
        return Ok(());
    }
    let n = if let Some(id) = sub.get_one::<i64>("id") {
        ledger::update_by_id(conn, *id, &changes)?
    } else {
        let key = natural_key_from(sub)?;
        ledger::update_by_natural_key(conn, &key, &changes, sub.get_flag("all"))
            .map_err(suggest_all)?
    };
    println!("Updated {} transaction(s)", n);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    if let Some(id) = sub.get_one::<i64>("id") {
        ledger::delete_by_id(conn, *id)?;
        println!("Deleted transaction {}", id);
    } else {
        let key = natural_key_from(sub)?;
        let n = ledger::delete_by_natural_key(conn, &key, sub.get_flag("all"))
            .map_err(suggest_all)?;
        println!("Deleted {} transaction(s)", n);
    }
    Ok(())
}
