// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger;
use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    // query_all is newest-first; exports read better oldest-first.
    let mut rows = ledger::query_all(conn)?;
    rows.reverse();

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "timestamp",
                "asset_id",
                "asset_name",
                "venue",
                "kind",
                "quantity",
                "unit_price",
                "fee",
                "total",
            ])?;
            for t in rows {
                wtr.write_record([
                    t.timestamp.to_rfc3339(),
                    t.asset_id,
                    t.asset_name,
                    t.venue,
                    t.kind.as_str().to_string(),
                    t.quantity.to_string(),
                    t.unit_price.to_string(),
                    t.fee.to_string(),
                    t.total.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = rows
                .iter()
                .map(|t| {
                    json!({
                        "timestamp": t.timestamp.to_rfc3339(),
                        "asset_id": t.asset_id,
                        "asset_name": t.asset_name,
                        "venue": t.venue,
                        "kind": t.kind.as_str(),
                        "quantity": t.quantity,
                        "unit_price": t.unit_price,
                        "fee": t.fee,
                        "total": t.total,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported transactions to {}", out);
    Ok(())
}
