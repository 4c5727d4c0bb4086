// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger;
use crate::market;
use crate::models::KNOWN_VENUES;
use crate::portfolio::project;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Kind strings the enum no longer recognises (pre-schema-check rows)
    let mut stmt = conn.prepare(
        "SELECT id, kind FROM transactions
         WHERE kind NOT IN ('buy','sell','adjust_increase','adjust_decrease')",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let kind: String = r.get(1)?;
        rows.push(vec!["unknown_kind".into(), format!("id {} kind '{}'", id, kind)]);
    }

    // 2) Negative quantities; direction belongs to the kind, never the sign
    let mut stmt2 = conn.prepare("SELECT id, quantity FROM transactions WHERE quantity < 0")?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let q: f64 = r.get(1)?;
        rows.push(vec!["negative_quantity".into(), format!("id {} quantity {}", id, q)]);
    }

    // 3) Adjustments carrying price information
    let mut stmt3 = conn.prepare(
        "SELECT id FROM transactions
         WHERE kind IN ('adjust_increase','adjust_decrease')
           AND (unit_price != 0 OR fee != 0 OR total != 0)",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec!["priced_adjustment".into(), format!("id {}", id)]);
    }

    // 4) Venues outside the known display set; informational, venues are
    //    free-form by contract
    let mut stmt4 = conn.prepare("SELECT DISTINCT venue FROM transactions")?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let venue: String = r.get(0)?;
        if !KNOWN_VENUES.contains(&venue.as_str()) {
            rows.push(vec!["unlisted_venue".into(), venue]);
        }
    }

    // 5) Held assets the market snapshot can't price (they value at zero)
    let view = market::load_market_view(conn)?;
    if !view.quotes.is_empty() {
        let holdings = project(&ledger::query_all(conn)?);
        for key in holdings.keys() {
            if !view.quotes.contains_key(&key.asset_id) {
                rows.push(vec!["unpriced_holding".into(), key.asset_id.clone()]);
            }
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
