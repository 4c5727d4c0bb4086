// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Gateway to the persistent transaction log. Records get a surrogate id at
//! creation and all edits/deletes go through it; the natural-key entry points
//! exist only for legacy rows that reached the display layer without one.

use crate::errors::LedgerError;
use crate::models::{EPSILON, NaturalKey, NewTransaction, Transaction, TxKind};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

/// Field updates applied to an existing transaction. Only quantity and venue
/// are editable after the fact.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    pub quantity: Option<f64>,
    pub venue: Option<String>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.venue.is_none()
    }
}

pub fn append(conn: &Connection, tx: &NewTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(timestamp, asset_id, asset_name, venue, kind, quantity, unit_price, fee, total)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            tx.timestamp.to_rfc3339(),
            tx.asset_id,
            tx.asset_name,
            tx.venue,
            tx.kind.as_str(),
            tx.quantity,
            tx.unit_price,
            tx.fee,
            tx.total
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The full log, newest first. Projection always replays this; there is no
/// incremental holdings state anywhere.
pub fn query_all(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, asset_id, asset_name, venue, kind, quantity, unit_price, fee, total
         FROM transactions ORDER BY timestamp DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, f64>(6)?,
            r.get::<_, f64>(7)?,
            r.get::<_, f64>(8)?,
            r.get::<_, f64>(9)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, ts, asset_id, asset_name, venue, kind, quantity, unit_price, fee, total) = row?;
        let timestamp = crate::utils::parse_timestamp(&ts)
            .with_context(|| format!("Invalid stored timestamp for transaction {}", id))?;
        let kind = TxKind::parse(&kind)
            .with_context(|| format!("Invalid stored kind for transaction {}", id))?;
        out.push(Transaction {
            id,
            timestamp,
            asset_id,
            asset_name,
            venue,
            kind,
            quantity,
            unit_price,
            fee,
            total,
        });
    }
    Ok(out)
}

pub fn update_by_id(conn: &Connection, id: i64, changes: &Changes) -> Result<usize> {
    if changes.is_empty() {
        return Ok(0);
    }
    let (set_sql, mut vals) = set_clause(changes);
    vals.push(Box::new(id));
    let sql = format!("UPDATE transactions SET {} WHERE id=?{}", set_sql, vals.len());
    let n = conn.execute(
        &sql,
        rusqlite::params_from_iter(vals.iter().map(|v| v.as_ref())),
    )?;
    if n == 0 {
        return Err(LedgerError::NoMatch.into());
    }
    Ok(n)
}

pub fn delete_by_id(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::NoMatch.into());
    }
    Ok(())
}

/// Rows matching the composite business key. Quantity is compared within ε
/// because it round-trips through a REAL column.
pub fn count_by_natural_key(conn: &Connection, key: &NaturalKey) -> Result<usize> {
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM transactions WHERE {}", NK_WHERE),
        params![
            key.timestamp.to_rfc3339(),
            key.asset_id,
            key.venue,
            key.kind.as_str(),
            key.quantity,
            EPSILON
        ],
        |r| r.get(0),
    )?;
    Ok(n as usize)
}

pub fn delete_by_natural_key(conn: &Connection, key: &NaturalKey, apply_all: bool) -> Result<usize> {
    guard_ambiguity(conn, key, apply_all)?;
    let n = conn.execute(
        &format!("DELETE FROM transactions WHERE {}", NK_WHERE),
        params![
            key.timestamp.to_rfc3339(),
            key.asset_id,
            key.venue,
            key.kind.as_str(),
            key.quantity,
            EPSILON
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::NoMatch.into());
    }
    Ok(n)
}

pub fn update_by_natural_key(
    conn: &Connection,
    key: &NaturalKey,
    changes: &Changes,
    apply_all: bool,
) -> Result<usize> {
    if changes.is_empty() {
        return Ok(0);
    }
    guard_ambiguity(conn, key, apply_all)?;
    let (set_sql, mut vals) = set_clause(changes);
    let offset = vals.len();
    let sql = format!(
        "UPDATE transactions SET {} WHERE {}",
        set_sql,
        nk_where_from(offset)
    );
    vals.push(Box::new(key.timestamp.to_rfc3339()));
    vals.push(Box::new(key.asset_id.clone()));
    vals.push(Box::new(key.venue.clone()));
    vals.push(Box::new(key.kind.as_str()));
    vals.push(Box::new(key.quantity));
    vals.push(Box::new(EPSILON));
    let n = conn.execute(
        &sql,
        rusqlite::params_from_iter(vals.iter().map(|v| v.as_ref())),
    )?;
    if n == 0 {
        return Err(LedgerError::NoMatch.into());
    }
    Ok(n)
}

/// Destructive full reset of the ledger.
pub fn truncate_all(conn: &Connection) -> Result<usize> {
    let n = conn.execute("DELETE FROM transactions", [])?;
    Ok(n)
}

const NK_WHERE: &str =
    "timestamp=?1 AND asset_id=?2 AND venue=?3 AND kind=?4 AND ABS(quantity-?5) < ?6";

fn nk_where_from(offset: usize) -> String {
    format!(
        "timestamp=?{} AND asset_id=?{} AND venue=?{} AND kind=?{} AND ABS(quantity-?{}) < ?{}",
        offset + 1,
        offset + 2,
        offset + 3,
        offset + 4,
        offset + 5,
        offset + 6
    )
}

fn guard_ambiguity(conn: &Connection, key: &NaturalKey, apply_all: bool) -> Result<()> {
    let count = count_by_natural_key(conn, key)?;
    if count > 1 && !apply_all {
        return Err(LedgerError::AmbiguousMatch { count }.into());
    }
    Ok(())
}

fn set_clause(changes: &Changes) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses = Vec::new();
    let mut vals: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(q) = changes.quantity {
        vals.push(Box::new(q));
        clauses.push(format!("quantity=?{}", vals.len()));
    }
    if let Some(v) = &changes.venue {
        vals.push(Box::new(v.clone()));
        clauses.push(format!("venue=?{}", vals.len()));
    }
    (clauses.join(", "), vals)
}
