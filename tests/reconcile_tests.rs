// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{TimeZone, Utc};
use coinclip::db;
use coinclip::ledger;
use coinclip::models::{EPSILON, HoldingKey, NewTransaction, TxKind};
use coinclip::portfolio::project;
use coinclip::reconcile::{self, HoldingsMap, Session};
use rusqlite::Connection;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn seed(conn: &Connection, asset: &str, venue: &str, kind: TxKind, quantity: f64, day: u32) {
    let tx = NewTransaction {
        timestamp: Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap(),
        asset_id: asset.to_string(),
        asset_name: asset.to_string(),
        venue: venue.to_string(),
        kind,
        quantity,
        unit_price: 1000.0,
        fee: 0.0,
        total: quantity * 1000.0,
    };
    ledger::append(conn, &tx).unwrap();
}

#[test]
fn edited_quantity_becomes_one_adjustment_and_reprojects() {
    let conn = setup();
    // 1.0 bought, 0.3 sold -> 0.7 held
    seed(&conn, "bitcoin", "Binance", TxKind::Buy, 1.0, 1);
    seed(&conn, "bitcoin", "Binance", TxKind::Sell, 0.3, 2);

    let key = HoldingKey::new("bitcoin", "Binance");
    let mut session = Session::new();
    let baseline = session
        .baseline_or_load(|| -> anyhow::Result<HoldingsMap> {
            Ok(project(&ledger::query_all(&conn)?))
        })
        .unwrap();
    assert!((baseline[&key].quantity - 0.7).abs() < EPSILON);

    // the operator edits the displayed 0.7 down to 0.5
    let plan = reconcile::plan_adjustments(baseline, &[(key.clone(), 0.5)], Utc::now());
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].kind, TxKind::AdjustDecrease);
    assert!((plan[0].quantity - 0.2).abs() < EPSILON);
    assert_eq!(plan[0].unit_price, 0.0);
    assert_eq!(plan[0].fee, 0.0);
    assert_eq!(plan[0].total, 0.0);

    for adj in &plan {
        ledger::append(&conn, adj).unwrap();
    }
    session.clear();
    assert!(!session.is_loaded());

    let holdings = project(&ledger::query_all(&conn).unwrap());
    assert!((holdings[&key].quantity - 0.5).abs() < EPSILON);

    // the ledger now carries exactly one synthetic event
    let adjustments: Vec<_> = ledger::query_all(&conn)
        .unwrap()
        .into_iter()
        .filter(|t| t.kind.is_adjustment())
        .collect();
    assert_eq!(adjustments.len(), 1);
}

#[test]
fn reconciling_an_unchanged_snapshot_appends_nothing() {
    let conn = setup();
    seed(&conn, "ethereum", "bitbank", TxKind::Buy, 2.0, 1);

    let baseline = project(&ledger::query_all(&conn).unwrap());
    let key = HoldingKey::new("ethereum", "bitbank");
    let plan = reconcile::plan_adjustments(&baseline, &[(key, 2.0)], Utc::now());
    assert!(plan.is_empty());
    assert_eq!(ledger::query_all(&conn).unwrap().len(), 1);
}

#[test]
fn repeated_edits_compare_against_a_fresh_baseline() {
    let conn = setup();
    seed(&conn, "bitcoin", "Binance", TxKind::Buy, 1.0, 1);
    let key = HoldingKey::new("bitcoin", "Binance");

    // first edit: 1.0 -> 0.8
    let baseline = project(&ledger::query_all(&conn).unwrap());
    for adj in reconcile::plan_adjustments(&baseline, &[(key.clone(), 0.8)], Utc::now()) {
        ledger::append(&conn, &adj).unwrap();
    }

    // second edit re-projects; comparing against the stale 1.0 baseline
    // would book 0.3 instead of 0.1 and drift the ledger
    let baseline = project(&ledger::query_all(&conn).unwrap());
    assert!((baseline[&key].quantity - 0.8).abs() < EPSILON);
    let plan = reconcile::plan_adjustments(&baseline, &[(key.clone(), 0.7)], Utc::now());
    assert_eq!(plan.len(), 1);
    assert!((plan[0].quantity - 0.1).abs() < EPSILON);
    for adj in plan {
        ledger::append(&conn, &adj).unwrap();
    }

    let holdings = project(&ledger::query_all(&conn).unwrap());
    assert!((holdings[&key].quantity - 0.7).abs() < EPSILON);
}

#[test]
fn adjusting_to_zero_removes_the_position() {
    let conn = setup();
    seed(&conn, "dogecoin", "Bybit", TxKind::Buy, 100.0, 1);
    let key = HoldingKey::new("dogecoin", "Bybit");

    let baseline = project(&ledger::query_all(&conn).unwrap());
    for adj in reconcile::plan_adjustments(&baseline, &[(key.clone(), 0.0)], Utc::now()) {
        ledger::append(&conn, &adj).unwrap();
    }
    let holdings = project(&ledger::query_all(&conn).unwrap());
    assert!(!holdings.contains_key(&key));
}
