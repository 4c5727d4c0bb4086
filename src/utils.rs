// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

const UA: &str = concat!(
    "coinclip/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/coinclip)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// A calendar date entered on the CLI becomes midnight UTC, matching how the
/// store timestamps manual entries.
pub fn date_to_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{}', expected RFC 3339", s))
}

pub fn parse_quantity(s: &str) -> Result<f64> {
    let q: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid number '{}'", s))?;
    if q < 0.0 {
        anyhow::bail!("Quantity must be non-negative, got {}", q);
    }
    Ok(q)
}

pub fn parse_amount(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid amount '{}'", s))
}

/// Timestamps are stored in UTC and shown in the operator's local zone.
pub fn fmt_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y/%m/%d %H:%M").to_string()
}

pub fn fmt_money(value: f64, symbol: &str, precision: usize) -> String {
    format!("{}{:.*}", symbol, precision, value)
}

/// Quantities print with up to 8 decimals, trailing zeros trimmed.
pub fn fmt_quantity(q: f64) -> String {
    let s = format!("{:.8}", q);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_formatting_trims_trailing_zeros() {
        assert_eq!(fmt_quantity(0.7), "0.7");
        assert_eq!(fmt_quantity(1.0), "1");
        assert_eq!(fmt_quantity(0.00000001), "0.00000001");
        assert_eq!(fmt_quantity(0.0), "0");
    }

    #[test]
    fn parse_quantity_rejects_negative() {
        assert!(parse_quantity("-1").is_err());
        assert_eq!(parse_quantity(" 0.5 ").unwrap(), 0.5);
    }

    #[test]
    fn timestamps_round_trip_rfc3339() {
        let ts = parse_timestamp("2025-06-01T09:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-06-01T09:30:00+00:00");
        assert_eq!(parse_timestamp(&ts.to_rfc3339()).unwrap(), ts);
    }
}
