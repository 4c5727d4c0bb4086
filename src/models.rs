// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quantities below this are treated as zero. The ledger stores FLOAT64-style
/// values, so projected positions can carry sub-nano noise after a full exit.
pub const EPSILON: f64 = 1e-9;

/// All monetary fields on a transaction are denominated in this currency.
pub const REFERENCE_CURRENCY: &str = "jpy";

/// Asset whose dual-currency quote anchors the display cross-rate and the
/// asset-native ("in BTC") valuation.
pub const NUMERAIRE_ASSET: &str = "bitcoin";

/// Display order for venues in forms and tables. Venues on transactions are
/// free-form strings and are not validated against this list.
pub const KNOWN_VENUES: [&str; 6] = [
    "SBIVC", "BITPOINT", "Binance", "bitbank", "GMO Coin", "Bybit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Buy,
    Sell,
    AdjustIncrease,
    AdjustDecrease,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Buy => "buy",
            TxKind::Sell => "sell",
            TxKind::AdjustIncrease => "adjust_increase",
            TxKind::AdjustDecrease => "adjust_decrease",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(TxKind::Buy),
            "sell" => Ok(TxKind::Sell),
            "adjust_increase" => Ok(TxKind::AdjustIncrease),
            "adjust_decrease" => Ok(TxKind::AdjustDecrease),
            other => Err(anyhow!("Unknown transaction kind '{}'", other)),
        }
    }

    /// Whether this kind adds to the projected quantity. Sign lives here, never
    /// on the quantity itself.
    pub fn is_additive(&self) -> bool {
        matches!(self, TxKind::Buy | TxKind::AdjustIncrease)
    }

    pub fn is_adjustment(&self) -> bool {
        matches!(self, TxKind::AdjustIncrease | TxKind::AdjustDecrease)
    }
}

/// One recorded asset-movement event. `id` is the surrogate key issued by the
/// store at creation and is the primary handle for edits and deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub asset_name: String,
    pub venue: String,
    pub kind: TxKind,
    pub quantity: f64,
    pub unit_price: f64,
    pub fee: f64,
    pub total: f64,
}

/// A transaction as submitted, before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub asset_name: String,
    pub venue: String,
    pub kind: TxKind,
    pub quantity: f64,
    pub unit_price: f64,
    pub fee: f64,
    pub total: f64,
}

impl NewTransaction {
    /// A synthetic ledger event reconciling a manual edit of a derived
    /// quantity. Adjustments carry no price information.
    pub fn adjustment(
        key: &HoldingKey,
        asset_name: &str,
        diff: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let kind = if diff > 0.0 {
            TxKind::AdjustIncrease
        } else {
            TxKind::AdjustDecrease
        };
        NewTransaction {
            timestamp: now,
            asset_id: key.asset_id.clone(),
            asset_name: asset_name.to_string(),
            venue: key.venue.clone(),
            kind,
            quantity: diff.abs(),
            unit_price: 0.0,
            fee: 0.0,
            total: 0.0,
        }
    }
}

/// The natural key of a holdings row: one position per asset per venue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldingKey {
    pub asset_id: String,
    pub venue: String,
}

impl HoldingKey {
    pub fn new(asset_id: &str, venue: &str) -> Self {
        HoldingKey {
            asset_id: asset_id.to_string(),
            venue: venue.to_string(),
        }
    }
}

/// A projected position. Derived from the full transaction log, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub key: HoldingKey,
    pub asset_name: String,
    pub quantity: f64,
}

/// Composite business key for legacy records that predate surrogate ids.
/// Two distinct transactions can collide on this tuple; the gateway refuses to
/// mutate through it unless the caller opts in.
#[derive(Debug, Clone)]
pub struct NaturalKey {
    pub timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub venue: String,
    pub kind: TxKind,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCurrency {
    Jpy,
    Usd,
}

impl DisplayCurrency {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpy" => Ok(DisplayCurrency::Jpy),
            "usd" => Ok(DisplayCurrency::Usd),
            other => Err(anyhow!("Unsupported display currency '{}'", other)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DisplayCurrency::Jpy => "jpy",
            DisplayCurrency::Usd => "usd",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DisplayCurrency::Jpy => "¥",
            DisplayCurrency::Usd => "$",
        }
    }

    /// Price precision mirrors the source data: JPY quotes need sub-yen
    /// digits for small-cap coins, USD two cents.
    pub fn price_precision(&self) -> usize {
        match self {
            DisplayCurrency::Jpy => 4,
            DisplayCurrency::Usd => 2,
        }
    }
}
