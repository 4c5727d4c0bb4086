// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Projection of the transaction log into current holdings, and valuation of
//! those holdings against a market snapshot. Everything here is a pure
//! function of its inputs; the full log is replayed on every call.

use crate::models::{EPSILON, Holding, HoldingKey, Transaction};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Current price and absolute 24h change for one asset, in the reference
/// currency. Assets missing from the view value at zero rather than erroring.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketQuote {
    pub price: f64,
    pub change_24h: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MarketView {
    pub quotes: HashMap<String, MarketQuote>,
    pub names: HashMap<String, String>,
}

impl MarketView {
    pub fn quote(&self, asset_id: &str) -> MarketQuote {
        self.quotes.get(asset_id).copied().unwrap_or_default()
    }

    pub fn display_name<'a>(&'a self, asset_id: &'a str) -> &'a str {
        self.names.get(asset_id).map(String::as_str).unwrap_or(asset_id)
    }
}

/// Fold the full log into net positions keyed by (asset, venue). Additive
/// kinds minus subtractive kinds; positions at or below ε disappear instead
/// of lingering as zero rows. Order-independent by construction.
pub fn project(transactions: &[Transaction]) -> BTreeMap<HoldingKey, Holding> {
    let mut nets: BTreeMap<HoldingKey, (String, f64)> = BTreeMap::new();
    for tx in transactions {
        let key = HoldingKey::new(&tx.asset_id, &tx.venue);
        let entry = nets.entry(key).or_insert_with(|| (tx.asset_name.clone(), 0.0));
        if tx.kind.is_additive() {
            entry.1 += tx.quantity;
        } else {
            entry.1 -= tx.quantity;
        }
    }

    nets.into_iter()
        .filter(|(_, (_, qty))| *qty > EPSILON)
        .map(|(key, (asset_name, quantity))| {
            let holding = Holding {
                key: key.clone(),
                asset_name,
                quantity,
            };
            (key, holding)
        })
        .collect()
}

/// One valued position row, reference currency.
#[derive(Debug, Clone, Serialize)]
pub struct PositionValue {
    pub asset_id: String,
    pub asset_name: String,
    pub venue: String,
    pub quantity: f64,
    pub price: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortfolioValuation {
    /// Sorted by value, descending.
    pub positions: Vec<PositionValue>,
    pub total_value: f64,
    pub total_change_24h: f64,
}

pub fn value_portfolio(
    holdings: &BTreeMap<HoldingKey, Holding>,
    market: &MarketView,
) -> PortfolioValuation {
    let mut out = PortfolioValuation::default();
    for holding in holdings.values() {
        let quote = market.quote(&holding.key.asset_id);
        let value = holding.quantity * quote.price;
        out.total_value += value;
        out.total_change_24h += holding.quantity * quote.change_24h;
        out.positions.push(PositionValue {
            asset_id: holding.key.asset_id.clone(),
            asset_name: holding.asset_name.clone(),
            venue: holding.key.venue.clone(),
            quantity: holding.quantity,
            price: quote.price,
            value,
        });
    }
    out.positions
        .sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Per-coin rollup of the valuation: one row per asset, quantity and value
/// summed across venues.
#[derive(Debug, Clone, Serialize)]
pub struct AssetGroup {
    pub asset_id: String,
    pub asset_name: String,
    pub quantity: f64,
    pub value: f64,
    pub share_pct: f64,
}

/// Per-venue rollup: one row per venue, value summed across assets. Quantities
/// of different coins don't add, so none is carried.
#[derive(Debug, Clone, Serialize)]
pub struct VenueGroup {
    pub venue: String,
    pub value: f64,
    pub share_pct: f64,
}

fn share_of(value: f64, total: f64) -> f64 {
    if total > 0.0 { value / total * 100.0 } else { 0.0 }
}

pub fn group_by_asset(valuation: &PortfolioValuation) -> Vec<AssetGroup> {
    let mut acc: BTreeMap<String, AssetGroup> = BTreeMap::new();
    for p in &valuation.positions {
        let g = acc.entry(p.asset_id.clone()).or_insert_with(|| AssetGroup {
            asset_id: p.asset_id.clone(),
            asset_name: p.asset_name.clone(),
            quantity: 0.0,
            value: 0.0,
            share_pct: 0.0,
        });
        g.quantity += p.quantity;
        g.value += p.value;
    }
    let mut out: Vec<AssetGroup> = acc
        .into_values()
        .map(|mut g| {
            g.share_pct = share_of(g.value, valuation.total_value);
            g
        })
        .collect();
    out.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    out
}

pub fn group_by_venue(valuation: &PortfolioValuation) -> Vec<VenueGroup> {
    let mut acc: BTreeMap<String, f64> = BTreeMap::new();
    for p in &valuation.positions {
        *acc.entry(p.venue.clone()).or_insert(0.0) += p.value;
    }
    let mut out: Vec<VenueGroup> = acc
        .into_iter()
        .map(|(venue, value)| VenueGroup {
            venue,
            value,
            share_pct: share_of(value, valuation.total_value),
        })
        .collect();
    out.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// 24h movement in a display currency.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FiatDelta {
    pub display_change: f64,
    pub change_pct: f64,
}

pub fn fiat_delta(total_value: f64, total_change_24h: f64, rate: f64) -> FiatDelta {
    let yesterday_total = total_value - total_change_24h;
    let change_pct = if yesterday_total > 0.0 {
        total_change_24h / yesterday_total * 100.0
    } else {
        0.0
    };
    FiatDelta {
        display_change: total_change_24h * rate,
        change_pct,
    }
}

/// Total value expressed in units of the numeraire asset.
pub fn numeraire_value(total_value: f64, numeraire_price: f64) -> f64 {
    if numeraire_price > 0.0 {
        total_value / numeraire_price
    } else {
        0.0
    }
}

/// 24h movement denominated in the numeraire asset. `None` means "not
/// computable" (yesterday's numeraire price or portfolio total is not
/// positive), which callers must keep distinct from a zero change.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NumeraireDelta {
    pub units_today: f64,
    pub change_units: f64,
    pub change_pct: f64,
}

pub fn numeraire_delta(
    total_value: f64,
    total_change_24h: f64,
    numeraire: MarketQuote,
) -> Option<NumeraireDelta> {
    if numeraire.price <= 0.0 {
        return None;
    }
    let units_today = numeraire_value(total_value, numeraire.price);
    let yesterday_total = total_value - total_change_24h;
    let numeraire_yesterday = numeraire.price - numeraire.change_24h;
    if numeraire_yesterday <= 0.0 || yesterday_total <= 0.0 {
        return None;
    }
    let units_yesterday = yesterday_total / numeraire_yesterday;
    let change_units = units_today - units_yesterday;
    let change_pct = if units_yesterday > 0.0 {
        change_units / units_yesterday * 100.0
    } else {
        0.0
    };
    Some(NumeraireDelta {
        units_today,
        change_units,
        change_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTransaction, TxKind};
    use chrono::{TimeZone, Utc};

    fn tx(
        id: i64,
        asset: &str,
        venue: &str,
        kind: TxKind,
        quantity: f64,
    ) -> Transaction {
        Transaction {
            id,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            asset_id: asset.to_string(),
            asset_name: asset.to_string(),
            venue: venue.to_string(),
            kind,
            quantity,
            unit_price: 0.0,
            fee: 0.0,
            total: 0.0,
        }
    }

    fn market(entries: &[(&str, f64, f64)]) -> MarketView {
        let mut view = MarketView::default();
        for (id, price, change) in entries {
            view.quotes.insert(
                id.to_string(),
                MarketQuote {
                    price: *price,
                    change_24h: *change,
                },
            );
            view.names.insert(id.to_string(), id.to_string());
        }
        view
    }

    #[test]
    fn projection_nets_buys_against_sells_per_key() {
        // Buy 1.0, sell 0.3 at the same venue -> 0.7 held.
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "Binance", TxKind::Sell, 0.3),
        ];
        let holdings = project(&txs);
        assert_eq!(holdings.len(), 1);
        let h = &holdings[&HoldingKey::new("bitcoin", "Binance")];
        assert!((h.quantity - 0.7).abs() < EPSILON);
    }

    #[test]
    fn projection_is_order_independent() {
        let mut txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "Binance", TxKind::Sell, 0.3),
            tx(3, "ethereum", "bitbank", TxKind::AdjustIncrease, 2.0),
        ];
        let forward = project(&txs);
        txs.reverse();
        let backward = project(&txs);
        assert_eq!(forward.len(), backward.len());
        for (key, h) in &forward {
            assert!((backward[key].quantity - h.quantity).abs() < EPSILON);
        }
    }

    #[test]
    fn projection_separates_venues_for_the_same_asset() {
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "bitbank", TxKind::Buy, 2.0),
        ];
        let holdings = project(&txs);
        assert_eq!(holdings.len(), 2);
        assert!((holdings[&HoldingKey::new("bitcoin", "Binance")].quantity - 1.0).abs() < EPSILON);
        assert!((holdings[&HoldingKey::new("bitcoin", "bitbank")].quantity - 2.0).abs() < EPSILON);
    }

    #[test]
    fn fully_exited_positions_drop_out_of_the_projection() {
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "Binance", TxKind::Sell, 1.0),
            // float noise below epsilon must not resurrect the row
            tx(3, "ethereum", "Binance", TxKind::Buy, 5e-10),
        ];
        assert!(project(&txs).is_empty());
    }

    #[test]
    fn projection_handles_empty_log() {
        assert!(project(&[]).is_empty());
    }

    #[test]
    fn adjustments_count_with_their_polarity() {
        let txs = vec![
            tx(1, "xrp", "BITPOINT", TxKind::AdjustIncrease, 10.0),
            tx(2, "xrp", "BITPOINT", TxKind::AdjustDecrease, 4.0),
        ];
        let holdings = project(&txs);
        let h = &holdings[&HoldingKey::new("xrp", "BITPOINT")];
        assert!((h.quantity - 6.0).abs() < EPSILON);
    }

    #[test]
    fn valuation_is_linear_in_quantity_and_price() {
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 2.0),
            tx(2, "ethereum", "bitbank", TxKind::Buy, 10.0),
        ];
        let holdings = project(&txs);
        let view = market(&[("bitcoin", 100.0, 10.0), ("ethereum", 7.0, -1.0)]);
        let valuation = value_portfolio(&holdings, &view);
        assert!((valuation.total_value - (2.0 * 100.0 + 10.0 * 7.0)).abs() < 1e-6);
        assert!((valuation.total_change_24h - (2.0 * 10.0 + 10.0 * -1.0)).abs() < 1e-6);
        // biggest position first
        assert_eq!(valuation.positions[0].asset_id, "bitcoin");
    }

    #[test]
    fn missing_price_values_at_zero_but_position_still_projects() {
        let txs = vec![tx(1, "obscurecoin", "Bybit", TxKind::Buy, 3.0)];
        let holdings = project(&txs);
        assert_eq!(holdings.len(), 1);

        let view = market(&[("bitcoin", 100.0, 1.0)]);
        let valuation = value_portfolio(&holdings, &view);
        assert_eq!(valuation.positions.len(), 1);
        assert_eq!(valuation.positions[0].value, 0.0);
        assert_eq!(valuation.total_value, 0.0);
        assert_eq!(valuation.total_change_24h, 0.0);
    }

    #[test]
    fn coin_grouping_sums_quantities_and_values_across_venues() {
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "bitbank", TxKind::Buy, 2.0),
            tx(3, "ethereum", "Binance", TxKind::Buy, 10.0),
        ];
        let view = market(&[("bitcoin", 100.0, 0.0), ("ethereum", 10.0, 0.0)]);
        let valuation = value_portfolio(&project(&txs), &view);

        let groups = group_by_asset(&valuation);
        assert_eq!(groups.len(), 2);
        // bitcoin: 3.0 across two venues, worth 300 of the 400 total
        assert_eq!(groups[0].asset_id, "bitcoin");
        assert!((groups[0].quantity - 3.0).abs() < EPSILON);
        assert!((groups[0].value - 300.0).abs() < 1e-6);
        assert!((groups[0].share_pct - 75.0).abs() < 1e-6);
        assert!((groups[1].share_pct - 25.0).abs() < 1e-6);
    }

    #[test]
    fn venue_grouping_sums_values_across_assets() {
        let txs = vec![
            tx(1, "bitcoin", "Binance", TxKind::Buy, 1.0),
            tx(2, "bitcoin", "bitbank", TxKind::Buy, 2.0),
            tx(3, "ethereum", "Binance", TxKind::Buy, 10.0),
        ];
        let view = market(&[("bitcoin", 100.0, 0.0), ("ethereum", 10.0, 0.0)]);
        let valuation = value_portfolio(&project(&txs), &view);

        let groups = group_by_venue(&valuation);
        assert_eq!(groups.len(), 2);
        let binance = groups.iter().find(|g| g.venue == "Binance").unwrap();
        let bitbank = groups.iter().find(|g| g.venue == "bitbank").unwrap();
        assert!((binance.value - 200.0).abs() < 1e-6);
        assert!((bitbank.value - 200.0).abs() < 1e-6);
        assert!((binance.share_pct - 50.0).abs() < 1e-6);
    }

    #[test]
    fn grouping_shares_are_zero_for_an_unpriced_portfolio() {
        let txs = vec![tx(1, "obscurecoin", "Bybit", TxKind::Buy, 3.0)];
        let valuation = value_portfolio(&project(&txs), &MarketView::default());
        assert_eq!(group_by_asset(&valuation)[0].share_pct, 0.0);
        assert_eq!(group_by_venue(&valuation)[0].share_pct, 0.0);
    }

    #[test]
    fn fiat_delta_converts_with_the_cross_rate() {
        let d = fiat_delta(1100.0, 100.0, 0.007);
        assert!((d.display_change - 0.7).abs() < 1e-9);
        assert!((d.change_pct - 10.0).abs() < 1e-9);

        // identity rate leaves the change untouched
        let id = fiat_delta(1100.0, 100.0, 1.0);
        assert!((id.display_change - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fiat_delta_pct_is_zero_when_yesterday_not_positive() {
        let d = fiat_delta(100.0, 100.0, 1.0);
        assert_eq!(d.change_pct, 0.0);
        let d2 = fiat_delta(50.0, 100.0, 1.0);
        assert_eq!(d2.change_pct, 0.0);
    }

    #[test]
    fn numeraire_delta_reconstructs_yesterday() {
        // BTC today 100, +10 over 24h (yesterday 90). Portfolio yesterday 900
        // in fiat -> 10 BTC. Today 950 fiat -> 9.5 BTC: a -0.5 BTC / -5% move
        // even though fiat value rose.
        let quote = MarketQuote {
            price: 100.0,
            change_24h: 10.0,
        };
        let d = numeraire_delta(950.0, 50.0, quote).unwrap();
        assert!((d.units_today - 9.5).abs() < 1e-9);
        assert!((d.change_units + 0.5).abs() < 1e-9);
        assert!((d.change_pct + 5.0).abs() < 1e-9);
    }

    #[test]
    fn numeraire_delta_is_undefined_when_guards_fail() {
        // yesterday's BTC price would be zero
        let flat = MarketQuote {
            price: 100.0,
            change_24h: 100.0,
        };
        assert!(numeraire_delta(950.0, 50.0, flat).is_none());
        // no BTC quote at all
        assert!(numeraire_delta(950.0, 50.0, MarketQuote::default()).is_none());
        // empty portfolio yesterday
        let quote = MarketQuote {
            price: 100.0,
            change_24h: 10.0,
        };
        assert!(numeraire_delta(50.0, 50.0, quote).is_none());
    }

    #[test]
    fn numeraire_value_guards_division() {
        assert_eq!(numeraire_value(1000.0, 0.0), 0.0);
        assert!((numeraire_value(1000.0, 100.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn adjustment_round_trip_restores_quantity() {
        let key = HoldingKey::new("solana", "GMO Coin");
        let now = Utc::now();
        let up = NewTransaction::adjustment(&key, "Solana", 1.23456789, now);
        let down = NewTransaction::adjustment(&key, "Solana", -1.23456789, now);
        let as_tx = |n: NewTransaction, id| Transaction {
            id,
            timestamp: n.timestamp,
            asset_id: n.asset_id,
            asset_name: n.asset_name,
            venue: n.venue,
            kind: n.kind,
            quantity: n.quantity,
            unit_price: n.unit_price,
            fee: n.fee,
            total: n.total,
        };
        let txs = vec![
            tx(1, "solana", "GMO Coin", TxKind::Buy, 4.0),
            as_tx(up, 2),
            as_tx(down, 3),
        ];
        let holdings = project(&txs);
        let h = &holdings[&key];
        assert!((h.quantity - 4.0).abs() < EPSILON);
    }
}
