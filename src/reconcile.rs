// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Turns a manual edit of the derived holdings view back into ledger events.
//! The baseline snapshot and the appended adjustments are not covered by any
//! isolation: a concurrent writer touching the same (asset, venue) between
//! the read and the append makes the adjustment over- or under-correct. That
//! is accepted for the single-user scope of this tool.

use crate::models::{EPSILON, Holding, HoldingKey, NewTransaction};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub type HoldingsMap = BTreeMap<HoldingKey, Holding>;

/// Join the baseline and the edited quantities on (asset, venue) and emit
/// exactly one zero-priced adjustment per pair whose quantities differ by
/// more than ε. Edits for keys absent from the baseline are ignored; an
/// unchanged quantity emits nothing, so re-running with equal snapshots is a
/// no-op.
pub fn plan_adjustments(
    previous: &HoldingsMap,
    edited: &[(HoldingKey, f64)],
    now: DateTime<Utc>,
) -> Vec<NewTransaction> {
    let mut out = Vec::new();
    for (key, new_quantity) in edited {
        let Some(before) = previous.get(key) else {
            continue;
        };
        let diff = new_quantity - before.quantity;
        if diff.abs() > EPSILON {
            out.push(NewTransaction::adjustment(key, &before.asset_name, diff, now));
        }
    }
    out
}

/// Session-scoped reconciliation baseline. The snapshot used for comparison
/// is loaded once per session and must be cleared after adjustments are
/// appended, so the next edit compares against freshly re-projected holdings
/// instead of the just-edited view.
#[derive(Debug, Default)]
pub struct Session {
    baseline: Option<HoldingsMap>,
}

impl Session {
    pub fn new() -> Self {
        Session { baseline: None }
    }

    /// The current baseline, loading it via `load` on first use.
    pub fn baseline_or_load<E>(
        &mut self,
        load: impl FnOnce() -> Result<HoldingsMap, E>,
    ) -> Result<&HoldingsMap, E> {
        if self.baseline.is_none() {
            self.baseline = Some(load()?);
        }
        Ok(self.baseline.as_ref().expect("baseline just set"))
    }

    /// Invalidate after appending adjustments.
    pub fn clear(&mut self) {
        self.baseline = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.baseline.is_some()
    }
}
