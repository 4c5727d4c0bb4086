// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger;
use anyhow::Result;
use rusqlite::Connection;

/// Destructive full reset, gated behind an explicit flag.
pub fn reset(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    if !m.get_flag("yes") {
        println!("This deletes every transaction and cannot be undone.");
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }
    let n = ledger::truncate_all(conn)?;
    println!("Deleted {} transaction(s); the ledger is empty.", n);
    Ok(())
}
