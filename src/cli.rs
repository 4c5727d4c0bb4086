// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Command, arg, value_parser};

pub fn build_cli() -> Command {
    Command::new("coinclip")
        .about("Multi-exchange crypto ledger, holdings projection, and valuation")
        .subcommand(Command::new("init").about("Initialize the local database"))
        .subcommand(
            Command::new("tx")
                .about("Record and manage ledger transactions")
                .subcommand(
                    Command::new("add")
                        .about("Record a buy or sell")
                        .arg(arg!(--date <DATE> "Trade date, YYYY-MM-DD"))
                        .arg(arg!(--asset <ID> "CoinGecko asset id, e.g. bitcoin"))
                        .arg(arg!(--name [NAME] "Display name (defaults from the market snapshot)"))
                        .arg(arg!(--venue <VENUE> "Exchange or account"))
                        .arg(arg!(--kind <KIND> "buy or sell"))
                        .arg(arg!(--quantity <QTY>))
                        .arg(arg!(--price <PRICE> "Unit price in JPY"))
                        .arg(arg!(--fee [FEE] "Fee in JPY")),
                )
                .subcommand(
                    Command::new("list")
                        .about("List recorded transactions, newest first")
                        .arg(arg!(--asset [ID]))
                        .arg(arg!(--venue [VENUE]))
                        .arg(arg!(--limit [N]).value_parser(value_parser!(usize)))
                        .arg(arg!(--json "Print as JSON"))
                        .arg(arg!(--jsonl "Print as JSON lines")),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Edit a transaction's quantity or venue")
                        .arg(arg!(--id [ID] "Transaction id").value_parser(value_parser!(i64)))
                        .arg(arg!(--timestamp [TS] "Legacy natural key: RFC 3339 timestamp"))
                        .arg(arg!(--asset [ID] "Legacy natural key: asset id"))
                        .arg(arg!(--venue [VENUE] "Legacy natural key: venue"))
                        .arg(arg!(--kind [KIND] "Legacy natural key: kind"))
                        .arg(arg!(--quantity [QTY] "Legacy natural key: quantity"))
                        .arg(arg!(--"set-quantity" [QTY] "New quantity"))
                        .arg(arg!(--"set-venue" [VENUE] "New venue"))
                        .arg(arg!(--all "Apply to every natural-key match")),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a transaction")
                        .arg(arg!(--id [ID] "Transaction id").value_parser(value_parser!(i64)))
                        .arg(arg!(--timestamp [TS] "Legacy natural key: RFC 3339 timestamp"))
                        .arg(arg!(--asset [ID] "Legacy natural key: asset id"))
                        .arg(arg!(--venue [VENUE] "Legacy natural key: venue"))
                        .arg(arg!(--kind [KIND] "Legacy natural key: kind"))
                        .arg(arg!(--quantity [QTY] "Legacy natural key: quantity"))
                        .arg(arg!(--all "Delete every natural-key match")),
                ),
        )
        .subcommand(
            Command::new("holdings")
                .about("Project current holdings and value them")
                .arg(arg!(--currency [CCY] "Display currency: jpy or usd").default_value("jpy"))
                .arg(arg!(--live "Refresh market data before valuing"))
                .arg(arg!(--"group-by" [GROUP] "Aggregate rows per coin or per venue"))
                .arg(arg!(--json "Print as JSON"))
                .subcommand(
                    Command::new("set")
                        .about("Set a displayed quantity; the difference is booked as an adjustment")
                        .arg(arg!(--asset <ID>))
                        .arg(arg!(--venue <VENUE>))
                        .arg(arg!(--quantity <QTY>)),
                ),
        )
        .subcommand(
            Command::new("market")
                .about("Market data")
                .subcommand(Command::new("refresh").about("Fetch prices and the USD cross-rate"))
                .subcommand(
                    Command::new("watchlist")
                        .about("Top 20 assets by market cap")
                        .arg(arg!(--currency [CCY] "jpy or usd").default_value("jpy")),
                ),
        )
        .subcommand(
            Command::new("export").about("Export data").subcommand(
                Command::new("transactions")
                    .arg(arg!(--format <FORMAT> "csv or json"))
                    .arg(arg!(--out <FILE>)),
            ),
        )
        .subcommand(Command::new("doctor").about("Check the ledger for inconsistencies"))
        .subcommand(
            Command::new("reset")
                .about("Delete every transaction (irreversible)")
                .arg(arg!(--yes "Skip the confirmation gate")),
        )
}
