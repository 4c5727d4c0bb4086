// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no transaction matches the given key")]
    NoMatch,

    /// The natural key hit more than one row. Mutating all of them is only
    /// done when the caller explicitly asks for it.
    #[error("natural key matches {count} transactions")]
    AmbiguousMatch { count: usize },
}
