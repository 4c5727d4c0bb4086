// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod admin;
pub mod doctor;
pub mod exporter;
pub mod holdings;
pub mod market;
pub mod tx;
