// SPDX-License-Identifier: PMPL-1.0-or-later
//
// miniapp — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use types::*;
