// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Bridge configuration.

use serde::{Deserialize, Serialize};

/// Behavioural knobs for a bridge instance.
///
/// The defaults reproduce the behaviour expected inside a real WebView:
/// dropped sends are logged quietly and malformed host events are discarded
/// rather than surfaced, because desktop-preview environments routinely have
/// no native channel at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Log every send that was dropped because no native channel (or no
    /// matching capability) exists. Disable to silence preview noise.
    pub log_dropped_sends: bool,
    /// Reject inbound events that cannot be decoded instead of dropping
    /// them with a warning. Useful in integration tests against a host
    /// whose event shape is supposed to be well-formed.
    pub strict_decode: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_dropped_sends: true,
            strict_decode: false,
        }
    }
}
