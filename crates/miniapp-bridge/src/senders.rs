// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Channel senders: one fire-and-forget dispatch per capability family.
//
// A sender never returns a value and never errors on a missing transport —
// when no channel (or no matching capability) exists, the send is dropped
// with a diagnostic and a counter bump, and the correlation engine above
// simply never settles the call. Android delivery is positional with
// structured data serialised to JSON text; iOS delivery is one structured
// message carrying the same logical fields.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tracing::debug;

use miniapp_core::{BridgeConfig, CorrelationToken, StorageOp, capability};

use crate::transport::Transport;

/// All outbound channels, bound to the transport selected at startup.
pub(crate) struct Channels {
    transport: Arc<Transport>,
    config: BridgeConfig,
    /// Sends dropped because no channel or capability was available. The
    /// observable stand-in for the original environment's console log.
    dropped: AtomicU64,
}

impl Channels {
    pub(crate) fn new(transport: Arc<Transport>, config: BridgeConfig) -> Self {
        Self {
            transport,
            config,
            dropped: AtomicU64::new(0),
        }
    }

    /// Generic invoke: `(token, methodName, data)`.
    pub(crate) fn invoke(&self, token: CorrelationToken, method: &str, data: &Value) {
        let token_str = token.to_string();
        let encoded = data.to_string();
        self.send(
            capability::INVOKE,
            &[&token_str, method, &encoded],
            json!({ "reqId": token_str, "method": method, "data": data }),
        );
    }

    /// Storage: `(token, op, {key, value?})`.
    pub(crate) fn storage(&self, token: CorrelationToken, op: StorageOp, data: &Value) {
        let token_str = token.to_string();
        let encoded = data.to_string();
        self.send(
            capability::STORAGE,
            &[&token_str, op.wire_name(), &encoded],
            json!({ "reqId": token_str, "method": op.wire_name(), "data": data }),
        );
    }

    /// Geolocation: token only.
    pub(crate) fn get_geo(&self, token: CorrelationToken) {
        let token_str = token.to_string();
        self.send(
            capability::GET_GEO,
            &[&token_str],
            json!({ "reqId": token_str }),
        );
    }

    /// Open the host's settings screen: token only.
    pub(crate) fn open_settings(&self, token: CorrelationToken) {
        let token_str = token.to_string();
        self.send(
            capability::OPEN_SETTINGS,
            &[&token_str],
            json!({ "reqId": token_str }),
        );
    }

    /// Share a text string through the host's share sheet.
    pub(crate) fn share(&self, token: CorrelationToken, text: &str) {
        let token_str = token.to_string();
        self.send(
            capability::SHARE,
            &[&token_str, text],
            json!({ "reqId": token_str, "text": text }),
        );
    }

    /// Number of sends dropped so far.
    pub(crate) fn dropped_sends(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, capability: &'static str, android_args: &[&str], ios_message: Value) {
        match &*self.transport {
            Transport::Android(host) if host.has_method(capability) => {
                host.call(capability, android_args);
            }
            Transport::Ios(handlers) if handlers.has_handler(capability) => {
                handlers.post_message(capability, ios_message);
            }
            transport => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if self.config.log_dropped_sends {
                    debug!(
                        capability,
                        transport = transport.kind(),
                        "no native channel for capability, dropping send"
                    );
                }
            }
        }
    }
}
