// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Unified error types for the miniapp bridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
///
/// A call whose channel sender was a no-op (no native transport) does not
/// produce an error at all — its future simply never settles. Errors here
/// cover the cases where a response *did* arrive but could not be honoured,
/// plus bridge lifecycle misuse.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host answered the call with an explicit error payload.
    #[error("host reported failure: {0}")]
    Host(String),

    /// The host's success payload did not fit the declared response type.
    #[error("failed to decode host payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// An inbound event could not be interpreted at the bus boundary.
    #[error("malformed native event: {0}")]
    MalformedEvent(String),

    /// The bridge was dropped while a call was still in flight.
    #[error("event channel closed before a response arrived")]
    ChannelClosed,

    /// `Bridge::init_global` was called a second time.
    #[error("bridge already initialised for this process")]
    AlreadyInitialised,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
