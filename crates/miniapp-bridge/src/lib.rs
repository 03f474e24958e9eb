// SPDX-License-Identifier: PMPL-1.0-or-later
//
// miniapp — Native host bridge for embedded web mini-apps.
//
// Turns the shell's one-way, fire-and-forget native calls into awaitable,
// uniquely-correlated results. The embedder implements the host traits in
// `transport` (backed by the real WebView interop glue) and feeds raw host
// events into `Bridge::handle_host_event`; everything else — token minting,
// transient subscriptions, settlement — lives here.

pub mod bus;
pub mod facade;
pub mod transport;

mod correlate;
mod senders;

#[cfg(test)]
pub(crate) mod testutil;

pub use facade::{Bridge, Storage};
pub use miniapp_core::{
    BridgeConfig, BridgeError, Contact, CorrelationToken, EventResult, GetContactsResponse,
    GetGeoResponse, GetMeResponse, GetPhoneResponse, InvokeRequest, MethodOutcome, NativeEvent,
    StorageOp, capability, error::Result,
};
pub use transport::{AndroidHost, IosMessageHandlers, Transport};
