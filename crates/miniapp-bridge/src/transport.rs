// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Transport selection: which native channel, if any, this process talks to.
//
// The embedder probes the hosting WebView exactly once (is an Android bridge
// object injected? is a WKWebView message-handler collection present?) and
// hands the result to `Transport::detect`. The decision is immutable for the
// process lifetime — a bridge injected after startup is not picked up. That
// matches the shells this SDK targets, where injection happens before any
// mini-app code runs.

use std::sync::Arc;

use serde_json::Value;

/// Android-style host: a single injected object exposing named methods that
/// take positional string arguments. Structured data is serialised to JSON
/// text before crossing this seam.
pub trait AndroidHost: Send + Sync {
    /// Whether the injected object exposes a method with this name.
    fn has_method(&self, name: &str) -> bool;

    /// Fire-and-forget positional call. Must not block and must not fail
    /// observably; the host answers (if ever) through the global event
    /// channel.
    fn call(&self, name: &str, args: &[&str]);
}

/// iOS-style host: a collection of WKWebView message handlers, each
/// accepting one structured message.
pub trait IosMessageHandlers: Send + Sync {
    /// Whether a handler with this name is registered.
    fn has_handler(&self, name: &str) -> bool;

    /// Post one structured message to the named handler. Fire-and-forget.
    fn post_message(&self, handler: &str, message: Value);
}

/// The native channel this process talks to, selected once at startup.
///
/// At most one of Android/iOS is active; `None` is the web/preview mode
/// where every send degrades to a diagnostic no-op.
#[derive(Clone)]
pub enum Transport {
    Android(Arc<dyn AndroidHost>),
    Ios(Arc<dyn IosMessageHandlers>),
    None,
}

impl Transport {
    /// Pick the active channel from the probe results. Android wins if both
    /// are somehow present.
    pub fn detect(
        android: Option<Arc<dyn AndroidHost>>,
        ios: Option<Arc<dyn IosMessageHandlers>>,
    ) -> Self {
        if let Some(host) = android {
            return Self::Android(host);
        }
        if let Some(handlers) = ios {
            return Self::Ios(handlers);
        }
        Self::None
    }

    /// Whether any native channel exists.
    pub fn is_native(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the active channel implements the named capability. Never
    /// panics; degrades to `false` when no channel is present.
    pub fn supports(&self, capability: &str) -> bool {
        match self {
            Self::Android(host) => host.has_method(capability),
            Self::Ios(handlers) => handlers.has_handler(capability),
            Self::None => false,
        }
    }

    /// Short name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Android(_) => "android",
            Self::Ios(_) => "ios",
            Self::None => "none",
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}
