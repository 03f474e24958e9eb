// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fake host transports for tests, implemented at the same trait seam the
// real WebView glue uses. They record every outbound call so tests can
// observe tokens and argument shapes, then answer by dispatching synthetic
// events back through the bridge.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use miniapp_core::CorrelationToken;

use crate::transport::{AndroidHost, IosMessageHandlers};

/// Recording Android bridge object with a fixed method set.
pub(crate) struct FakeAndroidHost {
    methods: Vec<&'static str>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeAndroidHost {
    pub(crate) fn supporting(methods: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            methods: methods.to_vec(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every `(method, args)` pair received so far.
    pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AndroidHost for FakeAndroidHost {
    fn has_method(&self, name: &str) -> bool {
        self.methods.contains(&name)
    }

    fn call(&self, name: &str, args: &[&str]) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), args.iter().map(|a| a.to_string()).collect()));
    }
}

/// Recording iOS message-handler collection with a fixed handler set.
pub(crate) struct FakeIosHandlers {
    handlers: Vec<&'static str>,
    posted: Mutex<Vec<(String, Value)>>,
}

impl FakeIosHandlers {
    pub(crate) fn supporting(handlers: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            handlers: handlers.to_vec(),
            posted: Mutex::new(Vec::new()),
        })
    }

    /// Every `(handler, message)` pair posted so far.
    pub(crate) fn posted(&self) -> Vec<(String, Value)> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IosMessageHandlers for FakeIosHandlers {
    fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains(&name)
    }

    fn post_message(&self, handler: &str, message: Value) {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handler.to_string(), message));
    }
}

/// Opt-in log output while debugging tests: `RUST_LOG=trace cargo test`.
pub(crate) fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Yield until the fake Android host has seen call `idx`, then return the
/// correlation token that call carried (always the first positional arg).
pub(crate) async fn android_token(host: &FakeAndroidHost, idx: usize) -> CorrelationToken {
    loop {
        let calls = host.calls();
        if let Some((_, args)) = calls.get(idx) {
            return args[0].parse().expect("call carries a token");
        }
        tokio::task::yield_now().await;
    }
}

/// Same for the fake iOS handlers: token from the posted message's `reqId`.
pub(crate) async fn ios_token(handlers: &FakeIosHandlers, idx: usize) -> CorrelationToken {
    loop {
        let posted = handlers.posted();
        if let Some((_, message)) = posted.get(idx) {
            let req_id = message["reqId"].as_str().expect("message carries reqId");
            return req_id.parse().expect("reqId is a token");
        }
        tokio::task::yield_now().await;
    }
}
