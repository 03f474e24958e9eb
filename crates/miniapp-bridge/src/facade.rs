// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The public bridge facade. Assembled once, cheaply cloneable; every field
// is Arc-composed so the struct can move into closures and spawned tasks
// without lifetime friction. Capability methods are thin typed wrappers
// over the correlation engine; the facade adds no state of its own.

use std::sync::{Arc, OnceLock};

use serde_json::{Value, json};
use tracing::{debug, warn};

use miniapp_core::error::Result;
use miniapp_core::{
    BridgeConfig, BridgeError, GetContactsResponse, GetGeoResponse, GetMeResponse,
    GetPhoneResponse, InvokeRequest, MethodOutcome, NativeEvent,
};

use crate::bus::EventBus;
use crate::correlate::CorrelationEngine;
use crate::senders::Channels;
use crate::transport::Transport;

static GLOBAL: OnceLock<Bridge> = OnceLock::new();

/// The composed public object exposing all host capabilities.
#[derive(Clone)]
pub struct Bridge {
    transport: Arc<Transport>,
    bus: Arc<EventBus>,
    channels: Arc<Channels>,
    engine: CorrelationEngine,
    config: BridgeConfig,
}

impl Bridge {
    /// Build a bridge over the transport selected at startup.
    pub fn new(transport: Transport) -> Self {
        Self::with_config(transport, BridgeConfig::default())
    }

    pub fn with_config(transport: Transport, config: BridgeConfig) -> Self {
        let transport = Arc::new(transport);
        let bus = Arc::new(EventBus::new());
        let channels = Arc::new(Channels::new(transport.clone(), config.clone()));
        let engine = CorrelationEngine::new(bus.clone(), channels.clone());
        debug!(transport = transport.kind(), "bridge constructed");
        Self {
            transport,
            bus,
            channels,
            engine,
            config,
        }
    }

    /// Install the process-wide bridge. Errors on the second call; the
    /// bridge is constructed exactly once and never reconstructed.
    pub fn init_global(transport: Transport) -> Result<&'static Bridge> {
        let mut fresh = false;
        let bridge = GLOBAL.get_or_init(|| {
            fresh = true;
            Bridge::new(transport)
        });
        if fresh {
            Ok(bridge)
        } else {
            Err(BridgeError::AlreadyInitialised)
        }
    }

    /// The process-wide bridge, if `init_global` has run.
    pub fn global() -> Option<&'static Bridge> {
        GLOBAL.get()
    }

    /// Whether any native channel exists. In web/preview mode this is
    /// `false` and every capability call will hang rather than fail — check
    /// here first.
    pub fn is_supported(&self) -> bool {
        self.transport.is_native()
    }

    /// Whether the active channel implements the named capability (the
    /// `capability` module holds the vocabulary). `false` when no channel
    /// exists.
    pub fn supports(&self, name: &str) -> bool {
        self.transport.supports(name)
    }

    /// Register a permanent observer for every decoded host event,
    /// alongside (not instead of) the correlation machinery.
    pub fn sub(&self, listener: impl Fn(&NativeEvent) + Send + Sync + 'static) {
        self.bus.subscribe(listener);
    }

    /// Entry point for the WebView glue: feed one raw host event in. The
    /// event is decoded once and fanned out to all subscribers. Malformed
    /// events are dropped with a warning unless `strict_decode` is set.
    pub fn handle_host_event(&self, raw: Value) -> Result<()> {
        match NativeEvent::from_value(raw) {
            Ok(event) => {
                self.bus.dispatch(&event);
                Ok(())
            }
            Err(err) if self.config.strict_decode => Err(err),
            Err(err) => {
                warn!(%err, "dropping malformed host event");
                Ok(())
            }
        }
    }

    /// Generic invoke with a free-form data object. The typed wrappers
    /// below cover the common requests; `AllowNotifications` is reachable
    /// only through here.
    pub async fn invoke(&self, method: InvokeRequest, data: Value) -> Result<Value> {
        self.engine.invoke(method.method_name(), data).await
    }

    pub async fn get_me(&self) -> Result<GetMeResponse> {
        let payload = self.engine.invoke(InvokeRequest::GetMe.method_name(), json!({})).await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn get_phone(&self) -> Result<GetPhoneResponse> {
        let payload = self
            .engine
            .invoke(InvokeRequest::GetPhone.method_name(), json!({}))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn get_contacts(&self) -> Result<GetContactsResponse> {
        let payload = self
            .engine
            .invoke(InvokeRequest::GetContacts.method_name(), json!({}))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn get_geo(&self) -> Result<GetGeoResponse> {
        let payload = self.engine.get_geo().await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Open the host's settings screen. Resolves with the host's verbatim
    /// `success`/`failed` verdict.
    pub async fn open_settings(&self) -> Result<MethodOutcome> {
        let payload = self.engine.open_settings().await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Share a text string through the host's share sheet.
    pub async fn share(&self, text: &str) -> Result<MethodOutcome> {
        let payload = self.engine.share(text).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Key/value storage backed by the host.
    pub fn storage(&self) -> Storage {
        Storage {
            engine: self.engine.clone(),
        }
    }

    /// Number of outbound sends dropped because no channel or capability
    /// was available. Diagnostic only.
    pub fn dropped_sends(&self) -> u64 {
        self.channels.dropped_sends()
    }
}

/// Handle for the host-backed key/value store.
#[derive(Clone)]
pub struct Storage {
    engine: CorrelationEngine,
}

impl Storage {
    /// Read a key. An absent key resolves to `None`, never an error.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.engine.storage_get(key).await
    }

    /// Write a key. Resolves with acknowledgement only.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.engine.storage_set(key, value).await
    }
}
