// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Correlation engine: turns fire-and-forget channel sends into awaitable,
// uniquely-matched results.
//
// Per call: mint a token, register a transient bus subscriber filtered to
// that token, invoke the sender, await a oneshot. The first matching event
// settles the call and removes the subscriber; a duplicate event with the
// same token is unobserved only because the subscriber is gone — there is no
// separate idempotence guard. The host is trusted never to reuse a token and
// never to drop a response; if the sender was a no-op (no transport), the
// call simply never settles.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::trace;

use miniapp_core::error::Result;
use miniapp_core::{BridgeError, CorrelationToken, EventResult, NativeEvent, StorageOp};

use crate::bus::EventBus;
use crate::senders::Channels;

/// Engine shared by the facade and its storage handle. Cheap to clone.
#[derive(Clone)]
pub(crate) struct CorrelationEngine {
    bus: Arc<EventBus>,
    channels: Arc<Channels>,
}

impl CorrelationEngine {
    pub(crate) fn new(bus: Arc<EventBus>, channels: Arc<Channels>) -> Self {
        Self { bus, channels }
    }

    /// Single-shot request/reply over the generic invoke channel.
    pub(crate) async fn invoke(&self, method: &str, data: Value) -> Result<Value> {
        self.round_trip(|channels, token| channels.invoke(token, method, &data))
            .await
    }

    /// Storage read. The operation kind lives here, not in the event: the
    /// host's answer alone may be ambiguous between get and set results.
    pub(crate) async fn storage_get(&self, key: &str) -> Result<Option<String>> {
        let payload = self
            .round_trip(|channels, token| {
                channels.storage(token, StorageOp::Get, &json!({ "key": key }))
            })
            .await?;
        stored_value(payload)
    }

    /// Storage write. Resolves with acknowledgement only.
    pub(crate) async fn storage_set(&self, key: &str, value: &str) -> Result<()> {
        self.round_trip(|channels, token| {
            channels.storage(token, StorageOp::Set, &json!({ "key": key, "value": value }))
        })
        .await?;
        Ok(())
    }

    /// Geolocation request: token-only send, structured payload back.
    pub(crate) async fn get_geo(&self) -> Result<Value> {
        self.round_trip(|channels, token| channels.get_geo(token))
            .await
    }

    /// Open the host settings screen. The payload is the host's closed
    /// `success`/`failed` vocabulary, passed through verbatim.
    pub(crate) async fn open_settings(&self) -> Result<Value> {
        self.round_trip(|channels, token| channels.open_settings(token))
            .await
    }

    /// Share a text string. Same vocabulary as open-settings.
    pub(crate) async fn share(&self, text: &str) -> Result<Value> {
        self.round_trip(|channels, token| channels.share(token, text))
            .await
    }

    /// The core primitive: register a transient subscriber for a fresh
    /// token, fire the sender, await the first matching event.
    ///
    /// Registration happens strictly before the send so a host that answers
    /// synchronously cannot race the subscription. The transient subscriber
    /// holds the bus weakly — the bus owns the subscriber, and a strong
    /// reference back would keep both alive forever.
    async fn round_trip(&self, send: impl FnOnce(&Channels, CorrelationToken)) -> Result<Value> {
        let token = CorrelationToken::new();
        let (tx, rx) = oneshot::channel::<EventResult>();

        // Take-once slot: the first matching event claims the sender, every
        // later delivery (which correct hosts never produce) finds it empty.
        let slot = Arc::new(Mutex::new(Some(tx)));
        let id_cell = Arc::new(OnceLock::new());
        let bus: Weak<EventBus> = Arc::downgrade(&self.bus);

        let listener = {
            let slot = slot.clone();
            let id_cell = id_cell.clone();
            move |event: &NativeEvent| {
                if event.token != token {
                    return;
                }
                let claimed = slot
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .take();
                if let Some(tx) = claimed {
                    // The receiver is only dropped if the caller's future
                    // was dropped; nothing to settle then.
                    let _ = tx.send(event.result.clone());
                }
                if let (Some(bus), Some(id)) = (bus.upgrade(), id_cell.get()) {
                    bus.unsubscribe(*id);
                }
            }
        };

        let id = self.bus.subscribe_keyed(Arc::new(listener));
        // Set before any dispatch can run this listener: the send below is
        // the first point the host learns the token.
        let _ = id_cell.set(id);

        trace!(%token, "call in flight");
        send(&self.channels, token);

        match rx.await {
            Ok(result) => result.into_payload(),
            Err(_) => Err(BridgeError::ChannelClosed),
        }
    }
}

/// Interpret a storage-get payload. Hosts answer with a bare string, a JSON
/// null, an empty object, or `{value: ...}`; all map onto `Option<String>`.
/// An absent key is `None`, never an error.
fn stored_value(payload: Value) -> Result<Option<String>> {
    match payload {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Object(mut fields) => match fields.remove("value") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(BridgeError::MalformedEvent(format!(
                "storage value is not a string: {other}"
            ))),
        },
        other => Err(BridgeError::MalformedEvent(format!(
            "unexpected storage payload: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeAndroidHost, android_token};
    use crate::transport::Transport;
    use miniapp_core::{BridgeConfig, capability};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    const PENDING_WINDOW: Duration = Duration::from_millis(50);

    fn engine_with(host: Arc<FakeAndroidHost>) -> CorrelationEngine {
        let transport = Arc::new(Transport::Android(host));
        let channels = Arc::new(Channels::new(transport, BridgeConfig::default()));
        CorrelationEngine::new(Arc::new(EventBus::new()), channels)
    }

    fn success(token: CorrelationToken, payload: Value) -> NativeEvent {
        NativeEvent {
            token,
            result: EventResult::Success(payload),
        }
    }

    #[tokio::test]
    async fn resolves_on_matching_event() {
        let host = FakeAndroidHost::supporting(&[capability::INVOKE]);
        let engine = engine_with(host.clone());

        let call = tokio::spawn({
            let engine = engine.clone();
            async move { engine.invoke("GetMe", json!({})).await }
        });
        let token = android_token(&host, 0).await;

        engine.bus.dispatch(&success(token, json!({"name": "Ada"})));

        let payload = call.await.expect("join").expect("resolve");
        assert_eq!(payload, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn host_error_rejects() {
        let host = FakeAndroidHost::supporting(&[capability::INVOKE]);
        let engine = engine_with(host.clone());

        let call = tokio::spawn({
            let engine = engine.clone();
            async move { engine.invoke("GetPhone", json!({})).await }
        });
        let token = android_token(&host, 0).await;

        engine.bus.dispatch(&NativeEvent {
            token,
            result: EventResult::Error("user denied".into()),
        });

        let err = call.await.expect("join").unwrap_err();
        assert!(matches!(err, BridgeError::Host(msg) if msg == "user denied"));
    }

    #[tokio::test]
    async fn settles_exactly_once_and_removes_subscriber() {
        let host = FakeAndroidHost::supporting(&[capability::INVOKE]);
        let engine = engine_with(host.clone());
        assert_eq!(engine.bus.subscriber_count(), 0);

        let call = tokio::spawn({
            let engine = engine.clone();
            async move { engine.invoke("GetMe", json!({})).await }
        });
        let token = android_token(&host, 0).await;
        assert_eq!(engine.bus.subscriber_count(), 1);

        let event = success(token, json!({"name": "Ada"}));
        engine.bus.dispatch(&event);
        // Redelivery of the same event: unobserved, because the transient
        // subscriber is already gone.
        engine.bus.dispatch(&event);

        assert!(call.await.expect("join").is_ok());
        assert_eq!(engine.bus.subscriber_count(), 0, "transient subscriber leaked");
    }

    #[tokio::test]
    async fn concurrent_calls_never_cross_settle() {
        let host = FakeAndroidHost::supporting(&[capability::INVOKE]);
        let engine = engine_with(host.clone());

        let call_a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.invoke("GetMe", json!({})).await }
        });
        let token_a = android_token(&host, 0).await;

        let call_b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.invoke("GetPhone", json!({})).await }
        });
        let token_b = android_token(&host, 1).await;
        assert_ne!(token_a, token_b);

        // Answer B only.
        engine
            .bus
            .dispatch(&success(token_b, json!({"phone": "+7"})));

        let b = call_b.await.expect("join").expect("B resolves");
        assert_eq!(b, json!({"phone": "+7"}));

        // A must still be pending.
        let still_pending = timeout(PENDING_WINDOW, call_a).await;
        assert!(still_pending.is_err(), "A settled without its own event");
        assert_eq!(engine.bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn storage_get_maps_absent_to_none() {
        let host = FakeAndroidHost::supporting(&[capability::STORAGE]);
        let engine = engine_with(host.clone());

        let call = tokio::spawn({
            let engine = engine.clone();
            async move { engine.storage_get("missing").await }
        });
        let token = android_token(&host, 0).await;

        // Host answers a get for an unknown key with no value at all.
        engine.bus.dispatch(&success(token, json!({})));

        assert_eq!(call.await.expect("join").expect("resolve"), None);
    }

    #[tokio::test]
    async fn storage_set_resolves_with_acknowledgement() {
        let host = FakeAndroidHost::supporting(&[capability::STORAGE]);
        let engine = engine_with(host.clone());

        let call = tokio::spawn({
            let engine = engine.clone();
            async move { engine.storage_set("k", "v").await }
        });
        let token = android_token(&host, 0).await;

        engine.bus.dispatch(&success(token, json!({})));

        call.await.expect("join").expect("acknowledged");
        let calls = host.calls();
        assert_eq!(calls[0].1[1], "set");
        let data: Value = serde_json::from_str(&calls[0].1[2]).expect("json");
        assert_eq!(data, json!({"key": "k", "value": "v"}));
    }

    #[tokio::test]
    async fn no_transport_call_hangs_silently() {
        // Web/preview mode: the sender is a no-op and the call never
        // settles. No timeout is added on purpose.
        let transport = Arc::new(Transport::None);
        let channels = Arc::new(Channels::new(transport, BridgeConfig::default()));
        let engine = CorrelationEngine::new(Arc::new(EventBus::new()), channels);

        let pending = engine.invoke("GetMe", json!({}));
        assert!(timeout(PENDING_WINDOW, pending).await.is_err());
    }

    #[test]
    fn stored_value_shapes() {
        assert_eq!(stored_value(json!(null)).expect("null"), None);
        assert_eq!(stored_value(json!("v")).expect("bare"), Some("v".into()));
        assert_eq!(
            stored_value(json!({"value": "v"})).expect("wrapped"),
            Some("v".into())
        );
        assert_eq!(stored_value(json!({"value": null})).expect("null value"), None);
        assert!(stored_value(json!(42)).is_err());
        assert!(stored_value(json!({"value": 42})).is_err());
    }
}
