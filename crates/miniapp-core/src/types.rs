// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Core domain types for the miniapp host bridge: correlation tokens, the
// capability vocabulary shared with the native shell, typed response
// payloads, and the inbound native event decoded at the bus boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// Opaque per-call identifier used to match an asynchronous host response
/// back to its originating call.
///
/// Unique among all concurrently in-flight calls; rendered as a string when
/// crossing the native boundary and discarded once the call settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(pub Uuid);

impl CorrelationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CorrelationToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<Uuid>().map(Self)
    }
}

/// Names of the outbound channels a native shell may expose.
///
/// These are the identifiers `supports()` is queried with; each corresponds
/// to one method on the Android bridge object or one iOS message handler.
pub mod capability {
    pub const INVOKE: &str = "invoke";
    pub const STORAGE: &str = "storage";
    pub const GET_GEO: &str = "getGeo";
    pub const OPEN_SETTINGS: &str = "openSettings";
    pub const SHARE: &str = "share";

    /// All capability names, in the order the shell documents them.
    pub const ALL: [&str; 5] = [INVOKE, STORAGE, GET_GEO, OPEN_SETTINGS, SHARE];
}

/// Methods routed through the generic `invoke` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeRequest {
    GetMe,
    GetPhone,
    GetContacts,
    AllowNotifications,
}

impl InvokeRequest {
    /// Wire name passed as the `method` argument to the native shell.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::GetMe => "GetMe",
            Self::GetPhone => "GetPhone",
            Self::GetContacts => "GetContacts",
            Self::AllowNotifications => "AllowNotifications",
        }
    }
}

impl std::fmt::Display for InvokeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method_name())
    }
}

/// The two operations multiplexed over the storage channel.
///
/// The engine keeps the requested operation alongside each pending call —
/// the host's answer alone may be ambiguous between a get result and a set
/// acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageOp {
    Get,
    Set,
}

impl StorageOp {
    /// Wire name passed as the `method` argument on the storage channel.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

/// Closed result vocabulary for no-argument method calls (open-settings,
/// share). Passed through from the host verbatim, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodOutcome {
    Success,
    Failed,
}

/// Response to `GetMe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMeResponse {
    pub name: String,
    pub lastname: String,
    /// Host-side signature over the identity fields.
    pub sign: String,
}

/// Response to `GetPhone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPhoneResponse {
    pub phone: String,
    pub sign: String,
}

/// A single address-book entry in a `GetContacts` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Response to `GetContacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContactsResponse {
    pub contacts: Vec<Contact>,
    pub sign: String,
}

/// Response to a geolocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetGeoResponse {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of a host-answered call, split once at the bus boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// The success payload. For invoke-style calls this is a JSON object;
    /// for method-style calls it is the host's raw vocabulary string.
    Success(Value),
    /// The host explicitly reported a failure.
    Error(String),
}

impl EventResult {
    /// Unwrap into the crate result type, mapping host errors to
    /// [`BridgeError::Host`].
    pub fn into_payload(self) -> Result<Value> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Error(text) => Err(BridgeError::Host(text)),
        }
    }
}

/// An inbound message from the native shell, already decoded.
///
/// The shell owns the raw shape; this type is the one place it is
/// interpreted. Two success layouts occur in the wild and both decode: the
/// payload nested under a `data` field, or the payload fields flattened
/// beside `reqId`.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    pub token: CorrelationToken,
    pub result: EventResult,
}

impl NativeEvent {
    /// Decode a raw host event.
    ///
    /// Requires a string `reqId` holding a UUID. An `error` field of any
    /// shape marks a host failure; otherwise the success payload is the
    /// `data` field if present, else the remaining fields of the object.
    pub fn from_value(raw: Value) -> Result<Self> {
        let Value::Object(mut fields) = raw else {
            return Err(BridgeError::MalformedEvent(
                "event is not a JSON object".into(),
            ));
        };

        let token = match fields.remove("reqId") {
            Some(Value::String(s)) => s
                .parse::<CorrelationToken>()
                .map_err(|e| BridgeError::MalformedEvent(format!("bad reqId `{s}`: {e}")))?,
            Some(other) => {
                return Err(BridgeError::MalformedEvent(format!(
                    "reqId is not a string: {other}"
                )));
            }
            None => {
                return Err(BridgeError::MalformedEvent("missing reqId".into()));
            }
        };

        if let Some(error) = fields.remove("error") {
            let text = match error {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Ok(Self {
                token,
                result: EventResult::Error(text),
            });
        }

        let payload = match fields.remove("data") {
            Some(data) => data,
            None => Value::Object(fields),
        };

        Ok(Self {
            token,
            result: EventResult::Success(payload),
        })
    }
}
