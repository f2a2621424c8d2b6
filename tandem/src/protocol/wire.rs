// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The four wire shapes: request, response, object, and message.
//!
//! Requests and responses overlap structurally, so parsing is strict:
//! unknown keys are rejected on both shapes, which is what keeps the two
//! arms of [`WireObject`] disjoint. Ids follow the omit-vs-null discipline
//! of [`RequestId`]: an absent field is `Undefined`, an explicit `null` is
//! `Null`, and the two are never conflated.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::protocol::error::RpcError;
use crate::protocol::id::RequestId;

/// The only protocol version this crate speaks.
pub const VERSION: &str = "2.0";

/// A Request object as specified by JSON-RPC 2.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireRequest {
    /// If true, the id is `Undefined` and the request elicits no response.
    pub notification: bool,
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

impl WireRequest {
    /// A request that expects exactly one response.
    pub fn call(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            notification: false,
            id,
            method: method.into(),
            params,
        }
    }

    /// A request that elicits no response.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            notification: true,
            id: RequestId::Undefined,
            method: method.into(),
            params,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default, deserialize_with = "defined_id")]
    id: Option<RequestId>,
}

/// Field-present deserializer: maps JSON `null` to `Some(Null)` instead of
/// the `Option` default of `None`, so absence stays distinguishable.
fn defined_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RequestId>, D::Error> {
    RequestId::deserialize(d).map(Some)
}

/// Same trick for `result`: `"result": null` is a set result, not an absent one.
fn defined_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl<'de> Deserialize<'de> for WireRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRequest::deserialize(deserializer)?;
        if raw.jsonrpc != VERSION {
            return Err(de::Error::custom(format!(
                "invalid jsonrpc version: {}",
                raw.jsonrpc
            )));
        }
        let id = raw.id.unwrap_or(RequestId::Undefined);
        Ok(WireRequest {
            notification: id.is_undefined(),
            id,
            method: raw.method,
            params: raw.params,
        })
    }
}

impl Serialize for WireRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields =
            2 + usize::from(self.params.is_some()) + usize::from(!self.notification);
        let mut map = serializer.serialize_map(Some(fields))?;
        map.serialize_entry("jsonrpc", VERSION)?;
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        if !self.notification {
            // A call whose id was never assigned still carries the field.
            if self.id.is_undefined() {
                map.serialize_entry("id", &Value::Null)?;
            } else {
                map.serialize_entry("id", &self.id)?;
            }
        }
        map.end()
    }
}

/// A Response object as specified by JSON-RPC 2.0. Exactly one of `result`
/// and `error` is set; the id is `Null` when the request it answers could
/// not be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireResponse {
    pub id: RequestId,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

impl WireResponse {
    pub fn result(id: RequestId, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResponse {
    jsonrpc: String,
    #[serde(default, deserialize_with = "defined_value")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
    #[serde(default, deserialize_with = "defined_id")]
    id: Option<RequestId>,
}

impl<'de> Deserialize<'de> for WireResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResponse::deserialize(deserializer)?;
        if raw.jsonrpc != VERSION {
            return Err(de::Error::custom(format!(
                "invalid jsonrpc version: {}",
                raw.jsonrpc
            )));
        }
        if raw.result.is_some() && raw.error.is_some() {
            return Err(de::Error::custom("only one of result and error may be set"));
        }
        if raw.result.is_none() && raw.error.is_none() {
            return Err(de::Error::custom("one of result or error must be set"));
        }
        Ok(WireResponse {
            id: raw.id.unwrap_or(RequestId::Undefined),
            result: raw.result,
            error: raw.error,
        })
    }
}

impl Serialize for WireResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.result.is_some() && self.error.is_some() {
            return Err(S::Error::custom("only one of result and error may be set"));
        }
        if self.result.is_none() && self.error.is_none() {
            return Err(S::Error::custom("one of result or error must be set"));
        }
        let fields = 2 + usize::from(!self.id.is_undefined());
        let mut map = serializer.serialize_map(Some(fields))?;
        map.serialize_entry("jsonrpc", VERSION)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        } else {
            map.serialize_entry("result", &self.result)?;
        }
        if !self.id.is_undefined() {
            map.serialize_entry("id", &self.id)?;
        }
        map.end()
    }
}

/// Either a request or a response; the two shapes share one frame slot.
#[derive(Debug, Clone, PartialEq)]
pub enum WireObject {
    Request(WireRequest),
    Response(WireResponse),
}

impl<'de> Deserialize<'de> for WireObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        // Speculative decode: request shape first, then response. Strict
        // unknown-field rejection keeps the arms disjoint.
        let req_err = match serde_json::from_value::<WireRequest>(value.clone()) {
            Ok(req) => return Ok(WireObject::Request(req)),
            Err(e) => e,
        };
        let resp_err = match serde_json::from_value::<WireResponse>(value) {
            Ok(resp) => return Ok(WireObject::Response(resp)),
            Err(e) => e,
        };
        Err(de::Error::custom(format!(
            "invalid json-rpc 2.0 message: {req_err} for request and {resp_err} for response"
        )))
    }
}

impl Serialize for WireObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireObject::Request(req) => req.serialize(serializer),
            WireObject::Response(resp) => resp.serialize(serializer),
        }
    }
}

/// One frame on the wire: a single object, or an ordered batch of objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    pub batched: bool,
    pub objects: Vec<WireObject>,
}

impl WireMessage {
    pub fn single(object: WireObject) -> Self {
        Self {
            batched: false,
            objects: vec![object],
        }
    }

    pub fn batch(objects: Vec<WireObject>) -> Self {
        Self {
            batched: true,
            objects,
        }
    }
}

impl<'de> Deserialize<'de> for WireMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(de::Error::custom("a batch must not be empty"));
                }
                let objects = items
                    .into_iter()
                    .map(|item| serde_json::from_value::<WireObject>(item).map_err(de::Error::custom))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(WireMessage {
                    batched: true,
                    objects,
                })
            }
            other => {
                let object = serde_json::from_value::<WireObject>(other).map_err(de::Error::custom)?;
                Ok(WireMessage {
                    batched: false,
                    objects: vec![object],
                })
            }
        }
    }
}

impl Serialize for WireMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.batched {
            let mut seq = serializer.serialize_seq(Some(self.objects.len()))?;
            for object in &self.objects {
                seq.serialize_element(object)?;
            }
            seq.end()
        } else {
            if self.objects.len() != 1 {
                return Err(S::Error::custom(
                    "must be one object for a non-batched message",
                ));
            }
            self.objects[0].serialize(serializer)
        }
    }
}
