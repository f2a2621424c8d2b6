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

//! Polymorphic JSON-RPC 2.0 request id.
//!
//! JSON-RPC 2.0 allows string, integer, and null ids, and the absence of the
//! field carries meaning of its own: a request without an id is a
//! notification. `Undefined` (absent) and `Null` (present, null) are
//! therefore distinct variants, never a nullable wrapper.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A JSON-RPC 2.0 id. The default value is an undefined id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RequestId {
    /// The id field was absent.
    #[default]
    Undefined,
    /// The id field was present with the value `null`.
    Null,
    String(String),
    Number(i64),
}

impl RequestId {
    pub fn is_undefined(&self) -> bool {
        matches!(self, RequestId::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, RequestId::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, RequestId::Number(_))
    }

    /// Key used to correlate a response with an outstanding call. Calls are
    /// issued with numeric ids, but a remote may echo the id back as a
    /// decimal string; both forms map to the same key.
    pub(crate) fn correlation_key(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            RequestId::String(s) => s.parse().ok(),
            RequestId::Undefined | RequestId::Null => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Undefined | RequestId::Null => Ok(()),
            RequestId::String(s) => f.write_str(s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestId::Null => serializer.serialize_unit(),
            RequestId::String(s) => serializer.serialize_str(s),
            RequestId::Number(n) => serializer.serialize_i64(*n),
            // The enclosing struct must omit the field instead.
            RequestId::Undefined => Err(serde::ser::Error::custom(
                "an undefined id cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = RequestId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, integer, or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<RequestId, E> {
                Ok(RequestId::Null)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RequestId, E> {
                Ok(RequestId::Number(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RequestId, E> {
                i64::try_from(v)
                    .map(RequestId::Number)
                    .map_err(|_| E::custom("id does not fit in a signed 64-bit integer"))
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<RequestId, E> {
                Err(E::custom("id must be a string, integer, or null"))
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<RequestId, E> {
                Err(E::custom("id must be a string, integer, or null"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RequestId, E> {
                Ok(RequestId::String(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RequestId, E> {
                Ok(RequestId::String(v))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}
