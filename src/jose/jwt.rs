//! [`JsonWebToken`]: header + payload with typed accessors for the
//! registered claims enumerated in spec §3.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    pub alg: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<SmolStr>,
    /// JWE-only: the key-management algorithm used to wrap the CEK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<Value>,
}

/// Either form scope can take in a payload (spec §6.1): "Scope in token
/// requests is space-separated; in payloads it may be either the string
/// form or an array."
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    Spaced(String),
    List(Vec<String>),
}

impl ScopeClaim {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Spaced(s) => s.split_whitespace().map(str::to_owned).collect(),
            Self::List(v) => v,
        }
    }

    pub fn from_vec(scopes: &[String]) -> Self {
        Self::Spaced(scopes.join(" "))
    }
}

/// A free-form claim mapping with typed accessors for the registered
/// claims named in spec §3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload(pub BTreeMap<String, Value>);

macro_rules! string_claim {
    ($get:ident, $set:ident, $name:literal) => {
        pub fn $get(&self) -> Option<&str> {
            self.0.get($name).and_then(Value::as_str)
        }

        pub fn $set(&mut self, value: impl Into<String>) -> &mut Self {
            self.0.insert($name.to_owned(), Value::String(value.into()));
            self
        }
    };
}

macro_rules! int_claim {
    ($get:ident, $set:ident, $name:literal) => {
        pub fn $get(&self) -> Option<i64> {
            self.0.get($name).and_then(Value::as_i64)
        }

        pub fn $set(&mut self, value: i64) -> &mut Self {
            self.0.insert($name.to_owned(), Value::from(value));
            self
        }
    };
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    string_claim!(iss, set_iss, "iss");
    string_claim!(sub, set_sub, "sub");
    string_claim!(jti, set_jti, "jti");
    string_claim!(nonce, set_nonce, "nonce");
    string_claim!(client_id, set_client_id, "client_id");
    string_claim!(acr, set_acr, "acr");
    string_claim!(sid, set_sid, "sid");
    string_claim!(azp, set_azp, "azp");

    int_claim!(exp, set_exp, "exp");
    int_claim!(iat, set_iat, "iat");
    int_claim!(nbf, set_nbf, "nbf");
    int_claim!(auth_time, set_auth_time, "auth_time");

    pub fn aud(&self) -> Vec<String> {
        match self.0.get("aud") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(values)) => values.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn set_aud(&mut self, audiences: &[String]) -> &mut Self {
        let value = match audiences {
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };
        self.0.insert("aud".to_owned(), value);
        self
    }

    pub fn scope(&self) -> Vec<String> {
        self.0
            .get("scope")
            .cloned()
            .and_then(|v| serde_json::from_value::<ScopeClaim>(v).ok())
            .map(ScopeClaim::into_vec)
            .unwrap_or_default()
    }

    pub fn set_scope(&mut self, scopes: &[String]) -> &mut Self {
        self.0.insert("scope".to_owned(), serde_json::to_value(ScopeClaim::from_vec(scopes)).unwrap_or(Value::Null));
        self
    }

    pub fn amr(&self) -> Vec<String> {
        self.0
            .get("amr")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
            .unwrap_or_default()
    }

    pub fn set_amr(&mut self, amr: &[String]) -> &mut Self {
        self.0.insert("amr".to_owned(), Value::Array(amr.iter().cloned().map(Value::String).collect()));
        self
    }

    /// The optional serialized `requested_claims` object (spec §3).
    pub fn requested_claims(&self) -> Option<&Value> {
        self.0.get("requested_claims")
    }

    pub fn set_requested_claims(&mut self, claims: Value) -> &mut Self {
        self.0.insert("requested_claims".to_owned(), claims);
        self
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn set(&mut self, claim: impl Into<String>, value: Value) -> &mut Self {
        self.0.insert(claim.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebToken {
    pub header: Header,
    pub payload: Payload,
}

impl JsonWebToken {
    pub fn new(alg: impl Into<SmolStr>, payload: Payload) -> Self {
        Self { header: Header { alg: alg.into(), ..Header::default() }, payload }
    }
}
