//! JSON Web Key / JSON Web Key Set (spec §3 "JsonWebKey" / "JsonWebKeySet").

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::CryptoError;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Intended use of a key, per RFC 7517 §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUse {
    Sig,
    Enc,
}

/// A polymorphic JSON Web Key (spec §3).
///
/// Invariant: a key whose `alg` is the literal string `"none"` is never
/// handed to a signing or encrypting caller; [`JsonWebKeySet::find_signing_key`]
/// and [`JsonWebKeySet::find_encryption_key`] filter it out unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(flatten)]
    pub material: KeyMaterial,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<SmolStr>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<KeyUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<SmolStr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum KeyMaterial {
    RSA {
        n: SmolStr,
        e: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<SmolStr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        p: Option<SmolStr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        q: Option<SmolStr>,
    },
    EC {
        crv: SmolStr,
        x: SmolStr,
        y: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<SmolStr>,
    },
    #[serde(rename = "oct")]
    Oct {
        k: SmolStr,
    },
    OKP {
        crv: SmolStr,
        x: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<SmolStr>,
    },
}

impl KeyMaterial {
    pub const fn is_private(&self) -> bool {
        match self {
            Self::RSA { d, .. } | Self::EC { d, .. } | Self::OKP { d, .. } => d.is_some(),
            Self::Oct { .. } => true,
        }
    }
}

impl JsonWebKey {
    pub fn oct(k: &[u8]) -> Self {
        Self {
            material: KeyMaterial::Oct { k: SmolStr::new(B64.encode(k)) },
            kid: None,
            key_use: Some(KeyUse::Enc),
            alg: None,
            key_ops: Vec::new(),
        }
    }

    /// Decodes the symmetric key bytes out of an `oct` key.
    ///
    /// Returns [`CryptoError`] (not the underlying reason) for any other
    /// key type, per spec §7-3's uniform-failure rule for crypto boundary
    /// operations.
    pub fn oct_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        match &self.material {
            KeyMaterial::Oct { k } => B64.decode(k.as_bytes()).map_err(|_| CryptoError),
            _ => Err(CryptoError),
        }
    }

    /// True when this key declares an intended algorithm of the literal
    /// `none`, which per spec §3 must never be handed back to a caller
    /// that wants to sign or encrypt with it.
    pub fn is_alg_none(&self) -> bool {
        self.alg.as_deref().is_some_and(|alg| alg.eq_ignore_ascii_case("none"))
    }

    /// Matches RFC 7518 `alg` against this key's declared family, used by
    /// [`JsonWebKeySet`] lookup (spec §3: "prefers exact `alg` match, then
    /// keys with `alg = null`").
    fn matches_alg(&self, alg: &str) -> bool {
        match &self.alg {
            Some(declared) => declared.as_str() == alg,
            None => true,
        }
    }
}

/// An unordered set of [`JsonWebKey`]s addressable by `kid` (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    pub fn by_kid(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Key lookup by `(alg, kid?)` per spec §3: "Lookup by `(alg, kid?)`
    /// prefers exact `alg` match, then keys with `alg = null`".
    ///
    /// A key declaring `alg = "none"` is never returned (spec §3 invariant).
    pub fn select(&self, alg: &str, kid: Option<&str>) -> Option<&JsonWebKey> {
        let candidates = self.keys.iter().filter(|k| !k.is_alg_none());

        if let Some(kid) = kid {
            if let Some(exact) = candidates.clone().find(|k| k.kid.as_deref() == Some(kid)) {
                return Some(exact);
            }
        }

        candidates
            .clone()
            .find(|k| k.alg.as_deref() == Some(alg))
            .or_else(|| candidates.find(|k| k.matches_alg(alg) && k.alg.is_none()))
    }

    pub fn push(&mut self, key: JsonWebKey) {
        self.keys.push(key);
    }
}
