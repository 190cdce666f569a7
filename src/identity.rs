//! Identity service: resolves bearer credentials to principals.
//!
//! Tokens are HMAC-SHA256 signed values of the form
//! `<id>.<role>.<expiry-ms>.<signature>`. The external identity provider
//! is mocked by the signer; anything that can verify the signature format
//! can stand in for it.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Principal role as resolved from a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Customer,
    OwnerOrHelper,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::OwnerOrHelper => "ownerOrHelper",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "ownerOrHelper" => Some(Role::OwnerOrHelper),
            _ => None,
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Customer,
        }
    }

    pub fn vendor(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::OwnerOrHelper,
        }
    }

    pub fn is_vendor_side(&self) -> bool {
        self.role == Role::OwnerOrHelper
    }
}

/// Issues and verifies signed bearer tokens.
pub struct TokenService {
    secret: Vec<u8>,
    ttl_ms: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_ms: ttl_seconds * 1_000,
        }
    }

    /// Issue a token for a principal, valid for the configured TTL.
    pub fn issue(&self, principal: &Principal, now_ms: u64) -> String {
        let expiry = now_ms + self.ttl_ms;
        let payload = format!("{}.{}.{}", principal.id, principal.role.as_str(), expiry);
        let sig = self.sign(&payload);
        format!("{}.{}", payload, sig)
    }

    /// Resolve a bearer token to a principal, rejecting bad signatures
    /// and expired credentials.
    pub fn verify(&self, token: &str, now_ms: u64) -> Result<Principal> {
        let (payload, sig) = token
            .rsplit_once('.')
            .ok_or_else(|| Error::Unauthorized("malformed credential".to_string()))?;

        let expected = self.sign(payload);
        if !constant_time_eq(sig.as_bytes(), expected.as_bytes()) {
            return Err(Error::Unauthorized("invalid credential".to_string()));
        }

        let mut parts = payload.rsplitn(3, '.');
        let expiry: u64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Unauthorized("malformed credential".to_string()))?;
        let role = parts
            .next()
            .and_then(Role::parse)
            .ok_or_else(|| Error::Unauthorized("malformed credential".to_string()))?;
        let id = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Unauthorized("malformed credential".to_string()))?;

        if now_ms >= expiry {
            return Err(Error::Unauthorized("credential expired".to_string()));
        }

        Ok(Principal {
            id: id.to_string(),
            role,
        })
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        let bytes = mac.finalize().into_bytes();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Constant-time byte slice comparison to prevent timing attacks.
#[inline]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
