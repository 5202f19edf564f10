// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the unverified claim codec.
//!
//! [`decode_unverified`] only splits and decodes a compact JWS. Nothing it
//! returns is trusted until the authentication policy has verified the
//! signature, issuer and expiry against a resolved key.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::roles::Role;

/// Identity claims carried by a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject: the user id, a UUID by convention
    #[serde(default)]
    pub sub: String,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Expiration (Unix seconds)
    #[serde(default)]
    pub exp: i64,

    /// Issued at (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not before (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Role names. Unordered; `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: BTreeSet<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Claims {
    /// Build claims issued now and expiring after `ttl`.
    pub fn new<I, R>(subject: Uuid, issuer: impl Into<String>, roles: I, ttl: Duration) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            iss: issuer.into(),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            nbf: None,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role.as_str())
    }

    /// Parse the subject into a user id.
    pub fn subject_id(&self) -> Result<Uuid, ClaimsError> {
        if self.sub.is_empty() {
            return Err(ClaimsError::MissingSubject);
        }
        Uuid::parse_str(&self.sub).map_err(|_| ClaimsError::InvalidSubject(self.sub.clone()))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token carries no subject")]
    MissingSubject,
    #[error("subject {0:?} is not a user id")]
    InvalidSubject(String),
}

/// Failures while decoding a token without verifying it.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("expected 3 token segments, found {0}")]
    Segments(usize),
    #[error("token {0} is not base64url")]
    Base64(&'static str),
    #[error("token {segment} is not valid JSON: {source}")]
    Json {
        segment: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("kid missing from header")]
    MissingKeyId,
    #[error("kid malformed: expected a string")]
    KeyIdNotString,
}

/// A decoded but not yet verified token.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    header: Map<String, Value>,
    claims: Claims,
}

impl UnverifiedToken {
    /// Key id from the token header.
    pub fn key_id(&self) -> Result<&str, CodecError> {
        match self.header.get("kid") {
            None => Err(CodecError::MissingKeyId),
            Some(Value::String(kid)) => Ok(kid),
            Some(_) => Err(CodecError::KeyIdNotString),
        }
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

/// Split a compact JWS and decode its header and claims.
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, CodecError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, _signature] = segments.as_slice() else {
        return Err(CodecError::Segments(segments.len()));
    };

    let header = decode_segment::<Map<String, Value>>(header, "header")?;
    let claims = decode_segment::<Claims>(payload, "payload")?;

    Ok(UnverifiedToken { header, claims })
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    name: &'static str,
) -> Result<T, CodecError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| CodecError::Base64(name))?;
    serde_json::from_slice(&bytes).map_err(|source| CodecError::Json {
        segment: name,
        source,
    })
}
