// relying_party/src/engine/mod.rs
//! Verification engine abstraction
//!
//! The cryptographic half of every ceremony (challenge generation, attestation
//! statement parsing, signature checks, public key extraction) lives in an
//! external FIDO2 library. This module fixes the contract such a library must
//! satisfy so the orchestrator can drive any conformant implementation.
//!
//! Everything on this side of the seam is binary: challenges, credential ids,
//! user ids and authenticator data are raw bytes. Conversion to and from wire
//! text happens in the orchestrator, never in an engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use fidobridge_common::api::{
    AttestationConveyance, AuthenticatorAttestationResponse, AuthenticatorSelection,
    PubKeyCredParam, RelyingParty, UnknownVariant, UserVerification,
};

use crate::config::Fido2Options;
use crate::error::VerificationError;

#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

/// Authenticator-data key holding the credential public key as a JWK object
pub const CREDENTIAL_PUBLIC_KEY_JWK: &str = "credentialPublicKeyJwk";
/// Authenticator-data key holding the credential public key as PEM text
pub const CREDENTIAL_PUBLIC_KEY_PEM: &str = "credentialPublicKeyPem";
/// Authenticator-data key holding the signature counter
pub const COUNTER: &str = "counter";

// --- Options ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineUser {
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// Registration options as produced by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCreationOptions {
    pub rp: RelyingParty,
    pub user: EngineUser,
    pub challenge: Vec<u8>,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: u64,
    pub attestation: AttestationConveyance,
    pub authenticator_selection: AuthenticatorSelection,
}

impl EngineCreationOptions {
    /// Fill every field except the challenge from the resolved options
    pub fn new(user: EngineUser, challenge: Vec<u8>, options: &Fido2Options) -> Self {
        Self {
            rp: RelyingParty {
                id: options.rp_id.clone(),
                name: options.rp_name.clone(),
            },
            user,
            challenge,
            pub_key_cred_params: options
                .crypto_params
                .iter()
                .copied()
                .map(PubKeyCredParam::public_key)
                .collect(),
            timeout: options.timeout_ms,
            attestation: options.attestation,
            authenticator_selection: AuthenticatorSelection {
                authenticator_attachment: options.authenticator_attachment,
                require_resident_key: options.require_resident_key,
                user_verification: options.user_verification,
            },
        }
    }
}

/// Login options as produced by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequestOptions {
    pub challenge: Vec<u8>,
    pub timeout: u64,
    pub rp_id: Option<String>,
    pub user_verification: UserVerification,
}

impl EngineRequestOptions {
    pub fn new(challenge: Vec<u8>, options: &Fido2Options) -> Self {
        Self {
            challenge,
            timeout: options.timeout_ms,
            rp_id: options.rp_id.clone(),
            user_verification: options.user_verification,
        }
    }
}

// --- Results submitted for verification ---

/// Attestation credential with its id decoded to bytes.
///
/// Client data and the attestation object are forwarded exactly as the
/// browser sent them.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAttestationResponse {
    pub id: Vec<u8>,
    pub raw_id: Option<String>,
    pub credential_type: Option<String>,
    pub response: AuthenticatorAttestationResponse,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineAssertionPayload {
    pub authenticator_data: Vec<u8>,
    /// User handle exactly as received (base64 text)
    pub user_handle: String,
    pub client_data_json: String,
    pub signature: String,
    pub extra: Map<String, Value>,
}

/// Assertion credential with binary fields decoded.
///
/// `user_handle` carries the decoded Latin-1 form for the application, while
/// `response.user_handle` keeps the encoded form that engines compare against
/// [`Expectations::user_handle`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAssertionResponse {
    pub id: Vec<u8>,
    pub raw_id: Option<String>,
    pub credential_type: Option<String>,
    pub user_handle: String,
    pub response: EngineAssertionPayload,
    pub extra: Map<String, Value>,
}

// --- Expectations ---

/// Which authentication factor the ceremony must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    /// User verification required (passwordless)
    First,
    /// User presence is enough (second factor after a password)
    Second,
    #[default]
    Either,
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::First => write!(f, "first"),
            Factor::Second => write!(f, "second"),
            Factor::Either => write!(f, "either"),
        }
    }
}

impl FromStr for Factor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Factor::First),
            "second" => Ok(Factor::Second),
            "either" => Ok(Factor::Either),
            other => Err(UnknownVariant {
                kind: "factor",
                value: other.to_string(),
                expected: "first, second, either",
            }),
        }
    }
}

/// Values the engine checks a ceremony result against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    pub challenge: String,
    pub origin: String,
    pub factor: Factor,
    /// Stored credential public key (PEM), login only
    pub public_key: Option<String>,
    /// Last stored signature counter, login only
    pub prev_counter: Option<u32>,
    /// Encoded user handle, login only
    pub user_handle: Option<String>,
}

// --- Verification results ---

/// Authenticator data fields reported by the engine, looked up by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthnrData(BTreeMap<String, Value>);

impl AuthnrData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for AuthnrData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttestationResult {
    pub authnr_data: AuthnrData,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssertionResult {
    pub authnr_data: AuthnrData,
}

// --- Engine trait ---

/// FIDO2 verification backend
///
/// Implementations wrap a FIDO2 library. Every failure, whether generating
/// options or verifying a result, is reported as a [`VerificationError`] and
/// handed to the caller untouched.
///
/// # Contract
///
/// - Options calls must return a fresh random challenge of
///   `options.challenge_size` bytes and echo the user id bytes unchanged.
/// - `attestation_result` must verify the attestation against
///   `expectations.challenge`/`origin`/`factor` and, on success, expose
///   [`CREDENTIAL_PUBLIC_KEY_JWK`], [`CREDENTIAL_PUBLIC_KEY_PEM`] and
///   [`COUNTER`] in its authenticator data.
/// - `assertion_result` must verify the signature with
///   `expectations.public_key`, compare `response.response.user_handle` with
///   `expectations.user_handle` (both in encoded form) and reject a counter
///   that is not strictly greater than `expectations.prev_counter`.
#[async_trait]
pub trait VerificationEngine: Send + Sync {
    async fn attestation_options(
        &self,
        user: EngineUser,
        options: &Fido2Options,
    ) -> Result<EngineCreationOptions, VerificationError>;

    async fn attestation_result(
        &self,
        response: EngineAttestationResponse,
        expectations: Expectations,
    ) -> Result<AttestationResult, VerificationError>;

    async fn assertion_options(
        &self,
        options: &Fido2Options,
    ) -> Result<EngineRequestOptions, VerificationError>;

    async fn assertion_result(
        &self,
        response: EngineAssertionResponse,
        expectations: Expectations,
    ) -> Result<AssertionResult, VerificationError>;
}
