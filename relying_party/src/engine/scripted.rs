// relying_party/src/engine/scripted.rs
//! Scripted verification engine for tests and local development
//!
//! Performs no cryptography. Credentials are enrolled up front together with
//! the key material the engine should report, and ceremony results are judged
//! only on the checks that exercise the orchestrator's contract:
//!
//! - client data type, challenge and origin against the expectations
//! - enrolled credential id and stored public key
//! - encoded user handle equality
//! - strictly increasing signature counter
//!
//! Client data is expected as standard base64 of a JSON object
//! `{"type", "challenge", "origin"}`; [`ScriptedEngine::client_data`] builds one.

use async_trait::async_trait;
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use fidobridge_common::codec::{base64_from_bytes, bytes_from_base64};

use super::{
    AssertionResult, AttestationResult, AuthnrData, EngineAssertionResponse,
    EngineAttestationResponse, EngineCreationOptions, EngineRequestOptions, EngineUser,
    Expectations, VerificationEngine, COUNTER, CREDENTIAL_PUBLIC_KEY_JWK,
    CREDENTIAL_PUBLIC_KEY_PEM,
};
use crate::config::Fido2Options;
use crate::error::VerificationError;

pub const CREATE_TYPE: &str = "webauthn.create";
pub const GET_TYPE: &str = "webauthn.get";

/// Offset of the big-endian signature counter inside authenticator data
const COUNTER_OFFSET: usize = 33;

/// Key material reported for an enrolled credential
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledKey {
    pub jwk: Value,
    pub pem: String,
    pub counter: u32,
}

#[derive(Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

#[derive(Default)]
pub struct ScriptedEngine {
    enrolled: Mutex<HashMap<Vec<u8>, EnrolledKey>>,
    stripped: Mutex<Vec<&'static str>>,
    last_attestation: Mutex<Option<(EngineAttestationResponse, Expectations)>>,
    last_assertion: Mutex<Option<(EngineAssertionResponse, Expectations)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential id and the key material to report for it
    pub fn enroll(&self, credential_id: &[u8], key: EnrolledKey) {
        lock(&self.enrolled).insert(credential_id.to_vec(), key);
    }

    pub fn enrolled(&self, credential_id: &[u8]) -> Option<EnrolledKey> {
        lock(&self.enrolled).get(credential_id).cloned()
    }

    /// Omit `key` from every authenticator-data result from now on
    pub fn strip_field(&self, key: &'static str) {
        lock(&self.stripped).push(key);
    }

    /// The last attestation handed to the engine, as the orchestrator built it
    pub fn last_attestation(&self) -> Option<(EngineAttestationResponse, Expectations)> {
        lock(&self.last_attestation).clone()
    }

    /// The last assertion handed to the engine, as the orchestrator built it
    pub fn last_assertion(&self) -> Option<(EngineAssertionResponse, Expectations)> {
        lock(&self.last_assertion).clone()
    }

    /// Base64 client data for a ceremony of `kind` answering `challenge`
    pub fn client_data(kind: &str, challenge: &str, origin: &str) -> String {
        let json = serde_json::json!({
            "type": kind,
            "challenge": challenge,
            "origin": origin,
        });
        base64_from_bytes(json.to_string().as_bytes())
    }

    /// Minimal authenticator data: zeroed RP id hash, UP|UV flags, counter
    pub fn authenticator_data(counter: u32) -> Vec<u8> {
        let mut data = vec![0u8; COUNTER_OFFSET + 4];
        data[32] = 0x05;
        data[COUNTER_OFFSET..].copy_from_slice(&counter.to_be_bytes());
        data
    }

    fn random_challenge(size: usize) -> Vec<u8> {
        let mut challenge = vec![0u8; size];
        rand::thread_rng().fill_bytes(&mut challenge);
        challenge
    }

    fn check_client_data(
        encoded: &str,
        kind: &str,
        expectations: &Expectations,
    ) -> Result<(), VerificationError> {
        let raw = bytes_from_base64(encoded).map_err(VerificationError::new)?;
        let client: ClientData = serde_json::from_slice(&raw).map_err(VerificationError::new)?;

        if client.kind != kind {
            return Err(VerificationError::msg(format!(
                "clientData type mismatch: expected {}, got {}",
                kind, client.kind
            )));
        }
        if client.challenge != expectations.challenge {
            return Err(VerificationError::msg("challenge mismatch"));
        }
        if client.origin != expectations.origin {
            return Err(VerificationError::msg(format!(
                "origin mismatch: expected {}, got {}",
                expectations.origin, client.origin
            )));
        }
        Ok(())
    }

    fn finish(&self, mut data: AuthnrData) -> AuthnrData {
        for key in lock(&self.stripped).iter() {
            data.remove(key);
        }
        data
    }
}

#[async_trait]
impl VerificationEngine for ScriptedEngine {
    async fn attestation_options(
        &self,
        user: EngineUser,
        options: &Fido2Options,
    ) -> Result<EngineCreationOptions, VerificationError> {
        let challenge = Self::random_challenge(options.challenge_size);
        Ok(EngineCreationOptions::new(user, challenge, options))
    }

    async fn attestation_result(
        &self,
        response: EngineAttestationResponse,
        expectations: Expectations,
    ) -> Result<AttestationResult, VerificationError> {
        *lock(&self.last_attestation) = Some((response.clone(), expectations.clone()));

        Self::check_client_data(&response.response.client_data_json, CREATE_TYPE, &expectations)?;

        let key = self
            .enrolled(&response.id)
            .ok_or_else(|| VerificationError::msg("attestation statement could not be verified"))?;

        let data: AuthnrData = [
            (CREDENTIAL_PUBLIC_KEY_JWK, key.jwk),
            (CREDENTIAL_PUBLIC_KEY_PEM, Value::from(key.pem)),
            (COUNTER, Value::from(key.counter)),
        ]
        .into_iter()
        .collect();

        Ok(AttestationResult {
            authnr_data: self.finish(data),
        })
    }

    async fn assertion_options(
        &self,
        options: &Fido2Options,
    ) -> Result<EngineRequestOptions, VerificationError> {
        let challenge = Self::random_challenge(options.challenge_size);
        Ok(EngineRequestOptions::new(challenge, options))
    }

    async fn assertion_result(
        &self,
        response: EngineAssertionResponse,
        expectations: Expectations,
    ) -> Result<AssertionResult, VerificationError> {
        *lock(&self.last_assertion) = Some((response.clone(), expectations.clone()));

        Self::check_client_data(&response.response.client_data_json, GET_TYPE, &expectations)?;

        let key = self
            .enrolled(&response.id)
            .ok_or_else(|| VerificationError::msg("unknown credential"))?;

        if expectations.public_key.as_deref() != Some(key.pem.as_str()) {
            return Err(VerificationError::msg("signature verification failed"));
        }

        if expectations.user_handle.as_deref() != Some(response.response.user_handle.as_str()) {
            return Err(VerificationError::msg("userHandle mismatch"));
        }

        let auth_data = &response.response.authenticator_data;
        let counter_bytes: [u8; 4] = auth_data
            .get(COUNTER_OFFSET..COUNTER_OFFSET + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| VerificationError::msg("authenticator data too short"))?;
        let counter = u32::from_be_bytes(counter_bytes);

        let prev = expectations.prev_counter.unwrap_or(0);
        let both_unsupported = counter == 0 && prev == 0;
        if counter <= prev && !both_unsupported {
            return Err(VerificationError::msg(format!(
                "counter rollback detected: {} <= {} (possible cloned authenticator)",
                counter, prev
            )));
        }

        if let Some(stored) = lock(&self.enrolled).get_mut(&response.id) {
            stored.counter = counter;
        }

        let data: AuthnrData = [(COUNTER, Value::from(counter))].into_iter().collect();
        Ok(AssertionResult {
            authnr_data: self.finish(data),
        })
    }
}
