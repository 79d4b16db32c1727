// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registration (attestation) ceremony

use serde_json::Value;
use tracing::{debug, info, warn};

use fidobridge_common::api::{
    CredentialCreationOptions, CredentialSummary, RegistrationCheck, User,
};
use fidobridge_common::codec::{
    base64_from_bytes, bytes_from_base64, bytes_from_latin1, latin1_from_base64,
};

use super::Fido2Component;
use crate::engine::{
    AttestationResult, EngineAttestationResponse, EngineUser, COUNTER,
    CREDENTIAL_PUBLIC_KEY_JWK, CREDENTIAL_PUBLIC_KEY_PEM,
};
use crate::error::{Fido2Error, Result};

impl Fido2Component {
    /// Build registration options for `user`.
    ///
    /// The returned challenge is base64; the caller must keep it until
    /// [`check_registration`](Self::check_registration). `user.id` comes back
    /// in its original text form after a full trip through the codec.
    pub async fn begin_registration(&self, user: &User) -> Result<CredentialCreationOptions> {
        debug!(user_id_len = user.id.len(), "Starting registration ceremony");

        let engine_user = EngineUser {
            id: bytes_from_latin1(&user.id)?,
            name: user.name.clone(),
            display_name: user.display_name.clone(),
        };

        let options = self
            .engine
            .attestation_options(engine_user, &self.config.options)
            .await
            .inspect_err(|e| warn!(error = %e, "Engine failed to produce attestation options"))?;

        let challenge = base64_from_bytes(&options.challenge);
        let user_id = latin1_from_base64(&base64_from_bytes(&options.user.id))?;

        debug!(challenge_len = options.challenge.len(), "Issued registration challenge");

        Ok(CredentialCreationOptions {
            rp: options.rp,
            user: User {
                id: user_id,
                name: options.user.name,
                display_name: options.user.display_name,
            },
            challenge,
            pub_key_cred_params: options.pub_key_cred_params,
            timeout: options.timeout,
            attestation: options.attestation,
            authenticator_selection: options.authenticator_selection,
        })
    }

    /// Verify a browser attestation against the challenge issued earlier.
    ///
    /// On success returns the public key (JWK and PEM) and signature counter
    /// the caller should store for future logins.
    pub async fn check_registration(&self, check: RegistrationCheck) -> Result<CredentialSummary> {
        let RegistrationCheck {
            attestation_response,
            challenge,
        } = check;

        let response = EngineAttestationResponse {
            id: bytes_from_base64(&attestation_response.id)?,
            raw_id: attestation_response.raw_id,
            credential_type: attestation_response.credential_type,
            response: attestation_response.response,
            extra: attestation_response.extra,
        };
        let expectations = self.config.expectations.expect(challenge);

        debug!(credential_id_len = response.id.len(), "Verifying attestation");

        let result = self
            .engine
            .attestation_result(response, expectations)
            .await
            .inspect_err(|e| warn!(error = %e, "Attestation rejected"))?;

        let summary = summarize(&result)?;
        info!(counter = summary.counter, "Registration verified");
        Ok(summary)
    }
}

fn summarize(result: &AttestationResult) -> Result<CredentialSummary> {
    let data = &result.authnr_data;

    let public_key_jwk = data
        .get(CREDENTIAL_PUBLIC_KEY_JWK)
        .filter(|v| v.is_object())
        .cloned()
        .ok_or(Fido2Error::MalformedResult {
            field: CREDENTIAL_PUBLIC_KEY_JWK,
        })?;

    let public_key_pem = data
        .get(CREDENTIAL_PUBLIC_KEY_PEM)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(Fido2Error::MalformedResult {
            field: CREDENTIAL_PUBLIC_KEY_PEM,
        })?;

    let counter = data
        .get(COUNTER)
        .and_then(Value::as_u64)
        .and_then(|c| u32::try_from(c).ok())
        .ok_or(Fido2Error::MalformedResult { field: COUNTER })?;

    Ok(CredentialSummary {
        public_key_jwk,
        public_key_pem,
        counter,
    })
}
