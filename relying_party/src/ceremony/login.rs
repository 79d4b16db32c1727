// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Login (assertion) ceremony

use tracing::{debug, info, warn};

use fidobridge_common::api::{AssertionResponse, CredentialRequestOptions, LoginCheck};
use fidobridge_common::codec::{base64_from_bytes, bytes_from_base64, latin1_from_base64};

use super::Fido2Component;
use crate::engine::{EngineAssertionPayload, EngineAssertionResponse, Expectations};
use crate::error::Result;

impl Fido2Component {
    /// Build login options with a fresh base64 challenge
    pub async fn begin_login(&self) -> Result<CredentialRequestOptions> {
        let options = self
            .engine
            .assertion_options(&self.config.options)
            .await
            .inspect_err(|e| warn!(error = %e, "Engine failed to produce assertion options"))?;

        debug!(challenge_len = options.challenge.len(), "Issued login challenge");

        Ok(CredentialRequestOptions {
            challenge: base64_from_bytes(&options.challenge),
            timeout: options.timeout,
            rp_id: options.rp_id,
            user_verification: options.user_verification,
        })
    }

    /// Decode the user handle embedded in an assertion so the caller can
    /// find the stored credential before calling [`check_login`](Self::check_login).
    pub async fn extract_login_user_id(&self, assertion: &AssertionResponse) -> Result<String> {
        Ok(latin1_from_base64(&assertion.response.user_id)?)
    }

    /// Verify a browser assertion against the stored public key and counter.
    ///
    /// Returns `true` on success. A counter that has not advanced past the
    /// stored value is rejected by the engine as a possible cloned
    /// authenticator; that rejection is returned unchanged.
    pub async fn check_login(&self, check: LoginCheck) -> Result<bool> {
        let LoginCheck {
            assertion_response: assertion,
            challenge,
            public_key_pem,
            counter,
        } = check;

        let encoded_user_id = assertion.response.user_id;
        let response = EngineAssertionResponse {
            id: bytes_from_base64(&assertion.id)?,
            raw_id: assertion.raw_id,
            credential_type: assertion.credential_type,
            user_handle: latin1_from_base64(&encoded_user_id)?,
            response: EngineAssertionPayload {
                authenticator_data: bytes_from_base64(&assertion.response.authenticator_data)?,
                user_handle: encoded_user_id.clone(),
                client_data_json: assertion.response.client_data_json,
                signature: assertion.response.signature,
                extra: assertion.response.extra,
            },
            extra: assertion.extra,
        };

        let expectations = Expectations {
            public_key: Some(public_key_pem),
            prev_counter: Some(counter),
            user_handle: Some(encoded_user_id),
            ..self.config.expectations.expect(challenge)
        };

        debug!(
            credential_id_len = response.id.len(),
            prev_counter = counter,
            "Verifying assertion"
        );

        self.engine
            .assertion_result(response, expectations)
            .await
            .inspect_err(|e| warn!(error = %e, prev_counter = counter, "Assertion rejected"))?;

        info!("Login verified");
        Ok(true)
    }
}
