// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ceremony error types

use fidobridge_common::EncodingError;
use thiserror::Error;

/// Rejection reported by the verification engine.
///
/// Challenge or origin mismatch, bad signatures, invalid attestation
/// statements and counter regressions all arrive here. The orchestrator never
/// inspects or reclassifies them.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct VerificationError(#[from] anyhow::Error);

impl VerificationError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(err.into())
    }

    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self(anyhow::Error::msg(message))
    }

    /// The engine's original error
    pub fn into_inner(self) -> anyhow::Error {
        self.0
    }
}

/// Errors returned by every ceremony operation
#[derive(Debug, Error)]
pub enum Fido2Error {
    /// Text/binary conversion failed before or after reaching the engine
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The engine rejected the ceremony
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The engine reported success but omitted a required field
    #[error("engine result is missing or has an invalid '{field}'")]
    MalformedResult { field: &'static str },
}

impl Fido2Error {
    pub fn is_verification(&self) -> bool {
        matches!(self, Fido2Error::Verification(_))
    }

    pub fn is_encoding(&self) -> bool {
        matches!(self, Fido2Error::Encoding(_))
    }
}

pub type Result<T> = std::result::Result<T, Fido2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_rejection_message_is_unchanged() {
        let err = Fido2Error::from(VerificationError::msg("challenge mismatch"));
        assert!(err.is_verification());
        assert_eq!(err.to_string(), "challenge mismatch");
    }

    #[test]
    fn test_verification_error_keeps_inner() {
        let inner = anyhow::anyhow!("counter rollback detected: 4 <= 5");
        let err = VerificationError::new(inner);
        assert_eq!(err.into_inner().to_string(), "counter rollback detected: 4 <= 5");
    }
}
