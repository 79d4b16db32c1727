// common/src/api.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unrecognized value for one of the WebAuthn enumerations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

// ============================================================================
// Shared Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    None,
    Indirect,
    #[default]
    Direct,
    Enterprise,
}

impl fmt::Display for AttestationConveyance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttestationConveyance::None => write!(f, "none"),
            AttestationConveyance::Indirect => write!(f, "indirect"),
            AttestationConveyance::Direct => write!(f, "direct"),
            AttestationConveyance::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for AttestationConveyance {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(AttestationConveyance::None),
            "indirect" => Ok(AttestationConveyance::Indirect),
            "direct" => Ok(AttestationConveyance::Direct),
            "enterprise" => Ok(AttestationConveyance::Enterprise),
            other => Err(UnknownVariant {
                kind: "attestation conveyance",
                value: other.to_string(),
                expected: "none, indirect, direct, enterprise",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    /// Built into the client device (Touch ID, Windows Hello)
    Platform,
    /// Roaming authenticator (USB/NFC/BLE security key)
    CrossPlatform,
}

impl fmt::Display for AuthenticatorAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthenticatorAttachment::Platform => write!(f, "platform"),
            AuthenticatorAttachment::CrossPlatform => write!(f, "cross-platform"),
        }
    }
}

impl FromStr for AuthenticatorAttachment {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "platform" => Ok(AuthenticatorAttachment::Platform),
            "cross-platform" | "cross_platform" => Ok(AuthenticatorAttachment::CrossPlatform),
            other => Err(UnknownVariant {
                kind: "authenticator attachment",
                value: other.to_string(),
                expected: "platform, cross-platform",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl fmt::Display for UserVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserVerification::Required => write!(f, "required"),
            UserVerification::Preferred => write!(f, "preferred"),
            UserVerification::Discouraged => write!(f, "discouraged"),
        }
    }
}

impl FromStr for UserVerification {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "required" => Ok(UserVerification::Required),
            "preferred" => Ok(UserVerification::Preferred),
            "discouraged" => Ok(UserVerification::Discouraged),
            other => Err(UnknownVariant {
                kind: "user verification",
                value: other.to_string(),
                expected: "required, preferred, discouraged",
            }),
        }
    }
}

// ============================================================================
// Registration (Attestation) Types
// ============================================================================

/// Application user as supplied by the caller.
///
/// `id` is an opaque identifier; it is sent to the authenticator one byte per
/// character, so it must not contain characters above U+00FF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub cred_type: String,
    /// COSE algorithm identifier (-7 = ES256, -257 = RS256)
    pub alg: i64,
}

impl PubKeyCredParam {
    pub fn public_key(alg: i64) -> Self {
        Self {
            cred_type: "public-key".to_string(),
            alg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub require_resident_key: bool,
    pub user_verification: UserVerification,
}

/// Registration options ready for the browser's `navigator.credentials.create`.
///
/// `challenge` is standard base64; `user.id` is the caller's original text id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    pub rp: RelyingParty,
    pub user: User,
    pub challenge: String,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds
    pub timeout: u64,
    pub attestation: AttestationConveyance,
    pub authenticator_selection: AuthenticatorSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Attestation credential as posted back by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    /// Credential id, base64 (padding optional)
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    pub response: AuthenticatorAttestationResponse,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCheck {
    pub attestation_response: AttestationResponse,
    /// Challenge issued by `begin_registration`, recalled by the caller
    pub challenge: String,
}

/// The only state a caller must persist after registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub public_key_jwk: Value,
    pub public_key_pem: String,
    pub counter: u32,
}

// ============================================================================
// Login (Assertion) Types
// ============================================================================

/// Login options ready for the browser's `navigator.credentials.get`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    pub challenge: String,
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    pub user_verification: UserVerification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    /// Base64 authenticator data
    pub authenticator_data: String,
    /// Base64 user handle
    pub user_id: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Assertion credential as posted back by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    pub response: AuthenticatorAssertionResponse,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCheck {
    pub assertion_response: AssertionResponse,
    pub challenge: String,
    /// From the caller's stored `CredentialSummary`
    pub public_key_pem: String,
    /// Last stored signature counter
    pub counter: u32,
}
