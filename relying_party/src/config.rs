// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::str::FromStr;
use tracing::info;

use fidobridge_common::api::{AttestationConveyance, AuthenticatorAttachment, UserVerification};
use fidobridge_common::duration::{format_timeout_ms, parse_timeout_ms};

use crate::engine::{Expectations, Factor};

pub const DEFAULT_CHALLENGE_SIZE: usize = 128;
/// Smallest challenge the engine contract allows
pub const MIN_CHALLENGE_SIZE: usize = 32;
pub const DEFAULT_CRYPTO_PARAMS: [i64; 2] = [-7, -257];
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_RP_NAME: &str = "Anonymous Service";
pub const DEFAULT_ORIGIN: &str = "https://example.com";

/// Engine options after defaults and overrides have been merged
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fido2Options {
    /// Challenge length in bytes
    pub challenge_size: usize,
    pub attestation: AttestationConveyance,
    /// Accepted COSE algorithm identifiers, in preference order
    pub crypto_params: Vec<i64>,
    /// `None` lets the browser offer any authenticator
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub require_resident_key: bool,
    pub user_verification: UserVerification,
    pub timeout_ms: u64,
    pub rp_id: Option<String>,
    pub rp_name: String,
}

impl Default for Fido2Options {
    fn default() -> Self {
        Self {
            challenge_size: DEFAULT_CHALLENGE_SIZE,
            attestation: AttestationConveyance::Direct,
            crypto_params: DEFAULT_CRYPTO_PARAMS.to_vec(),
            authenticator_attachment: Some(AuthenticatorAttachment::CrossPlatform),
            require_resident_key: false,
            user_verification: UserVerification::Preferred,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rp_id: None,
            rp_name: DEFAULT_RP_NAME.to_string(),
        }
    }
}

impl Fido2Options {
    /// Apply caller-supplied values; every field that is set wins
    pub fn merge(mut self, overrides: Fido2Overrides) -> Self {
        if let Some(v) = overrides.challenge_size {
            self.challenge_size = v;
        }
        if let Some(v) = overrides.attestation {
            self.attestation = v;
        }
        if let Some(v) = overrides.crypto_params {
            self.crypto_params = v;
        }
        if let Some(v) = overrides.authenticator_attachment {
            self.authenticator_attachment = v;
        }
        if let Some(v) = overrides.require_resident_key {
            self.require_resident_key = v;
        }
        if let Some(v) = overrides.user_verification {
            self.user_verification = v;
        }
        if let Some(v) = overrides.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.rp_id {
            self.rp_id = Some(v);
        }
        if let Some(v) = overrides.rp_name {
            self.rp_name = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.challenge_size < MIN_CHALLENGE_SIZE {
            bail!(
                "challenge size {} is below the minimum of {} bytes",
                self.challenge_size,
                MIN_CHALLENGE_SIZE
            );
        }
        if self.crypto_params.is_empty() {
            bail!("at least one public key algorithm must be accepted");
        }
        if self.timeout_ms == 0 {
            bail!("ceremony timeout must be greater than zero");
        }
        if self.rp_name.trim().is_empty() {
            bail!("relying party name must not be empty");
        }
        Ok(())
    }
}

/// Caller-supplied engine settings. Unset fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Fido2Overrides {
    pub challenge_size: Option<usize>,
    pub attestation: Option<AttestationConveyance>,
    pub crypto_params: Option<Vec<i64>>,
    /// `Some(None)` (JSON `null`) clears the default attachment
    #[serde(default, deserialize_with = "explicit_null")]
    pub authenticator_attachment: Option<Option<AuthenticatorAttachment>>,
    pub require_resident_key: Option<bool>,
    pub user_verification: Option<UserVerification>,
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,
    pub rp_id: Option<String>,
    pub rp_name: Option<String>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Fido2Overrides {
    /// Read overrides from `FIDO2_*` environment variables.
    ///
    /// Unset variables leave the default in place. A variable that is set but
    /// unparsable is an error.
    pub fn from_env() -> Result<Self> {
        let authenticator_attachment = match env_opt("FIDO2_AUTHENTICATOR_ATTACHMENT") {
            None => None,
            Some(v) if v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("null") => {
                Some(None)
            }
            Some(v) => Some(Some(parse_value::<AuthenticatorAttachment>(
                "FIDO2_AUTHENTICATOR_ATTACHMENT",
                &v,
            )?)),
        };

        let crypto_params = env_opt("FIDO2_CRYPTO_PARAMS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse_value::<i64>("FIDO2_CRYPTO_PARAMS", s))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let timeout_ms = env_opt("FIDO2_TIMEOUT")
            .map(|v| {
                parse_timeout_ms(&v).with_context(|| format!("Invalid FIDO2_TIMEOUT: {}", v))
            })
            .transpose()?;

        Ok(Self {
            challenge_size: env_parse("FIDO2_CHALLENGE_SIZE")?,
            attestation: env_parse("FIDO2_ATTESTATION")?,
            crypto_params,
            authenticator_attachment,
            require_resident_key: env_bool("FIDO2_REQUIRE_RESIDENT_KEY")?,
            user_verification: env_parse("FIDO2_USER_VERIFICATION")?,
            timeout_ms,
            rp_id: env_opt("FIDO2_RP_ID"),
            rp_name: env_opt("FIDO2_RP_NAME"),
        })
    }
}

/// Fixed parts of every ceremony's expectations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectationDefaults {
    pub origin: String,
    pub factor: Factor,
}

impl Default for ExpectationDefaults {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            factor: Factor::Either,
        }
    }
}

impl ExpectationDefaults {
    pub fn new(origin: impl Into<String>, factor: Factor) -> Result<Self> {
        let origin = origin.into();
        url::Url::parse(&origin).with_context(|| format!("Invalid origin: {}", origin))?;
        Ok(Self { origin, factor })
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let origin = env_opt("FIDO2_ORIGIN").unwrap_or(defaults.origin);
        let factor = env_parse("FIDO2_FACTOR")?.unwrap_or(defaults.factor);
        Self::new(origin, factor)
    }

    /// Expectations for a ceremony answering `challenge`
    pub fn expect(&self, challenge: impl Into<String>) -> Expectations {
        Expectations {
            challenge: challenge.into(),
            origin: self.origin.clone(),
            factor: self.factor,
            public_key: None,
            prev_counter: None,
            user_handle: None,
        }
    }
}

/// Complete orchestrator configuration, resolved once at startup
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Config {
    pub options: Fido2Options,
    pub expectations: ExpectationDefaults,
}

impl Config {
    /// Merge `overrides` over the defaults and validate the result
    pub fn new(overrides: Fido2Overrides, expectations: ExpectationDefaults) -> Result<Self> {
        let options = Fido2Options::default().merge(overrides);
        options.validate()?;

        info!(
            challenge_size = options.challenge_size,
            attestation = %options.attestation,
            crypto_params = ?options.crypto_params,
            authenticator_attachment = ?options.authenticator_attachment,
            require_resident_key = options.require_resident_key,
            user_verification = %options.user_verification,
            timeout = %format_timeout_ms(options.timeout_ms),
            rp_name = %options.rp_name,
            origin = %expectations.origin,
            factor = %expectations.factor,
            "Resolved FIDO2 ceremony configuration"
        );

        Ok(Self {
            options,
            expectations,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Fido2Overrides::from_env()?, ExpectationDefaults::from_env()?)
    }
}

// Helpers
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Invalid {}: {}", key, raw))
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_opt(key).map(|v| parse_value(key, &v)).transpose()
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match env_opt(key) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(Some(false)),
        Some(v) => bail!("Invalid {}: {} (expected true or false)", key, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "FIDO2_CHALLENGE_SIZE",
        "FIDO2_ATTESTATION",
        "FIDO2_CRYPTO_PARAMS",
        "FIDO2_AUTHENTICATOR_ATTACHMENT",
        "FIDO2_REQUIRE_RESIDENT_KEY",
        "FIDO2_USER_VERIFICATION",
        "FIDO2_TIMEOUT",
        "FIDO2_RP_ID",
        "FIDO2_RP_NAME",
        "FIDO2_ORIGIN",
        "FIDO2_FACTOR",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let options = Fido2Options::default();
        assert_eq!(options.challenge_size, 128);
        assert_eq!(options.attestation, AttestationConveyance::Direct);
        assert_eq!(options.crypto_params, vec![-7, -257]);
        assert_eq!(
            options.authenticator_attachment,
            Some(AuthenticatorAttachment::CrossPlatform)
        );
        assert!(!options.require_resident_key);
        assert_eq!(options.user_verification, UserVerification::Preferred);
        assert_eq!(options.timeout_ms, 60_000);
        assert!(options.validate().is_ok());

        let expectations = ExpectationDefaults::default();
        assert_eq!(expectations.origin, "https://example.com");
        assert_eq!(expectations.factor, Factor::Either);
    }

    #[test]
    fn test_explicit_fields_win() {
        let options = Fido2Options::default().merge(Fido2Overrides {
            challenge_size: Some(64),
            user_verification: Some(UserVerification::Required),
            authenticator_attachment: Some(None),
            ..Default::default()
        });

        assert_eq!(options.challenge_size, 64);
        assert_eq!(options.user_verification, UserVerification::Required);
        assert_eq!(options.authenticator_attachment, None);
        // Untouched fields keep defaults
        assert_eq!(options.attestation, AttestationConveyance::Direct);
        assert_eq!(options.timeout_ms, 60_000);
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides: Fido2Overrides = serde_json::from_str(
            r#"{"challengeSize": 48, "timeout": 30000, "authenticatorAttachment": null,
                "cryptoParams": [-8], "attestation": "none"}"#,
        )
        .unwrap();

        assert_eq!(overrides.challenge_size, Some(48));
        assert_eq!(overrides.timeout_ms, Some(30_000));
        assert_eq!(overrides.authenticator_attachment, Some(None));
        assert_eq!(overrides.crypto_params, Some(vec![-8]));

        let absent: Fido2Overrides = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.authenticator_attachment, None);

        assert!(serde_json::from_str::<Fido2Overrides>(r#"{"challengeSiz": 48}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let small = Fido2Options { challenge_size: 16, ..Default::default() };
        assert!(small.validate().is_err());

        let no_algs = Fido2Options { crypto_params: vec![], ..Default::default() };
        assert!(no_algs.validate().is_err());

        let no_timeout = Fido2Options { timeout_ms: 0, ..Default::default() };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_expectation_defaults_reject_bad_origin() {
        assert!(ExpectationDefaults::new("not a url", Factor::Either).is_err());
        let ok = ExpectationDefaults::new("https://login.example.org", Factor::First).unwrap();

        let e = ok.expect("abc");
        assert_eq!(e.challenge, "abc");
        assert_eq!(e.origin, "https://login.example.org");
        assert_eq!(e.factor, Factor::First);
        assert!(e.public_key.is_none() && e.prev_counter.is_none() && e.user_handle.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("FIDO2_CHALLENGE_SIZE", "64");
        env::set_var("FIDO2_ATTESTATION", "none");
        env::set_var("FIDO2_CRYPTO_PARAMS", "-7, -8");
        env::set_var("FIDO2_AUTHENTICATOR_ATTACHMENT", "none");
        env::set_var("FIDO2_REQUIRE_RESIDENT_KEY", "true");
        env::set_var("FIDO2_USER_VERIFICATION", "required");
        env::set_var("FIDO2_TIMEOUT", "2m");
        env::set_var("FIDO2_RP_ID", "example.org");
        env::set_var("FIDO2_ORIGIN", "https://example.org");
        env::set_var("FIDO2_FACTOR", "first");

        let config = Config::from_env().unwrap();
        assert_eq!(config.options.challenge_size, 64);
        assert_eq!(config.options.attestation, AttestationConveyance::None);
        assert_eq!(config.options.crypto_params, vec![-7, -8]);
        assert_eq!(config.options.authenticator_attachment, None);
        assert!(config.options.require_resident_key);
        assert_eq!(config.options.user_verification, UserVerification::Required);
        assert_eq!(config.options.timeout_ms, 120_000);
        assert_eq!(config.options.rp_id.as_deref(), Some("example.org"));
        assert_eq!(config.options.rp_name, DEFAULT_RP_NAME);
        assert_eq!(config.expectations.origin, "https://example.org");
        assert_eq!(config.expectations.factor, Factor::First);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_values() {
        clear_env();
        env::set_var("FIDO2_USER_VERIFICATION", "sometimes");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("FIDO2_USER_VERIFICATION"));

        clear_env();
        env::set_var("FIDO2_REQUIRE_RESIDENT_KEY", "maybe");
        assert!(Config::from_env().is_err());

        clear_env();
        env::set_var("FIDO2_ORIGIN", "example.com");
        assert!(Config::from_env().is_err());

        clear_env();
        env::set_var("FIDO2_CHALLENGE_SIZE", "8");
        assert!(Config::from_env().is_err());

        clear_env();
        env::set_var("FIDO2_TIMEOUT", "soon");
        assert!(Config::from_env().is_err());

        clear_env();
    }
}
