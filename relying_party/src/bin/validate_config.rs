// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration validation tool for the FIDO2 ceremony component
//!
//! Resolves the `FIDO2_*` environment the same way the library does and
//! reports every setting, so misconfiguration shows up before the first
//! ceremony fails.
//!
//! # Usage
//!
//! ```bash
//! source .env && fidobridge-validate-config
//! ```

use fidobridge_common::duration::format_timeout_ms;
use fidobridge_rp::config::{ExpectationDefaults, Fido2Options, Fido2Overrides};
use fidobridge_rp::engine::Factor;

/// Validation result for a single check
#[derive(Debug)]
enum CheckResult {
    Ok(String),
    Warning(String),
    Error(String),
}

impl CheckResult {
    fn is_error(&self) -> bool {
        matches!(self, CheckResult::Error(_))
    }
}

struct ValidationSection {
    name: String,
    checks: Vec<CheckResult>,
}

impl ValidationSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn add(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    fn has_errors(&self) -> bool {
        self.checks.iter().any(|c| c.is_error())
    }

    fn print(&self) {
        println!("\n{}", self.name);
        println!("{}", "─".repeat(self.name.chars().count()));
        for check in &self.checks {
            match check {
                CheckResult::Ok(msg) => println!("  ✓ {}", msg),
                CheckResult::Warning(msg) => println!("  ⚠ {}", msg),
                CheckResult::Error(msg) => println!("  ✗ {}", msg),
            }
        }
    }
}

fn main() {
    fidobridge_common::logging::init("warn");

    println!("FIDO2 Ceremony Configuration Validator");
    println!("======================================");

    let sections = [validate_options(), validate_expectations()];

    let mut has_errors = false;
    for section in &sections {
        section.print();
        has_errors |= section.has_errors();
    }

    println!("\n======================================");
    if has_errors {
        println!("Configuration has errors. Fix them before starting the service.");
        std::process::exit(1);
    }
    println!("Configuration is valid.");
}

fn validate_options() -> ValidationSection {
    let mut section = ValidationSection::new("Ceremony Options");

    let overrides = match Fido2Overrides::from_env() {
        Ok(o) => o,
        Err(e) => {
            section.add(CheckResult::Error(format!("{:#}", e)));
            return section;
        }
    };
    let options = Fido2Options::default().merge(overrides);

    section.add(CheckResult::Ok(format!("Challenge size: {} bytes", options.challenge_size)));
    section.add(CheckResult::Ok(format!("Attestation: {}", options.attestation)));
    section.add(CheckResult::Ok(format!("Algorithms: {:?}", options.crypto_params)));
    section.add(CheckResult::Ok(format!(
        "Authenticator attachment: {}",
        options
            .authenticator_attachment
            .map(|a| a.to_string())
            .unwrap_or_else(|| "any".to_string())
    )));
    section.add(CheckResult::Ok(format!(
        "Resident key required: {}",
        options.require_resident_key
    )));
    section.add(CheckResult::Ok(format!(
        "User verification: {}",
        options.user_verification
    )));
    section.add(CheckResult::Ok(format!(
        "Timeout: {} ({} ms)",
        format_timeout_ms(options.timeout_ms),
        options.timeout_ms
    )));

    match &options.rp_id {
        Some(id) => section.add(CheckResult::Ok(format!("RP ID: {}", id))),
        None => section.add(CheckResult::Warning(
            "FIDO2_RP_ID not set; browsers will use the page's effective domain".to_string(),
        )),
    }
    section.add(CheckResult::Ok(format!("RP name: {}", options.rp_name)));

    if let Err(e) = options.validate() {
        section.add(CheckResult::Error(e.to_string()));
    }
    if options.timeout_ms < 10_000 {
        section.add(CheckResult::Warning(
            "Timeouts under 10s are often too short for roaming authenticators".to_string(),
        ));
    }

    section
}

fn validate_expectations() -> ValidationSection {
    let mut section = ValidationSection::new("Ceremony Expectations");

    match ExpectationDefaults::from_env() {
        Ok(defaults) => {
            section.add(CheckResult::Ok(format!("Origin: {}", defaults.origin)));
            if defaults.origin.starts_with("http://") {
                section.add(CheckResult::Warning(
                    "Origin is not HTTPS; browsers only allow this for localhost".to_string(),
                ));
            }
            if std::env::var("FIDO2_ORIGIN").is_err() {
                section.add(CheckResult::Warning(
                    "FIDO2_ORIGIN not set; using the placeholder default".to_string(),
                ));
            }
            section.add(CheckResult::Ok(format!("Factor: {}", defaults.factor)));
            if defaults.factor == Factor::Second {
                section.add(CheckResult::Warning(
                    "Factor 'second' accepts presence without user verification".to_string(),
                ));
            }
        }
        Err(e) => section.add(CheckResult::Error(format!("{:#}", e))),
    }

    section
}
