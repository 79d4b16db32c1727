// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relying-party side of WebAuthn registration and login.
//!
//! This crate sits between an application backend and a FIDO2 verification
//! library. It builds ceremony options, moves credential ids, challenges and
//! user handles across the binary/text boundary, and reduces verification
//! results to the record the application has to store.
//!
//! Cryptography is delegated to an implementation of
//! [`engine::VerificationEngine`]; storage and transport stay with the caller.

pub mod ceremony;
pub mod config;
pub mod engine;
pub mod error;

pub use ceremony::Fido2Component;
pub use config::{Config, ExpectationDefaults, Fido2Options, Fido2Overrides};
pub use error::{Fido2Error, Result, VerificationError};
