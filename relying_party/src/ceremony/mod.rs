// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WebAuthn ceremony orchestration
//!
//! [`Fido2Component`] drives both ceremonies against an injected
//! [`VerificationEngine`]:
//!
//! - Registration: [`begin_registration`](Fido2Component::begin_registration)
//!   then [`check_registration`](Fido2Component::check_registration)
//! - Login: [`begin_login`](Fido2Component::begin_login),
//!   [`extract_login_user_id`](Fido2Component::extract_login_user_id), then
//!   [`check_login`](Fido2Component::check_login)
//!
//! The component is stateless between calls. Persisting the issued challenge
//! and the returned [`CredentialSummary`](fidobridge_common::api::CredentialSummary)
//! between the two steps of a ceremony is the caller's job.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use fidobridge_common::api::User;
//! # use fidobridge_rp::{Config, Fido2Component, engine::VerificationEngine};
//! # async fn demo(engine: Arc<dyn VerificationEngine>) -> fidobridge_rp::Result<()> {
//! let component = Fido2Component::new(engine, Config::default());
//!
//! let user = User {
//!     id: "u1".to_string(),
//!     name: "alice".to_string(),
//!     display_name: "Alice".to_string(),
//! };
//! let options = component.begin_registration(&user).await?;
//! // store options.challenge, send options to the browser ...
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::engine::VerificationEngine;

mod login;
mod registration;

/// Ceremony orchestrator. Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct Fido2Component {
    engine: Arc<dyn VerificationEngine>,
    config: Arc<Config>,
}

impl Fido2Component {
    pub fn new(engine: Arc<dyn VerificationEngine>, config: Config) -> Self {
        info!(
            origin = %config.expectations.origin,
            rp_name = %config.options.rp_name,
            "Initialized FIDO2 ceremony component"
        );

        Self {
            engine,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
