// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Shared pieces of the FIDO2 ceremony bridge: the binary/text codec, the
//! wire types exchanged with browsers and relying-party backends, timeout
//! parsing, and logging setup.

pub mod api;
pub mod codec;
pub mod duration;

pub use codec::EncodingError;

pub mod logging {
    use std::sync::Once;
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{fmt, EnvFilter};

    static INIT: Once = Once::new();

    /// Output format selected by `LOG_FORMAT`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum LogFormat {
        #[default]
        Plain,
        Json,
    }

    impl LogFormat {
        /// Anything other than "json" (case-insensitive) means plain.
        pub fn parse(value: Option<&str>) -> Self {
            match value {
                Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Plain,
            }
        }

        pub fn from_env() -> Self {
            Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
        }
    }

    /// Initialize global tracing subscriber with env-driven config.
    ///
    /// Env:
    /// - RUST_LOG   (e.g., "info,fidobridge_rp=debug")
    /// - LOG_FORMAT ("plain" [default] | "json")
    ///
    /// `default_filter` is used if RUST_LOG is unset. Only the first call has
    /// any effect.
    pub fn init(default_filter: &str) {
        INIT.call_once(|| {
            let env_filter = EnvFilter::try_from_env("RUST_LOG")
                .or_else(|_| EnvFilter::try_new(default_filter))
                .unwrap_or_else(|_| {
                    EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into())
                });

            let builder = fmt()
                .with_env_filter(env_filter)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .with_target(true);

            match LogFormat::from_env() {
                LogFormat::Json => builder.json().with_ansi(false).init(),
                LogFormat::Plain => builder.with_ansi(cfg!(unix)).init(),
            }

            tracing::info!(format = ?LogFormat::from_env(), "logging initialized");
        });
    }

}
