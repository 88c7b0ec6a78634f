//! Environment configuration surface.
//!
//! Three variables, all optional:
//! - `TYPEWIRE_SERIALIZER_STRATEGY`: `deep` | `shallow` | `none`
//! - `TYPEWIRE_PROTO_DIR`: directory for emitted schema files
//! - `TYPEWIRE_SKIP_GENERATION`: `true` to reuse existing schema files
//!
//! Reading happens once at the call site that needs the value; nothing in
//! this crate caches or mutates process environment.

use std::str::FromStr;

use tracing::warn;
use typewire_core::convert::{EncodeOptions, SerializerStrategy};

pub const SERIALIZER_STRATEGY_ENV: &str = "TYPEWIRE_SERIALIZER_STRATEGY";
pub const PROTO_DIR_ENV: &str = "TYPEWIRE_PROTO_DIR";
pub const SKIP_GENERATION_ENV: &str = "TYPEWIRE_SKIP_GENERATION";

/// Serializer strategy from the environment, defaulting to deep.
///
/// An unparseable value logs a warning and falls back to the default
/// rather than failing startup.
pub fn encode_options_from_env() -> EncodeOptions {
    let strategy = match std::env::var(SERIALIZER_STRATEGY_ENV) {
        Ok(raw) => parse_strategy(&raw),
        Err(_) => SerializerStrategy::default(),
    };
    EncodeOptions::new(strategy)
}

fn parse_strategy(raw: &str) -> SerializerStrategy {
    match SerializerStrategy::from_str(raw) {
        Ok(strategy) => strategy,
        Err(error) => {
            warn!(value = raw, %error, "invalid serializer strategy, using default");
            SerializerStrategy::default()
        }
    }
}

/// Whether schema file generation should be skipped when a file already
/// exists. Only the exact value `true` (case-insensitive) enables the skip.
pub fn skip_generation() -> bool {
    std::env::var(SKIP_GENERATION_ENV)
        .map(|v| parse_skip(&v))
        .unwrap_or(false)
}

fn parse_skip(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}
