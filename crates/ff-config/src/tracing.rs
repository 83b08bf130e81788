// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const ENV_CHROME: &str = "FASTFOOD_TRACE_CHROME";
const DEFAULT_FILTER: &str = "info";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: Mutex<Option<tracing_chrome::FlushGuard>> = Mutex::new(None);

/// Subscriber settings, normally read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    /// Chrome trace output covering every fit and transform span.
    pub chrome_trace: Option<PathBuf>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            chrome_trace: None,
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Result<Self, InitError> {
        match std::env::var(ENV_CHROME) {
            Ok(raw) => Ok(Self::with_chrome_path(&raw)),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(err) => Err(InitError::Env(err)),
        }
    }

    fn with_chrome_path(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            chrome_trace: (!trimmed.is_empty()).then(|| PathBuf::from(trimmed)),
            ..Self::default()
        }
    }
}

/// Installs the global subscriber from the environment.
pub fn init_tracing() -> Result<(), InitError> {
    init_tracing_with(&TracingConfig::from_env()?)
}

/// Installs a stderr `fmt` layer filtered by `RUST_LOG`, plus a Chrome trace
/// layer when configured. Only the first successful call has an effect.
pub fn init_tracing_with(config: &TracingConfig) -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    let chrome_layer = config.chrome_trace.as_ref().map(|path| {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .file(path)
            .include_args(true)
            .build();
        if let Ok(mut slot) = CHROME_GUARD.lock() {
            *slot = Some(guard);
        }
        layer
    });

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))
}

/// Like [`init_tracing`], but a second call is not an error.
pub fn ensure_initialised() -> Result<(), InitError> {
    match init_tracing() {
        Ok(()) | Err(InitError::AlreadyInitialised) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Flushes and closes the Chrome trace file, if one is open.
pub fn flush_chrome_trace() {
    if let Ok(mut slot) = CHROME_GUARD.lock() {
        slot.take();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read FASTFOOD_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("another global subscriber is installed: {0}")]
    Subscriber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_chrome_path_disables_the_layer() {
        assert_eq!(TracingConfig::with_chrome_path("  "), TracingConfig::default());
        assert_eq!(
            TracingConfig::with_chrome_path(" trace.json ").chrome_trace,
            Some(PathBuf::from("trace.json"))
        );
    }

    #[test]
    fn second_initialisation_is_reported() {
        ensure_initialised().unwrap();
        assert!(matches!(
            init_tracing_with(&TracingConfig::default()),
            Err(InitError::AlreadyInitialised)
        ));
        ensure_initialised().unwrap();
    }
}
