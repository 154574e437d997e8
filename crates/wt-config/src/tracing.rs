// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Global subscriber bootstrap for binaries and long-running evaluations.

use std::ffi::OsStr;
use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer, Registry};

pub const CHROME_TRACE_VAR: &str = "WTVAE_TRACE_CHROME";

/// Subscriber settings resolved before installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingOptions {
    /// Directive used when `RUST_LOG` is absent or invalid.
    pub default_filter: String,
    /// Destination of a Chrome trace covering every span.
    pub chrome_trace: Option<PathBuf>,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            chrome_trace: None,
        }
    }
}

impl TracingOptions {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::var_os(CHROME_TRACE_VAR).as_deref())
    }

    /// Builds options from the raw `WTVAE_TRACE_CHROME` value. An empty value
    /// disables the Chrome trace.
    pub fn from_vars(chrome_trace: Option<&OsStr>) -> Self {
        Self {
            chrome_trace: chrome_trace
                .filter(|raw| !raw.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }
}

/// Keeps the Chrome trace writer alive. Dropping it flushes the trace file.
#[must_use = "dropping the guard immediately truncates the Chrome trace"]
#[derive(Default)]
pub struct TracingGuard {
    chrome: Option<FlushGuard>,
}

impl TracingGuard {
    pub fn has_chrome_trace(&self) -> bool {
        self.chrome.is_some()
    }
}

/// Installs the subscriber described by [`TracingOptions::from_env`].
pub fn init_tracing() -> Result<TracingGuard, InitError> {
    init_tracing_with(TracingOptions::from_env())
}

/// Installs a registry with an `EnvFilter`, a stderr formatter and, when
/// requested, a Chrome trace layer.
pub fn init_tracing_with(options: TracingOptions) -> Result<TracingGuard, InitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))
        .map_err(|err| InitError::Filter(err.to_string()))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true);

    let (chrome_layer, chrome) = match options.chrome_trace {
        Some(path) => {
            let (layer, guard) = ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(chrome_layer)
        .with(fmt_layer.with_filter(filter))
        .try_init()?;
    Ok(TracingGuard { chrome })
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid tracing filter: {0}")]
    Filter(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}
