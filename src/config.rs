//! Binding configuration.
//!
//! [`BridgeConfig`] collects every knob of a [`Bindings`](crate::Bindings)
//! context. [`RunMode`] mirrors the process-wide debug/verbose flags and
//! drives both the log masks and whether synthesis diagnostics are emitted.

use std::env;
use std::path::{Path, PathBuf};

use crate::log::LogLevelFlags;

/// Variable that enables debug mode.
pub const DEBUG_ENV: &str = "GBRIDGE_DEBUG";
/// Variable that enables verbose mode.
pub const VERBOSE_ENV: &str = "GBRIDGE_VERBOSE";
/// Default library search variable.
pub const DEFAULT_SEARCH_VAR: &str = "PATH";

/// Process-wide verbosity mode. The three modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunMode {
    #[default]
    Default,
    Verbose,
    Debug,
}

impl RunMode {
    /// Read the mode from the process environment. Debug wins over verbose.
    pub fn from_env() -> Self {
        Self::from_flags(flag_set(DEBUG_ENV), flag_set(VERBOSE_ENV))
    }

    pub fn from_flags(debug: bool, verbose: bool) -> Self {
        match (debug, verbose) {
            (true, _) => RunMode::Debug,
            (false, true) => RunMode::Verbose,
            (false, false) => RunMode::Default,
        }
    }

    /// Log levels admitted for a domain registered in this mode.
    pub fn mask(self) -> LogLevelFlags {
        match self {
            RunMode::Debug => LogLevelFlags::all(),
            RunMode::Verbose => LogLevelFlags::all() - LogLevelFlags::DEBUG,
            RunMode::Default => {
                LogLevelFlags::all() - LogLevelFlags::INFO - LogLevelFlags::DEBUG
            }
        }
    }

    pub fn is_debug(self) -> bool {
        self == RunMode::Debug
    }
}

fn flag_set(name: &str) -> bool {
    env::var(name).is_ok_and(|value| flag_value_enabled(&value))
}

fn flag_value_enabled(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Configuration of a binding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub run_mode: RunMode,
    /// Directory holding the native shared libraries, if bundled.
    pub library_dir: Option<PathBuf>,
    /// Environment variable the loader searches for libraries.
    pub search_var: String,
    /// Synthesize accessors as soon as a module is installed.
    pub eager_synthesis: bool,
    /// Register the well-known log domains on initialization.
    pub register_default_domains: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Default,
            library_dir: None,
            search_var: DEFAULT_SEARCH_VAR.to_string(),
            eager_synthesis: true,
            register_default_domains: true,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with the run mode taken from the environment.
    pub fn from_env() -> Self {
        Self::default().with_run_mode(RunMode::from_env())
    }

    pub fn with_run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn with_library_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.library_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_search_var(mut self, name: impl Into<String>) -> Self {
        self.search_var = name.into();
        self
    }

    pub fn with_eager_synthesis(mut self, eager: bool) -> Self {
        self.eager_synthesis = eager;
        self
    }

    pub fn with_default_domains(mut self, register: bool) -> Self {
        self.register_default_domains = register;
        self
    }
}
