//! Native library locator.
//!
//! Before the native libraries load, a bundled library directory is put in
//! front of the loader's search variable (`PATH` on Windows).

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

/// Variable searched for DLLs.
pub const DLL_SEARCH_VAR: &str = "PATH";

/// Access to environment variables.
pub trait Environment {
    fn var(&self, name: &str) -> Option<OsString>;
    fn set_var(&mut self, name: &str, value: &OsStr);
}

/// The real process environment.
///
/// Writes go through [`std::env::set_var`], so they must happen before any
/// other thread is started, normally from the process entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<OsString> {
        env::var_os(name)
    }

    fn set_var(&mut self, name: &str, value: &OsStr) {
        // SAFETY: only called during single-threaded process setup.
        unsafe { env::set_var(name, value) }
    }
}

/// An environment held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnvironment {
    vars: FxHashMap<String, OsString>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }
}

impl Environment for MemoryEnvironment {
    fn var(&self, name: &str) -> Option<OsString> {
        self.vars.get(name).cloned()
    }

    fn set_var(&mut self, name: &str, value: &OsStr) {
        self.vars.insert(name.to_string(), value.to_os_string());
    }
}

/// Directory of libraries bundled under `base`.
pub fn vendor_bin_dir(base: &Path) -> PathBuf {
    base.join("vendor").join("local").join("bin")
}

#[cfg(windows)]
fn native_form(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace('/', "\\"))
}

#[cfg(not(windows))]
fn native_form(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Put `path` in front of the search list stored in `name`.
///
/// Nothing happens if `path` does not exist or is already listed. Returns
/// whether the variable was rewritten.
pub fn prepend_path_to_environment_variable(
    env: &mut dyn Environment,
    path: &Path,
    name: &str,
) -> bool {
    if !path.exists() {
        return false;
    }

    let dir = native_form(path);
    let current = env.var(name).unwrap_or_default();
    let mut paths: Vec<PathBuf> = env::split_paths(&current)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    if paths.contains(&dir) {
        return false;
    }
    paths.insert(0, dir);

    match env::join_paths(&paths) {
        Ok(joined) => {
            env.set_var(name, &joined);
            tracing::debug!(var = name, dir = %path.display(), "prepended library directory");
            true
        }
        Err(err) => {
            tracing::warn!(var = name, dir = %path.display(), "cannot extend search path: {err}");
            false
        }
    }
}

/// Put `path` in front of `PATH`.
pub fn prepend_dll_path(env: &mut dyn Environment, path: &Path) -> bool {
    prepend_path_to_environment_variable(env, path, DLL_SEARCH_VAR)
}
