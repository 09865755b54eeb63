//! Logging domain registrar.
//!
//! Native libraries log through named domains. Each domain gets a handler
//! whose level mask is derived from the process [`RunMode`]; messages whose
//! level is outside the mask are dropped before reaching the sink.
//!
//! The registrar is process-wide state. [`initialize`] installs it exactly
//! once from the process entry point, and every other function here reads it.
//!
//! # Example
//!
//! ```
//! use gbridge::config::{BridgeConfig, RunMode};
//! use gbridge::log::{LogLevel, LogRegistrar, TracingSink};
//!
//! let mut registrar = LogRegistrar::new(RunMode::Default, TracingSink::new());
//! registrar.register_domain(Some("GLib")).unwrap();
//! assert!(registrar.admits(Some("GLib"), LogLevel::Warning));
//! assert!(!registrar.admits(Some("GLib"), LogLevel::Debug));
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::{BridgeConfig, RunMode};

/// Domain used by the binding's own helpers.
pub const BINDING_DOMAIN: &str = "GBridge";

/// Domains registered at initialization. `None` is the unnamed default domain.
pub const WELL_KNOWN_DOMAINS: &[Option<&str>] = &[
    None,
    Some("GLib"),
    Some("GLib-GObject"),
    Some("GThread"),
    Some("GModule"),
];

bitflags! {
    /// Level mask of a log handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LogLevelFlags: u32 {
        const RECURSION = 1 << 0;
        const FATAL     = 1 << 1;
        const ERROR     = 1 << 2;
        const CRITICAL  = 1 << 3;
        const WARNING   = 1 << 4;
        const MESSAGE   = 1 << 5;
        const INFO      = 1 << 6;
        const DEBUG     = 1 << 7;
    }
}

/// A single log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum LogLevel {
    Error = 1 << 2,
    Critical = 1 << 3,
    Warning = 1 << 4,
    Message = 1 << 5,
    Info = 1 << 6,
    Debug = 1 << 7,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Warning,
        LogLevel::Message,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Warning => "WARNING",
            LogLevel::Message => "MESSAGE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn flag(self) -> LogLevelFlags {
        LogLevelFlags::from_bits_truncate(self.into())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the logging registrar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("logging is already initialized")]
    AlreadyInitialized,

    #[error("logging is not initialized")]
    NotInitialized,

    /// The native handler mechanism refused a request.
    #[error("log sink failed for domain {domain:?}: {message}")]
    Sink {
        domain: Option<String>,
        message: String,
    },

    #[error("log registrar lock poisoned")]
    Poisoned,
}

impl<'a, T> From<PoisonError<MutexGuard<'a, T>>> for LogError {
    fn from(_: PoisonError<MutexGuard<'a, T>>) -> Self {
        LogError::Poisoned
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Handle of an installed native handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u32);

/// The native log handler mechanism.
pub trait LogSink: Send {
    /// Install a handler for `domain` admitting `mask`.
    fn set_handler(
        &mut self,
        domain: Option<&str>,
        mask: LogLevelFlags,
    ) -> Result<HandlerId, LogError>;

    /// Remove a previously installed handler.
    fn remove_handler(&mut self, domain: Option<&str>, id: HandlerId) -> Result<(), LogError>;

    /// Deliver a message that passed the domain's mask.
    fn write(&self, domain: Option<&str>, level: LogLevel, message: &str);
}

/// Sink that forwards every delivered message to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink {
    next_id: u32,
    handlers: FxHashMap<Option<String>, HandlerId>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl LogSink for TracingSink {
    fn set_handler(
        &mut self,
        domain: Option<&str>,
        _mask: LogLevelFlags,
    ) -> Result<HandlerId, LogError> {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.insert(domain.map(str::to_string), id);
        Ok(id)
    }

    fn remove_handler(&mut self, domain: Option<&str>, id: HandlerId) -> Result<(), LogError> {
        let key = domain.map(str::to_string);
        match self.handlers.get(&key) {
            Some(&current) if current == id => {
                self.handlers.remove(&key);
                Ok(())
            }
            _ => Err(LogError::Sink {
                domain: key,
                message: format!("no handler {}", id.0),
            }),
        }
    }

    fn write(&self, domain: Option<&str>, level: LogLevel, message: &str) {
        forward_to_tracing(domain, level, message);
    }
}

fn forward_to_tracing(domain: Option<&str>, level: LogLevel, message: &str) {
    let domain = domain.unwrap_or("");
    match level {
        LogLevel::Error | LogLevel::Critical => {
            tracing::error!(domain, level = level.name(), "{message}")
        }
        LogLevel::Warning => tracing::warn!(domain, level = level.name(), "{message}"),
        LogLevel::Message | LogLevel::Info => {
            tracing::info!(domain, level = level.name(), "{message}")
        }
        LogLevel::Debug => tracing::debug!(domain, level = level.name(), "{message}"),
    }
}

// ============================================================================
// Registrar
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct RegisteredDomain {
    mask: LogLevelFlags,
    handler: HandlerId,
}

/// Maps log domains to level masks and owns the native handlers.
pub struct LogRegistrar {
    mode: RunMode,
    sink: Box<dyn LogSink>,
    domains: FxHashMap<Option<String>, RegisteredDomain>,
}

impl LogRegistrar {
    pub fn new(mode: RunMode, sink: impl LogSink + 'static) -> Self {
        Self {
            mode,
            sink: Box::new(sink),
            domains: FxHashMap::default(),
        }
    }

    pub fn run_mode(&self) -> RunMode {
        self.mode
    }

    /// Change the mode used by subsequent registrations.
    pub fn set_run_mode(&mut self, mode: RunMode) {
        self.mode = mode;
    }

    /// Install a handler for `domain` with the current mode's mask.
    ///
    /// Re-registering a domain replaces its handler and mask. If the old
    /// handler cannot be removed the registration is left untouched; if the
    /// new one cannot be installed the domain is no longer registered.
    pub fn register_domain(&mut self, domain: Option<&str>) -> Result<LogLevelFlags, LogError> {
        let key = domain.map(str::to_string);
        if let Some(previous) = self.domains.get(&key).copied() {
            self.sink.remove_handler(domain, previous.handler)?;
            self.domains.remove(&key);
        }

        let mask = self.mode.mask();
        let handler = self.sink.set_handler(domain, mask)?;
        self.domains.insert(key, RegisteredDomain { mask, handler });
        tracing::debug!(domain = domain.unwrap_or(""), mask = mask.bits(), "registered log domain");
        Ok(mask)
    }

    /// Register every well-known domain.
    pub fn register_well_known(&mut self) -> Result<(), LogError> {
        for domain in WELL_KNOWN_DOMAINS {
            self.register_domain(*domain)?;
        }
        Ok(())
    }

    /// Mask of a registered domain.
    pub fn mask(&self, domain: Option<&str>) -> Option<LogLevelFlags> {
        self.domains
            .get(&domain.map(str::to_string))
            .map(|registered| registered.mask)
    }

    pub fn domains(&self) -> impl Iterator<Item = Option<&str>> {
        self.domains.keys().map(|key| key.as_deref())
    }

    /// Check whether a message would be delivered.
    ///
    /// Unregistered domains fall back to the unnamed default domain.
    pub fn admits(&self, domain: Option<&str>, level: LogLevel) -> bool {
        self.mask(domain)
            .or_else(|| self.mask(None))
            .is_some_and(|mask| mask.contains(level.flag()))
    }

    /// Deliver a message to the sink if the domain admits its level.
    pub fn log(&self, domain: Option<&str>, level: LogLevel, message: &str) -> bool {
        let admitted = self.admits(domain, level);
        if admitted {
            self.sink.write(domain, level, message);
        }
        admitted
    }
}

impl fmt::Debug for LogRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRegistrar")
            .field("mode", &self.mode)
            .field("domains", &self.domains)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Process-wide state
// ============================================================================

static REGISTRAR: OnceLock<Mutex<LogRegistrar>> = OnceLock::new();

/// Install the process-wide registrar.
///
/// Registers the well-known domains when the configuration asks for it. Any
/// failure here is fatal for the caller: the domains are assumed to exist
/// everywhere downstream.
///
/// # Errors
///
/// - `AlreadyInitialized` on the second call
/// - `Sink` if a handler could not be installed
pub fn initialize(config: &BridgeConfig, sink: impl LogSink + 'static) -> Result<(), LogError> {
    if REGISTRAR.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let mut registrar = LogRegistrar::new(config.run_mode, sink);
    if config.register_default_domains {
        registrar.register_well_known()?;
    }

    REGISTRAR
        .set(Mutex::new(registrar))
        .map_err(|_| LogError::AlreadyInitialized)
}

pub fn is_initialized() -> bool {
    REGISTRAR.get().is_some()
}

/// Run `f` against the process-wide registrar.
pub fn with_registrar<R>(f: impl FnOnce(&mut LogRegistrar) -> R) -> Result<R, LogError> {
    let registrar = REGISTRAR.get().ok_or(LogError::NotInitialized)?;
    let mut guard = registrar.lock()?;
    Ok(f(&mut guard))
}

/// Register (or re-register) a domain on the process-wide registrar.
pub fn register_domain(domain: Option<&str>) -> Result<LogLevelFlags, LogError> {
    with_registrar(|registrar| registrar.register_domain(domain))?
}

/// Log through the process-wide registrar.
///
/// Before initialization the message goes straight to `tracing`.
pub fn log(domain: Option<&str>, level: LogLevel, message: &str) {
    if with_registrar(|registrar| registrar.log(domain, level, message)).is_err() {
        forward_to_tracing(domain, level, message);
    }
}

#[track_caller]
fn log_located(level: LogLevel, message: &str) {
    let location = Location::caller();
    let message = format!("{}:{}: {}", location.file(), location.line(), message);
    log(Some(BINDING_DOMAIN), level, &message);
}

#[track_caller]
pub fn error(message: &str) {
    log_located(LogLevel::Error, message);
}

#[track_caller]
pub fn critical(message: &str) {
    log_located(LogLevel::Critical, message);
}

#[track_caller]
pub fn warning(message: &str) {
    log_located(LogLevel::Warning, message);
}

#[track_caller]
pub fn message(message: &str) {
    log_located(LogLevel::Message, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_test::traced_test;

    /// Sink that records handler calls.
    #[derive(Debug, Default, Clone)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<String>>>,
        fail_domain: Option<&'static str>,
        fail_remove: bool,
        max_handlers: Option<usize>,
    }

    impl LogSink for RecordingSink {
        fn set_handler(
            &mut self,
            domain: Option<&str>,
            mask: LogLevelFlags,
        ) -> Result<HandlerId, LogError> {
            let mut calls = self.calls.lock().unwrap();
            let full = self.max_handlers.is_some_and(|max| calls.len() >= max);
            if full || (domain.is_some() && domain == self.fail_domain) {
                return Err(LogError::Sink {
                    domain: domain.map(str::to_string),
                    message: "refused".into(),
                });
            }
            calls.push(format!("set {:?} {:#x}", domain, mask.bits()));
            Ok(HandlerId(calls.len() as u32))
        }

        fn remove_handler(&mut self, domain: Option<&str>, id: HandlerId) -> Result<(), LogError> {
            if self.fail_remove {
                return Err(LogError::Sink {
                    domain: domain.map(str::to_string),
                    message: "handler busy".into(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("remove {:?} {}", domain, id.0));
            Ok(())
        }

        fn write(&self, domain: Option<&str>, level: LogLevel, message: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("write {:?} {} {}", domain, level, message));
        }
    }

    #[test]
    fn level_values_match_flags() {
        for level in LogLevel::ALL {
            assert_eq!(u32::from(level), level.flag().bits());
        }
        assert_eq!(LogLevel::try_from(16u32).unwrap(), LogLevel::Warning);
        assert!(LogLevel::try_from(3u32).is_err());
        assert_eq!(LogLevel::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn debug_mode_admits_everything() {
        let mut registrar = LogRegistrar::new(RunMode::Debug, TracingSink::new());
        let mask = registrar.register_domain(Some("GLib")).unwrap();
        assert_eq!(mask, LogLevelFlags::all());
        assert!(registrar.admits(Some("GLib"), LogLevel::Debug));
    }

    #[test]
    fn verbose_mode_excludes_debug() {
        let mut registrar = LogRegistrar::new(RunMode::Verbose, TracingSink::new());
        registrar.register_domain(None).unwrap();
        assert!(registrar.admits(None, LogLevel::Info));
        assert!(!registrar.admits(None, LogLevel::Debug));
    }

    #[test]
    fn reregistration_overwrites() {
        let sink = RecordingSink::default();
        let calls = Arc::clone(&sink.calls);
        let mut registrar = LogRegistrar::new(RunMode::Debug, sink);

        registrar.register_domain(Some("GThread")).unwrap();
        registrar.set_run_mode(RunMode::Default);
        registrar.register_domain(Some("GThread")).unwrap();

        assert_eq!(registrar.mask(Some("GThread")).unwrap().bits(), 0x3F);
        assert_eq!(registrar.domains().count(), 1);
        assert_eq!(
            *calls.lock().unwrap(),
            [
                "set Some(\"GThread\") 0xff",
                "remove Some(\"GThread\") 1",
                "set Some(\"GThread\") 0x3f",
            ]
        );
    }

    #[test]
    fn well_known_domains() {
        let mut registrar = LogRegistrar::new(RunMode::Default, TracingSink::new());
        registrar.register_well_known().unwrap();
        for domain in WELL_KNOWN_DOMAINS {
            assert_eq!(registrar.mask(*domain).unwrap().bits(), 0x3F);
        }
    }

    #[test]
    fn sink_failure_is_returned() {
        let sink = RecordingSink {
            fail_domain: Some("GModule"),
            ..Default::default()
        };
        let mut registrar = LogRegistrar::new(RunMode::Default, sink);
        let err = registrar.register_well_known().unwrap_err();
        assert!(matches!(err, LogError::Sink { .. }));
    }

    #[test]
    fn failed_removal_keeps_registration() {
        let sink = RecordingSink {
            fail_remove: true,
            ..Default::default()
        };
        let mut registrar = LogRegistrar::new(RunMode::Debug, sink);
        registrar.register_domain(Some("GThread")).unwrap();

        registrar.set_run_mode(RunMode::Default);
        let err = registrar.register_domain(Some("GThread")).unwrap_err();
        assert!(matches!(err, LogError::Sink { .. }));
        assert_eq!(registrar.mask(Some("GThread")), Some(LogLevelFlags::all()));
        assert!(registrar.admits(Some("GThread"), LogLevel::Debug));
    }

    #[test]
    fn failed_reinstall_drops_registration() {
        // Refuses once the first handler and its removal are recorded
        let sink = RecordingSink {
            max_handlers: Some(2),
            ..Default::default()
        };
        let calls = Arc::clone(&sink.calls);
        let mut registrar = LogRegistrar::new(RunMode::Debug, sink);
        registrar.register_domain(Some("GThread")).unwrap();

        assert!(registrar.register_domain(Some("GThread")).is_err());
        assert_eq!(registrar.mask(Some("GThread")), None);
        assert_eq!(registrar.domains().count(), 0);
        assert_eq!(
            *calls.lock().unwrap(),
            ["set Some(\"GThread\") 0xff", "remove Some(\"GThread\") 1"]
        );
    }

    #[test]
    fn unregistered_domain_uses_default_mask() {
        let sink = RecordingSink::default();
        let calls = Arc::clone(&sink.calls);
        let mut registrar = LogRegistrar::new(RunMode::Default, sink);
        assert!(!registrar.log(Some("Gtk"), LogLevel::Warning, "dropped"));

        registrar.register_domain(None).unwrap();
        assert!(registrar.log(Some("Gtk"), LogLevel::Warning, "kept"));
        assert!(!registrar.log(Some("Gtk"), LogLevel::Debug, "filtered"));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.last().unwrap(), "write Some(\"Gtk\") WARNING kept");
    }

    #[test]
    fn tracing_sink_rejects_stale_handler() {
        let mut sink = TracingSink::new();
        let first = sink.set_handler(Some("GLib"), LogLevelFlags::all()).unwrap();
        let second = sink.set_handler(Some("GLib"), LogLevelFlags::all()).unwrap();
        assert!(sink.remove_handler(Some("GLib"), first).is_err());
        sink.remove_handler(Some("GLib"), second).unwrap();
        assert_eq!(sink.handler_count(), 0);
    }

    #[test]
    #[traced_test]
    fn tracing_sink_forwards_messages() {
        let mut registrar = LogRegistrar::new(RunMode::Default, TracingSink::new());
        registrar.register_domain(Some("GLib-GObject")).unwrap();
        registrar.log(Some("GLib-GObject"), LogLevel::Critical, "instance has no handler");
        assert!(logs_contain("instance has no handler"));
        assert!(logs_contain("CRITICAL"));
    }
}
