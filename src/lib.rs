//! Runtime core for binding GObject-style native libraries into a dynamic
//! host.
//!
//! - [`bindings`]: the [`Bindings`] context and the [`NativeModule`] trait
//! - [`class`]: per-type dispatch tables
//! - [`synth`]: `set_x` to `x=` accessor synthesis
//! - [`signal`]: signal handlers with the emitting instance as receiver
//! - [`log`]: logging domain registration
//! - [`locator`]: native library search path setup
//!
//! Type identity, host values and the enum/flags codec live in
//! `gbridge-core`; the type hierarchy and codec registry in
//! `gbridge-registry`; [`prelude`] re-exports both.

pub mod bindings;
pub mod caps;
pub mod class;
pub mod config;
pub mod fatal;
pub mod locator;
pub mod log;
pub mod rgba;
pub mod signal;
pub mod synth;
pub mod version;

pub use bindings::{Bindings, BindingsError, NativeModule};
pub use config::{BridgeConfig, RunMode};

pub mod prelude {
    pub use crate::bindings::*;
    pub use crate::caps::{Caps, Structure};
    pub use crate::class::{ClassRegistry, ClassTable, MemberScope, MemberTable};
    pub use crate::config::{BridgeConfig, RunMode};
    pub use crate::fatal::{exit_application, format_fatal};
    pub use crate::locator::{
        Environment, MemoryEnvironment, ProcessEnvironment, prepend_dll_path,
        prepend_path_to_environment_variable,
    };
    pub use crate::log::{LogError, LogLevel, LogLevelFlags, LogRegistrar, LogSink, TracingSink};
    pub use crate::rgba::Rgba;
    pub use crate::signal::{SignalBinding, SignalBridge, SignalCallback, SignalTable};
    pub use crate::synth::{AccessorSynthesizer, SkipReason, SynthesisReport};
    pub use crate::version::{BINDING_VERSION, check_binding_version};
    pub use gbridge_core::*;
    pub use gbridge_registry::{
        CodecRegistry, EncodedValue, TypeDescriptor, TypeHierarchy, TypeKind, TypeRegistry,
    };
}
