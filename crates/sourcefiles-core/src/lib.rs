#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

//! Module graph resolution and content-addressed import rewriting.
//!
//! Given a package specifier and a project root, the engine produces an
//! import map (specifier to patched ES module text, every import rewritten
//! to a `<name>-<hash>` key of the same map) and a type map (virtual path to
//! declaration file and manifest text).

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod host;
pub mod loader;
pub mod naming;
pub mod normalize;
pub mod patch;
pub mod resolver;
pub mod scan;
pub mod specifier;
pub mod typefiles;
pub mod walk;

pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use engine::{Engine, SourceFiles};
pub use error::{Error, Result};
pub use host::{render_data_module, Trigger, TriggerKind};
pub use loader::{ModuleCache, ModuleRecord};
pub use naming::make_unique_id;
pub use resolver::{ModuleLocation, Resolution, Resolver, Stage, StageOutcome};
pub use scan::{scan, ImportReference, ReferenceKind};
pub use typefiles::{collect_type_files, TypeFiles, TypeMap};
pub use walk::{ImportMap, WalkOutput, Walker};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
