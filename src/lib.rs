//! Weaves `ToFodyProperty` placeholder calls into observable-as-property helper
//! fields.
//!
//! The instruction model, analyses and rewriting live in the `weaver-*` crates;
//! this crate adds the host module model, configuration and the pipeline.

pub mod config;
pub mod diagnostic;
pub mod errors;
pub mod host;
pub mod pipeline;
pub mod weave;

pub use config::WeaverConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
pub use errors::{WeaveError, WeaveErrorKind, WeaveResult};
pub use host::{AttributeDef, FieldDef, MethodDef, ModuleDef, PropertyDef, TypeDef};
pub use pipeline::{WeaveReport, dump, slice_method, weave};
pub use weave::{WovenProperty, weave_routine};
