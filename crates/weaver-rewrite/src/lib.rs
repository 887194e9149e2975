//! Rewrite planning and application.
//!
//! A [`Planner`] turns a match result, the dependency blocks of the call site and
//! a [`ReplacementTemplate`] into an [`EditPlan`] positioned against the current
//! sequence. [`apply`] commits a plan atomically.

pub mod apply;
pub mod errors;
pub mod plan;
pub mod template;

pub use apply::apply;
pub use errors::{EditError, EditErrorKind, EditResult};
pub use plan::{Edit, EditPlan, Planner};
pub use template::{ReplacementTemplate, TemplatePart};

#[cfg(test)]
mod tests;
