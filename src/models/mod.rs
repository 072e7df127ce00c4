//! Domain entities and the validators every create and update path runs.
//!
//! Updates are validated against the merged entity (existing row plus patch), never the
//! patch alone, so blanking a required field through a partial update is caught.

pub mod environment;
pub mod flag;
pub mod flag_config;
pub mod project;

pub use environment::{Environment, EnvironmentInput, EnvironmentValidationError};
pub use flag::{Flag, FlagInput, FlagValidationError, NewFlag};
pub use flag_config::{
    ConfigListResponse, ConfigValidationError, FlagConfig, FlagConfigPatch, FlagEnvironmentConfig,
};
pub use project::{Project, ProjectInput, ProjectValidationError};

/// Longest display name accepted for any entity.
pub const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameProblem {
    Required,
    TooLong,
}

pub(crate) fn check_name(name: Option<&str>) -> Result<(), NameProblem> {
    match name.map(str::trim) {
        None | Some("") => Err(NameProblem::Required),
        Some(n) if n.chars().count() > MAX_NAME_LENGTH => Err(NameProblem::TooLong),
        Some(_) => Ok(()),
    }
}

/// Field-wise overlay of a patch onto existing values.
pub(crate) fn overlay<T: Clone>(existing: &T, patch: Option<T>) -> Option<T> {
    Some(patch.unwrap_or_else(|| existing.clone()))
}
