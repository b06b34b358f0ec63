use thiserror::Error;

/// Errors surfaced by the changelog core.
///
/// Every variant here is fatal: the driver that drains statement buckets
/// into a [`crate::changelog::Changelog`] stops at the first error and
/// emits nothing partial. De-duplication during full-model traversal is
/// the one non-fatal condition in the original design and is logged via
/// `log::warn!` rather than represented here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} missing parent: {detail}")]
    MissingParent { kind: &'static str, detail: String },

    #[error("unknown entity type in diff: {0}")]
    UnknownEntityType(String),

    #[error("entity {entity} has no simple/object/collection classification for attribute {attr}")]
    UnknownAttribute { entity: String, attr: String },

    #[error("malformed key for {kind}: expected {expected} components, got {got}")]
    MalformedKey {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("changelog config is missing [changelog].changeset_id")]
    ConfigMissing,

    #[error("changelog config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("changelog config parse error: {0}")]
    Config(String),

    #[error("mapping document parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
