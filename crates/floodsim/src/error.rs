//! Error taxonomy shared by the whole crate.

/// What kind of named thing a naming error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Layer,
    Mesh,
    Obstacle,
    Body,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NameKind::Layer => "layer",
            NameKind::Mesh => "mesh",
            NameKind::Obstacle => "obstacle",
            NameKind::Body => "body",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by the simulation core.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: NameKind, name: String },
    #[error("{kind} '{name}' not found")]
    NotFound { kind: NameKind, name: String },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("non-finite or unbounded height {value} at cell {cell}")]
    NumericalInstability { cell: usize, value: f32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    pub(crate) fn duplicate(kind: NameKind, name: &str) -> Self {
        SimError::DuplicateName {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn not_found(kind: NameKind, name: &str) -> Self {
        SimError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
