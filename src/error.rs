use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a generation request.
///
/// None of these are recovered from inside the crate: a failed request
/// produces no protocol text and writes no files.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or inconsistent recipe values.
    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    /// The PSD cannot supply the requested voxels below the largest particle
    /// diameter the system can hold.
    #[error("PSD '{psd}' cannot supply {target_pixels} voxels with particles below {max_diameter:.2} voxels")]
    PsdTooSmall {
        psd: String,
        target_pixels: i64,
        max_diameter: f64,
    },

    /// A PSD or aggregate name the materials store does not know.
    #[error("missing material: {0}")]
    MissingMaterial(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidRecipe(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerationError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
