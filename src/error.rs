//! Error taxonomy for the recognition core.
//!
//! Recognition entry points never surface these to callers: per-variant,
//! per-engine and per-template failures are caught where they occur and
//! contribute nothing to vote or score aggregation. The variants exist for
//! the construction-time boundaries (engine resolution, template directory)
//! and for engine implementations to report per-call failures upward to the
//! voting layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced at the edges of the recognition pipeline.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// A text-recognition engine could not be constructed. The pipeline
    /// degrades to the remaining engine(s) instead of failing.
    #[error("text engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A per-call engine invocation failed; the variant that triggered it
    /// contributes zero votes.
    #[error("text engine '{engine}' failed: {message}")]
    EngineFailed { engine: String, message: String },

    /// Zero-sized or otherwise unusable input raster.
    #[error("malformed input image ({width}x{height})")]
    MalformedInput { width: u32, height: u32 },

    /// The custom template directory could not be read.
    #[error("template directory {path:?}: {source}")]
    TemplateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
