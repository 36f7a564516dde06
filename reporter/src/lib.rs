pub mod config;
pub mod pipeline;
pub mod publish;
pub mod render;

pub use config::ReportConfig;
pub use pipeline::{generate, resolve_bundle};
pub use publish::{
    list_bundle_files, plan_uploads, prepare_check_run, truncate_to_bytes, BundleUpload,
    CheckAnnotation, CheckRun, CheckRunOutput, UploadPolicy, ANNOTATION_LIMIT, BYTES_LIMIT,
};
pub use render::{render, Annotation, AnnotationLevel, RenderOptions, RenderedReport};

use bundle_reader::ReaderError;
use thiserror::Error;
use xcresult_model::ModelError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("No result bundle to report on")]
    NoInputs,

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid bundle pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::pipeline::*;
    pub use crate::publish::*;
    pub use crate::render::*;
    pub use crate::{ReportError, ReportResult};
}
