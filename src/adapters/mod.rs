//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: JSON scaler/classifier artifacts with manifest and signature checks
//! - `pdf`: Deterministic PDF encoding of report documents
//! - `sanitize`: Redaction for log output

pub mod artifacts;
pub mod pdf;
pub mod sanitize;

pub use artifacts::{
    ArtifactLoader, ArtifactManifest, ClassifierKind, LinearClassifierArtifact, LoadedArtifacts,
    StandardScalerArtifact,
};
pub use pdf::PdfWriter;
