//! Application layer: Use cases and services.
//!
//! Orchestrates the domain types with the ports to score an input and
//! render the result.

pub mod report;
mod scoring;

pub use report::{
    export_document, Banner, ChartBar, DocumentArtifact, ProbabilityChart, RenderedReport,
    ReportOptions, ReportRenderer,
};
pub use scoring::{Evaluation, RiskEngine};
