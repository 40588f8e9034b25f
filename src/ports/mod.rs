//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and the pre-fitted artifacts and document
//! format.

mod classifier;
mod document;
mod scaler;

pub use classifier::Classifier;
pub use document::DocumentWriter;
pub use scaler::Scaler;
