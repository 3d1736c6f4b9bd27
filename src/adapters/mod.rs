//! Adapters for the external collaborators of the pipeline.

pub mod llm;
pub mod memory;
