//! Documents consumed and produced by the reporting core.

pub mod annotation;
pub mod report;
pub mod variant;
