//! Applicant intake core: validation, country enrichment, entity mapping and a
//! storage-agnostic repository, composed into a single submission pipeline.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
