//! Deterministic job-matching analyzer.
//!
//! Everything here is pure and synchronous: manifests are parsed into dependencies,
//! dependencies are filtered to frameworks, keywords are extracted per repository,
//! repositories are classified into domains, and the results are assembled into a
//! candidate report.

pub mod domains;
pub mod frameworks;
pub mod keywords;
pub mod manifest;
pub mod projects;
pub mod readme;
pub mod report;
pub mod roles;
pub mod rules;
pub mod scoring;
pub mod skills;
