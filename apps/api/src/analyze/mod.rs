// Profile analysis: input normalization, cache read-through, GitHub fetch and
// snapshot write-behind. Classification happens later, in reports.

pub mod handlers;
pub mod service;
pub mod validation;
