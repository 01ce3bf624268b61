//! Full-model snapshots.
//!
//! The whole model state serializes, the PRNG and its cached Gaussian
//! deviate included, so a restored mid-run snapshot continues the exact
//! trajectory of the uninterrupted run.

use crate::model::Model;

/// Serialize the complete model state.
pub fn to_json(model: &Model) -> Result<String, serde_json::Error> {
    serde_json::to_string(model)
}

/// Restore a model from a snapshot produced by [`to_json`].
pub fn from_json(json: &str) -> Result<Model, serde_json::Error> {
    serde_json::from_str(json)
}
