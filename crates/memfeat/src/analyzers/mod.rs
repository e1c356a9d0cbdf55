//! Feature aggregators: normalized plugin records to classifier inputs.

pub mod image_features;
pub mod process_features;
