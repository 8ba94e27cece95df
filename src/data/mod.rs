//! Review ingestion, normalisation and labeled dataset interchange.

pub mod labeled;
pub mod normalize;
pub mod reviews;
