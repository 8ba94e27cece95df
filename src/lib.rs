//! Weakly supervised multi-label tagging for product reviews.
//!
//! Reviews are normalized, labeled by a configurable rule table, encoded into
//! fixed-width vectors and used to train one binary classifier per label. The
//! encoder state, classifier and label space are persisted together and served
//! as one unit.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod nlp;
