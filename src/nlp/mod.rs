//! Weak labeling, label space, encoding and classification.

pub mod classifier;
pub mod embeddings;
pub mod label_space;
pub mod rules;

use std::collections::BTreeSet;

/// A set of taxonomy label names. Ordered so equal sets print and compare identically.
pub type LabelSet = BTreeSet<String>;
