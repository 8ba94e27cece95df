//! Stable label name ⇄ bit index mapping shared by training and serving.

use std::collections::{BTreeSet, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{error::LabelSpaceError, nlp::LabelSet};

/// Ordered label taxonomy fitted from the training corpus.
///
/// Bit `i` of every bitmask refers to `labels()[i]`. The list is sorted, so two
/// fits over the same label sets always produce the same indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSpace {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSpace {
    /// Fit from observed label sets. Fails when no label was observed at all.
    pub fn fit<'a, I>(label_sets: I) -> Result<Self, LabelSpaceError>
    where
        I: IntoIterator<Item = &'a LabelSet>,
    {
        let distinct: BTreeSet<&String> = label_sets.into_iter().flatten().collect();
        if distinct.is_empty() {
            return Err(LabelSpaceError::Empty);
        }
        Ok(Self::from_sorted(distinct.into_iter().cloned().collect()))
    }

    fn from_sorted(labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();
        Self { labels, index }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Indicator vector for a label set.
    pub fn encode(&self, labels: &LabelSet) -> Result<Vec<bool>, LabelSpaceError> {
        let mut bits = vec![false; self.labels.len()];
        for label in labels {
            let idx = self
                .index_of(label)
                .ok_or_else(|| LabelSpaceError::UnknownLabel(label.clone()))?;
            bits[idx] = true;
        }
        Ok(bits)
    }

    /// Label names for the set bits of a bitmask.
    pub fn decode(&self, bits: &[bool]) -> Result<LabelSet, LabelSpaceError> {
        if bits.len() != self.labels.len() {
            return Err(LabelSpaceError::WidthMismatch {
                expected: self.labels.len(),
                actual: bits.len(),
            });
        }
        Ok(bits
            .iter()
            .zip(&self.labels)
            .filter(|(bit, _)| **bit)
            .map(|(_, label)| label.clone())
            .collect())
    }

    /// Row-per-example target matrix.
    pub fn encode_matrix<'a, I>(&self, label_sets: I) -> Result<Array2<bool>, LabelSpaceError>
    where
        I: IntoIterator<Item = &'a LabelSet>,
    {
        let rows = label_sets
            .into_iter()
            .map(|labels| self.encode(labels))
            .collect::<Result<Vec<_>, _>>()?;
        let mut matrix = Array2::from_elem((rows.len(), self.labels.len()), false);
        for (mut target, bits) in matrix.rows_mut().into_iter().zip(&rows) {
            for (cell, bit) in target.iter_mut().zip(bits) {
                *cell = *bit;
            }
        }
        Ok(matrix)
    }
}

impl TryFrom<Vec<String>> for LabelSpace {
    type Error = LabelSpaceError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        if labels.is_empty() {
            return Err(LabelSpaceError::Empty);
        }
        if labels.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(LabelSpaceError::Unordered);
        }
        Ok(Self::from_sorted(labels))
    }
}

impl From<LabelSpace> for Vec<String> {
    fn from(space: LabelSpace) -> Self {
        space.labels
    }
}
