#![allow(dead_code)]

use std::path::Path;

use review_labeler::{
    model::{InferenceService, TrainingOutcome, TrainingPipeline},
    nlp::{classifier::TrainConfig, embeddings::HashingEncoder, rules::LabelRuleEngine},
};

const EFFICACY: &[&str] = &["works great", "helped me sleep", "stopped working"];
const TASTE: &[&str] = &["tastes bad", "so chalky", "yummy gummies"];
const SIDE_EFFECT: &[&str] = &["felt groggy", "vivid dreams", "bad headache"];
const SLEEP: &[&str] = &["fell asleep quickly", "kept waking up", "my insomnia"];

/// Synthetic reviews covering every label combination, including none.
pub fn corpus() -> Vec<String> {
    let groups = [EFFICACY, TASTE, SIDE_EFFECT, SLEEP];
    (0..48)
        .map(|i| {
            let mask = i % 16;
            let variant = (i / 16) % 3;
            let mut parts = vec!["bought this bottle"];
            for (bit, group) in groups.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    parts.push(group[variant]);
                }
            }
            format!("{}.", parts.join(", "))
        })
        .collect()
}

pub fn train_into(dir: &Path) -> TrainingOutcome {
    let pipeline = TrainingPipeline::new(
        LabelRuleEngine::load(None).unwrap(),
        Box::new(HashingEncoder::new(256).unwrap()),
        TrainConfig::default(),
        16,
        dir,
    );
    pipeline.run(corpus()).unwrap()
}

pub fn ready_service(dir: &Path) -> InferenceService {
    let mut service = InferenceService::new(8);
    service.load(dir).unwrap();
    service
}
