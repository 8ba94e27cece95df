mod common;

use std::fs;

use review_labeler::{
    error::{ArtifactError, ServiceError},
    model::{artifact, ArtifactTriple, InferenceService},
    nlp::{label_space::LabelSpace, LabelSet},
};

#[test]
fn trains_and_serves_consistent_labels() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = common::train_into(dir.path());
    assert_eq!(outcome.labeled_rows, 45);
    assert_eq!(outcome.dropped_rows, 3);
    assert_eq!(outcome.report.rows, 9);

    let service = common::ready_service(dir.path());
    assert_eq!(service.version(), Some(outcome.manifest.version.as_str()));

    let health = service.health().unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(
        health.labels,
        ["efficacy", "side_effect", "sleep_quality", "taste"]
    );

    let prediction = service
        .predict(&["Works great, fell asleep in 30 minutes, no grogginess!".to_string()])
        .unwrap();
    assert_eq!(prediction.predictions.len(), 1);
    assert!(prediction.predictions[0]
        .iter()
        .all(|label| health.labels.contains(label)));
    assert!(prediction.latency_ms >= 0.0);
}

#[test]
fn empty_batch_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let prediction = common::ready_service(dir.path()).predict(&[]).unwrap();
    assert!(prediction.predictions.is_empty());
    assert_eq!(prediction.latency_ms, 0.0);
}

#[test]
fn predictions_follow_input_order_and_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let texts: Vec<String> = common::corpus().into_iter().take(12).collect();

    let first = common::ready_service(dir.path()).predict(&texts).unwrap();
    let second = common::ready_service(dir.path()).predict(&texts).unwrap();
    assert_eq!(first.predictions.len(), texts.len());
    assert_eq!(first.predictions, second.predictions);

    let service = common::ready_service(dir.path());
    for (idx, text) in texts.iter().enumerate() {
        let single = service.predict(std::slice::from_ref(text)).unwrap();
        assert_eq!(single.predictions[0], first.predictions[idx]);
    }
}

#[test]
fn current_points_at_latest_complete_version() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::train_into(dir.path());
    let second = common::train_into(dir.path());
    assert_ne!(first.manifest.version, second.manifest.version);

    let current = artifact::current_dir(dir.path()).unwrap();
    assert!(current.ends_with(&second.manifest.version));
    for file in ["manifest.json", "encoder.json", "classifier.json", "label_space.json"] {
        assert!(current.join(file).exists(), "{file} missing");
    }
    let report = artifact::read_report(&current).unwrap().unwrap();
    assert_eq!(report, second.report);
    assert!(!fs::read_dir(dir.path())
        .unwrap()
        .any(|entry| entry.unwrap().file_name().to_string_lossy().starts_with(".staging")));
}

#[test]
fn mismatched_label_space_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let current = artifact::current_dir(dir.path()).unwrap();
    fs::write(
        current.join("label_space.json"),
        r#"["efficacy", "price", "sleep_quality", "taste"]"#,
    )
    .unwrap();

    assert!(matches!(
        ArtifactTriple::load(&current),
        Err(ArtifactError::LabelSpaceMismatch { .. })
    ));

    let mut service = InferenceService::new(8);
    let err = service.load(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Artifact(ArtifactError::LabelSpaceMismatch { .. })
    ));
    assert_eq!(service.state().name(), "failed");
}

#[test]
fn classifier_cannot_be_paired_with_another_label_space() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let (triple, _) = ArtifactTriple::load_current(dir.path()).unwrap();
    let (encoder, classifier, _) = triple.into_parts();

    let other: LabelSet = ["efficacy", "taste"].iter().map(|s| s.to_string()).collect();
    let other = LabelSpace::fit([&other]).unwrap();
    assert!(matches!(
        ArtifactTriple::new(encoder, classifier, other),
        Err(ArtifactError::LabelSpaceMismatch { .. })
    ));
}

#[test]
fn corrupt_or_missing_parts_never_reach_ready() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let current = artifact::current_dir(dir.path()).unwrap();

    fs::write(current.join("classifier.json"), "{ not json").unwrap();
    let mut service = InferenceService::new(8);
    assert!(matches!(
        service.load(dir.path()),
        Err(ServiceError::Artifact(ArtifactError::Corrupt { .. }))
    ));
    assert!(!service.is_ready());

    fs::remove_file(current.join("encoder.json")).unwrap();
    assert!(matches!(
        ArtifactTriple::load(&current),
        Err(ArtifactError::Io { .. })
    ));
}

#[test]
fn missing_pointer_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ArtifactTriple::load_current(dir.path()),
        Err(ArtifactError::NoCurrentVersion(_))
    ));
}

#[test]
fn misshapen_classifier_never_reaches_ready() {
    let dir = tempfile::tempdir().unwrap();
    common::train_into(dir.path());
    let current = artifact::current_dir(dir.path()).unwrap();
    let path = current.join("classifier.json");
    let trained: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

    let mut truncated = trained.clone();
    truncated["models"].as_array_mut().unwrap().truncate(1);
    let mut short = trained;
    let logistic = short["models"]
        .as_array_mut()
        .unwrap()
        .iter_mut()
        .find(|model| model["kind"] == "logistic")
        .expect("trained corpus yields a logistic model");
    logistic["weights"] = serde_json::json!([1.0]);

    for corrupt in [truncated, short] {
        fs::write(&path, serde_json::to_vec(&corrupt).unwrap()).unwrap();
        let mut service = InferenceService::new(8);
        assert!(matches!(
            service.load(dir.path()),
            Err(ServiceError::Artifact(ArtifactError::Corrupt { .. }))
        ));
        assert_eq!(service.state().name(), "failed");
        assert!(service.predict(&["works great".to_string()]).is_err());
    }
}
