use candle_core::{DType, Device, Tensor};
use image::{ImageFormat, Rgb, RgbImage};
use inference::model::{ResNetConfig, build_network_with};
use inference::search::{ARTIFACT_FILE, Anchors, CLASS_LIST_FILE, ResourceLocator};
use inference::{CacheState, Classifier, FsModelLoader, InferenceConfig, InferenceError};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

const TINY: ResNetConfig = ResNetConfig {
    layers: [1, 1, 1, 1],
    base_width: 8,
};

const LABELS: [&str; 4] = ["Apple___scab", "Apple___healthy", "Corn___rust", "Tomato___blight"];

/// Write a trained-looking artifact for the reduced network.
fn write_artifact(path: &Path, num_classes: usize) {
    let shapes = build_network_with(TINY, num_classes)
        .unwrap()
        .parameter_shapes();

    let mut tensors: HashMap<String, Tensor> = shapes
        .into_iter()
        .map(|(name, shape)| {
            let tensor = if name.ends_with("running_var") {
                Tensor::ones(shape, DType::F32, &Device::Cpu)
            } else {
                Tensor::randn(0f32, 0.1, shape, &Device::Cpu)
            };
            (name, tensor.unwrap())
        })
        .collect();
    tensors.insert(
        "bn1.num_batches_tracked".to_string(),
        Tensor::new(&[1000i64], &Device::Cpu).unwrap(),
    );

    candle_core::safetensors::save(&tensors, path).unwrap();
}

fn write_classes(path: &Path, labels: &[&str]) {
    fs::write(path, serde_json::to_string(labels).unwrap()).unwrap();
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

fn classifier_for(config: &InferenceConfig) -> Classifier {
    let anchors = Anchors::from_code_dir(None, config.deploy_root.clone());
    let locator = ResourceLocator::new(&anchors, config);
    Classifier::new(FsModelLoader::with_architecture(locator, TINY))
}

/// Resources found at the deployment root, ranked end to end.
#[test]
fn test_end_to_end_prediction_from_deploy_root() {
    let root = tempdir().unwrap();
    write_classes(&root.path().join(CLASS_LIST_FILE), &LABELS);
    write_artifact(&root.path().join(ARTIFACT_FILE), LABELS.len());
    let config = InferenceConfig {
        classes_path: Some(root.path().join(CLASS_LIST_FILE)),
        model_path: None,
        deploy_root: root.path().to_path_buf(),
    };
    let classifier = classifier_for(&config);

    assert_eq!(classifier.state(), CacheState::Unloaded);
    let loaded = classifier.load_model().unwrap();
    assert_eq!(classifier.state(), CacheState::Ready);
    assert_eq!(loaded.classes.len(), LABELS.len());

    let result = classifier.predict_from_bytes(&jpeg(320, 240), 3).unwrap();

    assert_eq!(result.all_results.len(), 3);
    assert_eq!(result.all_results[0].label, result.prediction);
    assert_eq!(result.all_results[0].score, result.confidence);
    assert!(LABELS.contains(&result.prediction.as_str()));
    assert!((0.0..=1.0).contains(&result.confidence));
    for pair in result.all_results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    // Full ranking covers the whole distribution
    let full = classifier.predict_from_bytes(&jpeg(320, 240), 10).unwrap();
    let total: f32 = full.all_results.iter().map(|r| r.score).sum();
    assert_eq!(full.all_results.len(), LABELS.len());
    assert!((total - 1.0).abs() < 1e-4, "probabilities sum to {}", total);
    assert_eq!(full.all_results[..3], result.all_results[..]);
}

#[test]
fn test_path_and_bytes_predict_identically() {
    let root = tempdir().unwrap();
    let classes = root.path().join("labels.json");
    let weights = root.path().join("weights.safetensors");
    write_classes(&classes, &LABELS);
    write_artifact(&weights, LABELS.len());
    let image_path = root.path().join("leaf.jpg");
    let image = jpeg(200, 300);
    fs::write(&image_path, &image).unwrap();

    let classifier = classifier_for(&InferenceConfig {
        classes_path: Some(classes),
        model_path: Some(weights),
        deploy_root: root.path().join("unused"),
    });

    let from_bytes = classifier.predict_from_bytes(&image, 2).unwrap();
    let from_path = classifier.predict_from_path(&image_path, 2).unwrap();

    assert_eq!(from_bytes, from_path);
}

#[test]
fn test_missing_resources_keep_model_out_of_ready() {
    let root = tempdir().unwrap();
    let classifier = classifier_for(&InferenceConfig {
        classes_path: None,
        model_path: None,
        deploy_root: root.path().to_path_buf(),
    });

    let err = classifier.load_model().unwrap_err();

    match &err {
        InferenceError::MissingResource { searched, .. } => {
            assert!(searched.contains(&root.path().join(CLASS_LIST_FILE)));
        }
        other => panic!("Expected MissingResource, got {:?}", other),
    }
    assert_eq!(classifier.state(), CacheState::Failed);

    // Resources appearing later are not picked up
    write_classes(&root.path().join(CLASS_LIST_FILE), &LABELS);
    write_artifact(&root.path().join(ARTIFACT_FILE), LABELS.len());
    assert_eq!(classifier.load_model().unwrap_err(), err);
    let unavailable = classifier.predict_from_bytes(&jpeg(64, 64), 1).unwrap_err();
    assert_eq!(unavailable, InferenceError::ModelUnavailable(Box::new(err)));
}

#[test]
fn test_pointer_stub_fails_startup() {
    let root = tempdir().unwrap();
    write_classes(&root.path().join(CLASS_LIST_FILE), &LABELS);
    fs::write(
        root.path().join(ARTIFACT_FILE),
        "version https://git-lfs.github.com/spec/v1\n\
         oid sha256:0c3b2a4ff1e0c0e2f5b53a1e1b7ac6f57e0bb4a4c8a7b6a2c27e5ee4fd0b6c11\n\
         size 94371245\n",
    )
    .unwrap();

    let classifier = classifier_for(&InferenceConfig {
        classes_path: Some(root.path().join(CLASS_LIST_FILE)),
        model_path: None,
        deploy_root: root.path().to_path_buf(),
    });

    let err = classifier.load_model().unwrap_err();

    assert!(matches!(err, InferenceError::CorruptArtifact { .. }), "{:?}", err);
}

#[test]
fn test_class_count_skew_fails_startup() {
    let root = tempdir().unwrap();
    write_classes(&root.path().join(CLASS_LIST_FILE), &LABELS[..3]);
    write_artifact(&root.path().join(ARTIFACT_FILE), LABELS.len());

    let classifier = classifier_for(&InferenceConfig {
        classes_path: Some(root.path().join(CLASS_LIST_FILE)),
        model_path: None,
        deploy_root: root.path().to_path_buf(),
    });

    let err = classifier.load_model().unwrap_err();

    assert!(matches!(err, InferenceError::ArchitectureMismatch(_)), "{:?}", err);
}

#[test]
fn test_concurrent_startup_reads_resources_once() {
    let root = tempdir().unwrap();
    let classes = root.path().join(CLASS_LIST_FILE);
    let weights = root.path().join(ARTIFACT_FILE);
    write_classes(&classes, &LABELS);
    write_artifact(&weights, LABELS.len());
    let classifier = Arc::new(classifier_for(&InferenceConfig {
        classes_path: Some(classes.clone()),
        model_path: Some(weights.clone()),
        deploy_root: root.path().to_path_buf(),
    }));
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                classifier.load_model().unwrap()
            })
        })
        .collect();
    let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
    assert!(models.iter().all(|m| Arc::ptr_eq(&m.classes, &models[0].classes)));

    // Nothing is read from disk again once the model is ready
    fs::remove_file(&classes).unwrap();
    fs::remove_file(&weights).unwrap();
    let again = classifier.load_model().unwrap();
    assert!(Arc::ptr_eq(&again, &models[0]));
    assert!(classifier.predict_from_bytes(&jpeg(96, 128), 2).is_ok());
}
