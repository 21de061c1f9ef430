//! Classifier integration tests
//!
//! Tests for leaf image classification including:
//! - missing files and corrupt images
//! - deterministic local predictions
//! - model artifact download, reuse and placeholder
//! - hosted inference backend

use cropwatch_backend::config::{ClassifierBackend, ClassifierConfig};
use cropwatch_backend::external::{InferenceClient, ModelArtifactFetcher};
use cropwatch_backend::services::classifier::{
    ClassifierError, ClassifierHandle, DigestClassifier, DiseaseClassifier, RemoteClassifier,
};
use image::{Rgb, RgbImage};
use shared::SENTINEL_LABEL;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_leaf(dir: &Path, name: &str, shade: u8) -> PathBuf {
    let img = RgbImage::from_fn(16, 16, |x, y| {
        Rgb([shade, (x * 8) as u8, (y * 8) as u8])
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn classifier_config(hub: &str, model_dir: &Path) -> ClassifierConfig {
    ClassifierConfig {
        backend: ClassifierBackend::Local,
        inference_endpoint: None,
        api_token: None,
        hub_endpoint: hub.to_string(),
        model_repo: "acme/corn".to_string(),
        model_filename: "corn_model.keras".to_string(),
        model_dir: model_dir.to_path_buf(),
        persistent_dir: None,
        timeout_secs: 5,
    }
}

// ============================================================================
// Local classifier
// ============================================================================

#[tokio::test]
async fn test_missing_image_is_file_not_found() {
    let dir = TempDir::new().unwrap();
    let classifier = DigestClassifier::from_artifact(None).await.unwrap();

    let result = classifier.classify(&dir.path().join("absent.png")).await;

    assert!(matches!(result, Err(ClassifierError::FileNotFound(_))));
}

#[tokio::test]
async fn test_corrupt_image_yields_sentinel() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();

    let classifier = DigestClassifier::from_artifact(None).await.unwrap();
    let prediction = classifier.classify(&path).await.unwrap();

    assert_eq!(prediction.label, SENTINEL_LABEL);
    assert_eq!(prediction.confidence, 0.0);
}

#[tokio::test]
async fn test_local_prediction_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let leaf = write_leaf(dir.path(), "leaf.png", 40);
    let copy = dir.path().join("copy.png");
    std::fs::copy(&leaf, &copy).unwrap();

    let artifact = dir.path().join("model.keras");
    std::fs::write(&artifact, b"weights").unwrap();

    let classifier = DigestClassifier::from_artifact(Some(&artifact)).await.unwrap();
    let first = classifier.classify(&leaf).await.unwrap();
    let second = classifier.classify(&copy).await.unwrap();

    assert_eq!(first, second);
    assert!(first.disease().is_some());
    assert!((0.70..=0.99).contains(&first.confidence));
}

// ============================================================================
// Model artifact fetcher
// ============================================================================

#[tokio::test]
async fn test_fetcher_downloads_artifact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/acme/corn/resolve/main/corn_model.keras"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"model-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ModelArtifactFetcher::new(&classifier_config(&server.uri(), dir.path())).unwrap();
    let fetched = fetcher.fetch().await.unwrap();

    assert_eq!(fetched, dir.path().join("corn_model.keras"));
    assert_eq!(std::fs::read(&fetched).unwrap(), b"model-bytes");
}

#[tokio::test]
async fn test_fetcher_reuses_existing_artifact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("corn_model.keras"), b"cached").unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = ModelArtifactFetcher::new(&classifier_config(&server.uri(), dir.path())).unwrap();
    let fetched = fetcher.fetch().await.unwrap();

    assert_eq!(std::fs::read(fetched).unwrap(), b"cached");
}

#[tokio::test]
async fn test_fetcher_prefers_persistent_dir() {
    let server = MockServer::start().await;
    let model_dir = TempDir::new().unwrap();
    let persistent = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"model-bytes".to_vec()))
        .mount(&server)
        .await;

    let mut config = classifier_config(&server.uri(), model_dir.path());
    config.persistent_dir = Some(persistent.path().to_path_buf());

    let fetcher = ModelArtifactFetcher::new(&config).unwrap();
    let fetched = fetcher.fetch().await.unwrap();

    assert_eq!(fetched, persistent.path().join("corn_model.keras"));
}

#[tokio::test]
async fn test_failed_download_leaves_placeholder() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ModelArtifactFetcher::new(&classifier_config(&server.uri(), dir.path())).unwrap();
    let fetched = fetcher.fetch().await.unwrap();

    let contents = std::fs::read_to_string(fetched).unwrap();
    assert!(contents.starts_with("Placeholder model file"));
}

#[tokio::test]
async fn test_handle_initialises_once_and_classifies() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let leaf = write_leaf(dir.path(), "leaf.png", 90);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"model-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let handle = ClassifierHandle::new(classifier_config(&server.uri(), &dir.path().join("models")));
    assert!(!handle.is_loaded());

    let first = handle.classify(&leaf).await.unwrap();
    let second = handle.clone().classify(&leaf).await.unwrap();

    assert!(handle.is_loaded());
    assert_eq!(first, second);
}

// ============================================================================
// Hosted inference
// ============================================================================

#[tokio::test]
async fn test_remote_classifier_picks_best_label() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let leaf = write_leaf(dir.path(), "leaf.png", 10);

    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(header("Authorization", "Bearer hub-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"label": "Healthy", "score": 0.05},
            {"label": "Gray_Leaf_Spot", "score": 0.91},
            {"label": "Blight", "score": 0.04}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = InferenceClient::new(
        format!("{}/classify", server.uri()),
        Some("hub-token".to_string()),
        5,
    )
    .unwrap();
    let prediction = RemoteClassifier::new(client).classify(&leaf).await.unwrap();

    assert_eq!(prediction.label, "Gray Leaf Spot");
    assert_eq!(prediction.confidence, 0.91);
}

#[tokio::test]
async fn test_remote_classifier_reports_upstream_errors() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let leaf = write_leaf(dir.path(), "leaf.png", 10);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let client = InferenceClient::new(server.uri(), None, 5).unwrap();
    let result = RemoteClassifier::new(client).classify(&leaf).await;

    assert!(matches!(result, Err(ClassifierError::Inference(_))));
}

#[tokio::test]
async fn test_remote_classifier_skips_corrupt_images() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.png");
    std::fs::write(&path, b"garbage").unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = InferenceClient::new(server.uri(), None, 5).unwrap();
    let prediction = RemoteClassifier::new(client).classify(&path).await.unwrap();

    assert!(prediction.is_failed());
}
