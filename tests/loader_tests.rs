mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use scene_viewer::config::ViewerConfig;
use scene_viewer::error::AssetError;
use scene_viewer::loaders::{FileAssets, LoadState};
use scene_viewer::SceneLifecycleManager;

fn loads_settled(viewer: &Viewer) -> bool {
    let status = viewer.status().unwrap();
    status.environment != LoadState::Loading && status.model != LoadState::Loading
}

// ============================================================================
// Environment
// ============================================================================

#[test]
fn test_environment_absent_until_loaded() {
    let (mut viewer, _assets, release) = gated_viewer();
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    viewer.tick();
    let scene = viewer.scene().unwrap();
    assert!(scene.environment().is_none());
    assert!(scene.background().is_none());

    release.environment.send(Ok(radiance_map(1.0))).unwrap();
    wait_for(&mut viewer, |v| v.status().unwrap().environment == LoadState::Done);

    let scene = viewer.scene().unwrap();
    let environment = scene.environment().unwrap();
    let background = scene.background().unwrap();
    assert!(Arc::ptr_eq(environment, background));

    viewer.tick();
    let last = draws(&viewer).last().unwrap();
    assert!(last.has_environment && last.has_background);
    assert!(!draws(&viewer)[0].has_environment);
}

#[test]
fn test_model_is_attached_as_a_child() {
    let (mut viewer, _assets, release) = gated_viewer();
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    release.model.send(Ok(triangle_model())).unwrap();
    wait_for(&mut viewer, |v| v.status().unwrap().model == LoadState::Done);

    let scene = viewer.scene().unwrap();
    let model = scene.models().next().unwrap();
    assert_eq!(model.triangle_count(), 1);
    // Axes helper plus the model
    assert_eq!(scene.children().len(), 2);
    assert!(scene.environment().is_none());
}

// ============================================================================
// Ordering
// ============================================================================

fn run_with_order(environment_first: bool) -> Viewer {
    let (mut viewer, _assets, release) = gated_viewer();
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    if environment_first {
        release.environment.send(Ok(radiance_map(2.0))).unwrap();
        wait_for(&mut viewer, |v| v.status().unwrap().environment == LoadState::Done);
        viewer.tick();
        release.model.send(Ok(triangle_model())).unwrap();
    } else {
        release.model.send(Ok(triangle_model())).unwrap();
        wait_for(&mut viewer, |v| v.status().unwrap().model == LoadState::Done);
        viewer.tick();
        release.environment.send(Ok(radiance_map(2.0))).unwrap();
    }
    wait_for(&mut viewer, loads_settled);
    viewer
}

#[test]
fn test_completion_order_does_not_matter() {
    let a = run_with_order(true);
    let b = run_with_order(false);

    let (a, b) = (a.scene().unwrap(), b.scene().unwrap());
    assert!(a.same_content(b));
    assert!(a.environment().is_some());
    assert_eq!(a.models().count(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_environment_load_keeps_rendering() {
    let (mut viewer, _assets, release) = gated_viewer();
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    release
        .environment
        .send(Err(AssetError::decode("login.exr", "truncated file")))
        .unwrap();
    wait_for(&mut viewer, |v| v.status().unwrap().environment == LoadState::Failed);

    for _ in 0..3 {
        assert!(viewer.tick().is_some());
    }
    assert!(viewer.is_running());
    assert!(viewer.scene().unwrap().environment().is_none());

    // The other load is unaffected
    release.model.send(Ok(triangle_model())).unwrap();
    wait_for(&mut viewer, |v| v.status().unwrap().model == LoadState::Done);
    assert_eq!(viewer.scene().unwrap().models().count(), 1);
}

#[test]
fn test_dropped_loader_is_a_failure() {
    let (mut viewer, _assets, release) = gated_viewer();
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    drop(release);
    wait_for(&mut viewer, loads_settled);

    let status = viewer.status().unwrap();
    assert_eq!(status.environment, LoadState::Failed);
    assert_eq!(status.model, LoadState::Failed);
    assert!(viewer.tick().is_some());
}

#[test]
fn test_missing_files_fail_without_halting() {
    let dir = tempfile::tempdir().unwrap();
    let config = ViewerConfig {
        asset_base: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut viewer =
        SceneLifecycleManager::new(config, MockBackend::default(), Arc::new(FileAssets));
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    wait_for(&mut viewer, loads_settled);
    let status = viewer.status().unwrap();
    assert_eq!(status.environment, LoadState::Failed);
    assert_eq!(status.model, LoadState::Failed);

    assert!(viewer.tick().is_some());
    assert!(viewer.tick().is_some());
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_asset_paths_resolve_against_base() {
    let (assets, _release) = GatedAssets::new();
    let config = ViewerConfig {
        asset_base: PathBuf::from("/srv/static"),
        ..Default::default()
    };
    let mut viewer = SceneLifecycleManager::new(config, MockBackend::default(), assets.clone());
    let mut surface = MockSurface::new(800, 600);
    viewer.start(&mut surface);

    wait_for(&mut viewer, |_| assets.decoder_dirs.lock().unwrap().len() == 1);
    wait_for(&mut viewer, |_| assets.requested.lock().unwrap().len() == 2);

    let mut requested = assets.requested.lock().unwrap().clone();
    requested.sort();
    assert_eq!(
        requested,
        vec![
            PathBuf::from("/srv/static/models/login.EXR"),
            PathBuf::from("/srv/static/models/login.glb"),
        ]
    );
    assert_eq!(
        assets.decoder_dirs.lock().unwrap()[0],
        PathBuf::from("/srv/static/draco")
    );
}
