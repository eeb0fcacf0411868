//! Unit tests for the install executor.
//!
//! Uses a scripted platform installer so the primary path, the manual
//! fallback, and the forced-exit safety net can be exercised without
//! touching the real OS install mechanism.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harbor_updater::platform::PlatformInstaller;
use harbor_updater::services::install_executor::{select_candidate, InstallExecutor};
use harbor_updater::services::quit_coordinator::QuitCoordinator;
use harbor_updater::types::errors::InstallError;
use harbor_updater::types::update::UpdateInfo;

const FORCED_EXIT_DELAY: Duration = Duration::from_millis(50);

struct ScriptedPlatform {
    cache_dir: Option<PathBuf>,
    supports_fallback: bool,
    primary_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedPlatform {
    fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            supports_fallback: true,
            primary_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl PlatformInstaller for &ScriptedPlatform {
    fn update_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn supports_manual_fallback(&self) -> bool {
        self.supports_fallback
    }

    fn invoke_primary(&self, _update: &UpdateInfo) -> Result<(), InstallError> {
        self.record("primary");
        if self.primary_fails {
            Err(InstallError::PrimaryFailed("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn replace_installed(&self, candidate: &Path) -> Result<(), InstallError> {
        self.record(&format!("replace:{}", candidate.display()));
        Ok(())
    }

    fn relaunch(&self) -> Result<(), InstallError> {
        self.record("relaunch");
        Ok(())
    }
}

fn quit_with_hook() -> (Arc<QuitCoordinator>, Arc<AtomicBool>) {
    let exited = Arc::new(AtomicBool::new(false));
    let flag = exited.clone();
    let quit = Arc::new(QuitCoordinator::with_exit_hook(Box::new(move |_code| {
        flag.store(true, Ordering::SeqCst);
    })));
    (quit, exited)
}

fn update_info(dir: &Path) -> UpdateInfo {
    UpdateInfo {
        version: "2.0.0".to_string(),
        release_notes: None,
        artifact_dir: dir.join("harbor-update-2.0.0"),
        asset_path: dir.join("harbor-update-2.0.0").join("harbor.pkg"),
        sha256: "abc".to_string(),
        size: 1,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_primary_path_marks_quit_and_arms_forced_exit() {
    let platform = ScriptedPlatform::new(None);
    let (quit, exited) = quit_with_hook();
    let executor = InstallExecutor::new(&platform, quit.clone(), FORCED_EXIT_DELAY);

    executor
        .install_and_restart(&update_info(Path::new("/tmp")))
        .unwrap();

    assert!(quit.is_update_quit());
    assert_eq!(*platform.calls.lock().unwrap(), vec!["primary"]);

    // The safety net fires once the primary path fails to exit in time.
    assert!(!exited.load(Ordering::SeqCst));
    tokio::time::sleep(FORCED_EXIT_DELAY * 4).await;
    assert!(exited.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_primary_falls_back_to_cached_artifact() {
    let cache = tempfile::tempdir().unwrap();
    let candidate = cache.path().join("harbor-update-2.0.0");
    std::fs::create_dir_all(&candidate).unwrap();

    let mut platform = ScriptedPlatform::new(Some(cache.path().to_path_buf()));
    platform.primary_fails = true;
    let (quit, exited) = quit_with_hook();
    let executor = InstallExecutor::new(&platform, quit, FORCED_EXIT_DELAY);

    executor
        .install_and_restart(&update_info(cache.path()))
        .unwrap();

    let calls = platform.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "primary".to_string(),
            format!("replace:{}", candidate.display()),
            "relaunch".to_string(),
        ]
    );
    // The consumed artifact is gone and the process exited.
    assert!(!candidate.exists());
    assert!(exited.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_fallback_support_surfaces_error_and_keeps_running() {
    let mut platform = ScriptedPlatform::new(None);
    platform.primary_fails = true;
    platform.supports_fallback = false;
    let (quit, exited) = quit_with_hook();
    let executor = InstallExecutor::new(&platform, quit, FORCED_EXIT_DELAY);

    let err = executor
        .install_and_restart(&update_info(Path::new("/tmp")))
        .unwrap_err();

    assert!(matches!(err, InstallError::Unsupported(_)));
    tokio::time::sleep(FORCED_EXIT_DELAY * 4).await;
    assert!(!exited.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fallback_with_empty_cache_reports_no_candidate() {
    let cache = tempfile::tempdir().unwrap();
    let mut platform = ScriptedPlatform::new(Some(cache.path().to_path_buf()));
    platform.primary_fails = true;
    let (quit, _exited) = quit_with_hook();
    let executor = InstallExecutor::new(&platform, quit, FORCED_EXIT_DELAY);

    let err = executor
        .install_and_restart(&update_info(cache.path()))
        .unwrap_err();

    assert!(matches!(err, InstallError::NoCandidate(_)));
}

#[test]
fn test_select_candidate_picks_newest_artifact() {
    let cache = tempfile::tempdir().unwrap();
    let older = cache.path().join("harbor-update-1.9.0");
    std::fs::create_dir_all(&older).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    let newer = cache.path().join("harbor-update-2.0.0");
    std::fs::create_dir_all(&newer).unwrap();

    let candidate = select_candidate(cache.path()).unwrap();
    assert_eq!(candidate.path, newer);
}

#[test]
fn test_select_candidate_ignores_unrelated_entries() {
    let cache = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(cache.path().join("some-other-dir")).unwrap();
    std::fs::write(cache.path().join("harbor-update-3.0.0"), b"a file").unwrap();
    let artifact = cache.path().join("harbor-update-2.0.0");
    std::fs::create_dir_all(&artifact).unwrap();

    let candidate = select_candidate(cache.path()).unwrap();
    assert_eq!(candidate.path, artifact);
}

#[test]
fn test_select_candidate_with_no_artifacts() {
    let cache = tempfile::tempdir().unwrap();
    let err = select_candidate(cache.path()).unwrap_err();
    assert!(matches!(err, InstallError::NoCandidate(_)));
}
