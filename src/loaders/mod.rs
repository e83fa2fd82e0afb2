pub mod fbx;
pub mod gltf;

pub use self::fbx::{load_fbx, parse_fbx};
pub use self::gltf::load_gltf;

use std::path::{Path, PathBuf};
use std::thread;

use futures::channel::oneshot;

use crate::error::{Result, SceneError};

/// Runs a blocking loader on a worker thread and resolves exactly once
/// with its result. Failures are logged and surface as
/// [`SceneError::AssetLoad`].
pub async fn load_in_background<T, F>(path: impl Into<PathBuf>, kind: &'static str, load: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> anyhow::Result<T> + Send + 'static,
{
    let path = path.into();
    let (tx, rx) = oneshot::channel();

    let worker_path = path.clone();
    let spawned = thread::Builder::new()
        .name(format!("{kind}-loader"))
        .spawn(move || {
            // The receiver may be gone if the caller stopped waiting
            let _ = tx.send(load(&worker_path));
        });
    if let Err(e) = spawned {
        log::error!("could not start {kind} loader for {:?}: {e}", path);
        return Err(SceneError::asset(path, e));
    }

    match rx.await {
        Ok(Ok(asset)) => {
            log::debug!("{kind} loaded: {:?}", path);
            Ok(asset)
        }
        Ok(Err(err)) => {
            log::error!("{kind} load failed: {:?}: {err:#}", path);
            Err(SceneError::asset(path, format!("{err:#}")))
        }
        Err(oneshot::Canceled) => {
            log::error!("{kind} loader for {:?} exited without a result", path);
            Err(SceneError::asset(path, "loader thread exited without a result"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_success() {
        let value = pollster::block_on(load_in_background("a.bin", "test", |_| Ok(42))).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_background_failure_keeps_path() {
        let err = pollster::block_on(load_in_background::<(), _>("missing.bin", "test", |p| {
            anyhow::bail!("no such file {:?}", p)
        }))
        .unwrap_err();
        match err {
            SceneError::AssetLoad { path, reason } => {
                assert_eq!(path, PathBuf::from("missing.bin"));
                assert!(reason.contains("no such file"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_panicking_loader_resolves_with_error() {
        let result = pollster::block_on(load_in_background::<(), _>("boom.bin", "test", |_| panic!("loader crashed")));
        assert!(matches!(result, Err(SceneError::AssetLoad { .. })));
    }
}
