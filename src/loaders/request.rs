use futures::channel::oneshot;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Where a load is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// Completed successfully and handed to the caller
    Done,
    Failed,
}

/// Sending half of a [`LoadRequest`]; completing consumes it
pub struct Completer<T> {
    sender: oneshot::Sender<Result<T, AssetError>>,
}

impl<T> Completer<T> {
    pub fn complete(self, result: Result<T, AssetError>) {
        // The request may already be abandoned; the result is then dropped.
        let _ = self.sender.send(result);
    }
}

/// Asynchronous load of one asset that completes at most once.
///
/// The decode runs elsewhere; the owner polls from its own thread, so the
/// result is always consumed on the thread that owns the scene.
pub struct LoadRequest<T> {
    label: &'static str,
    path: PathBuf,
    state: LoadState,
    receiver: Option<oneshot::Receiver<Result<T, AssetError>>>,
}

impl<T: Send + 'static> LoadRequest<T> {
    pub fn new(label: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            label,
            path: path.into(),
            state: LoadState::Idle,
            receiver: None,
        }
    }

    /// Move to `Loading` and hand out the completion side
    pub fn begin(&mut self) -> Completer<T> {
        let (sender, receiver) = oneshot::channel();
        self.receiver = Some(receiver);
        self.state = LoadState::Loading;
        Completer { sender }
    }

    /// Run `decode` on a worker thread
    pub fn spawn<F>(&mut self, decode: F)
    where
        F: FnOnce(&Path) -> Result<T, AssetError> + Send + 'static,
    {
        let completer = self.begin();
        let path = self.path.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{}-loader", self.label))
            .spawn(move || completer.complete(decode(&path)));

        // On failure the closure, and with it the completer, is dropped; the
        // next poll then reports the load as cancelled.
        if let Err(e) = spawned {
            log::error!("Failed to start {} loader thread: {}", self.label, e);
        }
    }

    /// Non-blocking check for completion. Yields the result exactly once.
    pub fn poll(&mut self) -> Option<Result<T, AssetError>> {
        let receiver = self.receiver.as_mut()?;
        let result = match receiver.try_recv() {
            Ok(None) => return None,
            Ok(Some(result)) => result,
            Err(oneshot::Canceled) => Err(AssetError::Cancelled),
        };

        self.receiver = None;
        self.state = match result {
            Ok(_) => LoadState::Done,
            Err(_) => LoadState::Failed,
        };
        Some(result)
    }

    /// Stop waiting for the result; a late completion is discarded
    pub fn abandon(&mut self) {
        if self.receiver.take().is_some() {
            log::debug!("Abandoned in-flight {} load of {:?}", self.label, self.path);
            self.state = LoadState::Failed;
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait<T: Send + 'static>(request: &mut LoadRequest<T>) -> Result<T, AssetError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = request.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "load did not complete");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn starts_idle() {
        let request: LoadRequest<u32> = LoadRequest::new("test", "a.bin");
        assert_eq!(request.state(), LoadState::Idle);
        assert!(!request.is_pending());
    }

    #[test]
    fn completes_once() {
        let mut request = LoadRequest::new("test", "a.bin");
        let completer = request.begin();
        assert_eq!(request.state(), LoadState::Loading);
        assert!(request.poll().is_none());

        completer.complete(Ok(7u32));
        assert_eq!(request.poll().unwrap().unwrap(), 7);
        assert_eq!(request.state(), LoadState::Done);
        assert!(request.poll().is_none());
    }

    #[test]
    fn failure_is_reported() {
        let mut request: LoadRequest<u32> = LoadRequest::new("test", "a.bin");
        request.begin().complete(Err(AssetError::decode("a.bin", "bad")));
        assert!(request.poll().unwrap().is_err());
        assert_eq!(request.state(), LoadState::Failed);
    }

    #[test]
    fn dropped_completer_is_cancellation() {
        let mut request: LoadRequest<u32> = LoadRequest::new("test", "a.bin");
        drop(request.begin());
        assert!(matches!(request.poll(), Some(Err(AssetError::Cancelled))));
        assert_eq!(request.state(), LoadState::Failed);
    }

    #[test]
    fn spawned_decode_runs_off_thread() {
        let caller = std::thread::current().id();
        let mut request = LoadRequest::new("test", "asset.bin");
        request.spawn(move |path| {
            assert_ne!(std::thread::current().id(), caller);
            Ok(path.to_string_lossy().into_owned())
        });

        assert_eq!(wait(&mut request).unwrap(), "asset.bin");
        assert_eq!(request.state(), LoadState::Done);
    }

    #[test]
    fn panicking_decoder_reads_as_cancelled() {
        let mut request: LoadRequest<u32> = LoadRequest::new("test", "asset.bin");
        request.spawn(|_| panic!("decoder blew up"));
        assert!(matches!(wait(&mut request), Err(AssetError::Cancelled)));
    }

    #[test]
    fn abandoned_request_ignores_late_result() {
        let mut request = LoadRequest::new("test", "a.bin");
        let completer = request.begin();
        request.abandon();
        completer.complete(Ok(1u32));
        assert!(request.poll().is_none());
        assert_eq!(request.state(), LoadState::Failed);
    }
}
