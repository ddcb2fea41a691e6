// crates/epe-store/src/inflight.rs
//
// Per-action in-flight tokens.
//
// Each action name (e.g. "annotate", "search") has at most one live
// invocation. Starting a new invocation of the same action supersedes the
// pending one: its future is dropped and it resolves to
// `EditionError::Superseded`. Different actions never affect each other.
//
// A registry only has effect when it is shared across overlapping calls, so it
// belongs to a long-lived client holding one `RemoteWorkspace`. The one-shot
// `epe remote` command issues a single request sequence and does not use it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use epe_core::error::EditionError;

#[derive(Debug)]
struct Slot {
    generation: u64,
    cancel: Arc<Notify>,
}

/// Registry of the live invocation per action.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    slots: Mutex<HashMap<String, Slot>>,
    next_generation: Mutex<u64>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new invocation of `action`, cancelling the previous one.
    fn begin(&self, action: &str) -> (u64, Arc<Notify>) {
        let generation = {
            let mut next = self.next_generation.lock().expect("Mutex poisoned");
            *next += 1;
            *next
        };
        let cancel = Arc::new(Notify::new());

        let mut slots = self.slots.lock().expect("Mutex poisoned");
        let previous = slots.insert(
            action.to_string(),
            Slot {
                generation,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(action, superseded = previous.generation, "Superseding in-flight request");
            previous.cancel.notify_one();
        }
        (generation, cancel)
    }

    /// Drop the slot if it still belongs to `generation`.
    fn finish(&self, action: &str, generation: u64) {
        let mut slots = self.slots.lock().expect("Mutex poisoned");
        if slots.get(action).map(|s| s.generation) == Some(generation) {
            slots.remove(action);
        }
    }

    /// Whether an invocation of `action` is pending.
    pub fn is_pending(&self, action: &str) -> bool {
        self.slots.lock().expect("Mutex poisoned").contains_key(action)
    }

    /// Run `fut` as the live invocation of `action`.
    ///
    /// Resolves to the future's result, or to `Superseded` if another `run`
    /// for the same action starts before it completes.
    pub async fn run<T, F>(&self, action: &str, fut: F) -> Result<T, EditionError>
    where
        F: Future<Output = Result<T, EditionError>>,
    {
        let (generation, cancel) = self.begin(action);

        let result = tokio::select! {
            biased;
            _ = cancel.notified() => Err(EditionError::Superseded(action.to_string())),
            result = fut => result,
        };

        self.finish(action, generation);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn completes_when_not_superseded() {
        let registry = InFlightRegistry::new();
        let value = registry.run("search", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!registry.is_pending("search"));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let registry = InFlightRegistry::new();
        let err = registry
            .run::<(), _>("annotate", async {
                Err(EditionError::RemoteRequest("nope".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, EditionError::RemoteRequest("nope".into()));
    }

    #[tokio::test]
    async fn newer_invocation_supersedes_pending_one() {
        let registry = Arc::new(InFlightRegistry::new());
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .run("annotate", async move {
                        let _ = release_rx.await;
                        Ok("first")
                    })
                    .await
            })
        };

        while !registry.is_pending("annotate") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = registry.run("annotate", async { Ok("second") }).await;

        assert_eq!(second.unwrap(), "second");
        assert_eq!(
            first.await.unwrap().unwrap_err(),
            EditionError::Superseded("annotate".into())
        );
        drop(release_tx);
        assert!(!registry.is_pending("annotate"));
    }

    #[tokio::test]
    async fn different_actions_are_independent() {
        let registry = Arc::new(InFlightRegistry::new());
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let search = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .run("search", async move {
                        let _ = release_rx.await;
                        Ok(1)
                    })
                    .await
            })
        };

        while !registry.is_pending("search") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        registry.run("compare", async { Ok(2) }).await.unwrap();
        release_tx.send(()).unwrap();

        assert_eq!(search.await.unwrap().unwrap(), 1);
    }
}
