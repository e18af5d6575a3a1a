use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::debug;

type Completion<T> = (u64, Result<T, String>);

/// One in-flight background request at a time. Issuing again supersedes the
/// previous request; its late completion is dropped on `poll`.
pub(super) struct RequestSlot<T> {
    name: &'static str,
    generation: u64,
    pending: bool,
    tx: Sender<Completion<T>>,
    rx: Receiver<Completion<T>>,
}

impl<T: Send + 'static> RequestSlot<T> {
    pub(super) fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            name,
            generation: 0,
            pending: false,
            tx,
            rx,
        }
    }

    pub(super) fn issue<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.generation += 1;
        self.pending = true;

        let generation = self.generation;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = job().map_err(|error| format!("{error:#}"));
            let _ = tx.send((generation, result));
        });

        generation
    }

    pub(super) fn poll(&mut self) -> Option<Result<T, String>> {
        while let Ok((generation, result)) = self.rx.try_recv() {
            if generation == self.generation && self.pending {
                self.pending = false;
                return Some(result);
            }
            debug!(
                "{}: dropping stale completion {generation} (latest {})",
                self.name, self.generation
            );
        }
        None
    }

    pub(super) fn is_pending(&self) -> bool {
        self.pending
    }

    pub(super) fn cancel(&mut self) {
        if self.pending {
            self.generation += 1;
            self.pending = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for<T: Send + 'static>(slot: &mut RequestSlot<T>) -> Option<Result<T, String>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(result) = slot.poll() {
                return Some(result);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn newer_request_supersedes_a_slower_older_one() {
        let mut slot = RequestSlot::new("test");
        slot.issue(|| {
            thread::sleep(Duration::from_millis(150));
            Ok("slow")
        });
        slot.issue(|| Ok("fast"));

        assert_eq!(wait_for(&mut slot), Some(Ok("fast")));
        assert!(!slot.is_pending());

        thread::sleep(Duration::from_millis(300));
        assert_eq!(slot.poll(), None);
    }

    #[test]
    fn errors_are_rendered_with_context() {
        let mut slot: RequestSlot<()> = RequestSlot::new("test");
        slot.issue(|| Err(anyhow::anyhow!("connection refused")).map_err(|e| e.context("fetching graph")));

        assert_eq!(
            wait_for(&mut slot),
            Some(Err("fetching graph: connection refused".to_owned()))
        );
    }

    #[test]
    fn cancelled_request_never_completes() {
        let mut slot = RequestSlot::new("test");
        slot.issue(|| {
            thread::sleep(Duration::from_millis(20));
            Ok(1)
        });
        slot.cancel();
        assert!(!slot.is_pending());

        thread::sleep(Duration::from_millis(100));
        assert_eq!(slot.poll(), None);
    }
}
