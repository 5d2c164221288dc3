use crossbeam::channel::{Receiver, Sender, bounded};
use crossbeam::select;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Write-once broadcast flag shared by every pipeline stage
///
/// The signal pairs an atomic flag (for cheap, non-blocking reads) with a
/// zero-capacity channel whose only sender is dropped when the signal fires.
/// A disconnected receiver is immediately ready, so any stage blocked in a
/// `select!` against [`CancellationSignal::done`] wakes up as soon as the
/// signal fires.
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug)]
struct SignalInner {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (trigger, done) = bounded(0);
        Self {
            inner: Arc::new(SignalInner {
                fired: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                done,
            }),
        }
    }

    /// Fire the signal. Returns `true` only for the call that actually fired it.
    pub fn cancel(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }

        let trigger = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(trigger);

        tracing::debug!("cancellation signal fired");
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    /// Nothing is ever sent on it.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until either signal fires. If `self` fired first, fire `target` too.
    ///
    /// `target` firing never touches `self`.
    pub(crate) fn relay_to(&self, target: &CancellationSignal) {
        if self.is_cancelled() {
            target.cancel();
            return;
        }

        select! {
            recv(self.done()) -> _ => {
                if target.cancel() {
                    tracing::debug!("external cancellation relayed to run");
                }
            }
            recv(target.done()) -> _ => {}
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Fires the wrapped signal when dropped, including during unwinding
pub(crate) struct CancelOnDrop<'a>(pub(crate) &'a CancellationSignal);

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_clear() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        assert!(signal.done().try_recv().is_err());
        assert!(
            signal
                .done()
                .recv_timeout(Duration::from_millis(20))
                .unwrap_err()
                .is_timeout()
        );
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let signal = CancellationSignal::new();
        assert!(signal.cancel());
        assert!(!signal.cancel());
        assert!(!signal.clone().cancel());
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_done_disconnects_on_cancel() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();

        let waiter = std::thread::spawn(move || observer.done().recv().is_err());
        std::thread::sleep(Duration::from_millis(10));
        signal.cancel();

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_concurrent_cancel_fires_once() {
        let signal = CancellationSignal::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || signal.cancel())
            })
            .collect();

        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_relay_forwards_source_cancel() {
        let source = CancellationSignal::new();
        let target = CancellationSignal::new();

        let relay = {
            let (source, target) = (source.clone(), target.clone());
            std::thread::spawn(move || source.relay_to(&target))
        };
        std::thread::sleep(Duration::from_millis(10));
        source.cancel();
        relay.join().unwrap();

        assert!(target.is_cancelled());
    }

    #[test]
    fn test_relay_leaves_source_untouched() {
        let source = CancellationSignal::new();
        let target = CancellationSignal::new();

        let relay = {
            let (source, target) = (source.clone(), target.clone());
            std::thread::spawn(move || source.relay_to(&target))
        };
        target.cancel();
        relay.join().unwrap();

        assert!(!source.is_cancelled());
        assert!(source.cancel());
    }

    #[test]
    fn test_cancel_on_drop_guard() {
        let signal = CancellationSignal::new();
        {
            let _guard = CancelOnDrop(&signal);
        }
        assert!(signal.is_cancelled());
    }
}
