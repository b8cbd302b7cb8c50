use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop signal shared between a source instance and its host.
///
/// Polled at the top of every work-loop iteration, before a fetch is issued.
/// An in-flight fetch is never aborted; the loop observes the signal on its
/// next iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::CancelSignal;

    #[test]
    fn clones_share_the_flag() {
        let signal = CancelSignal::new();
        let clone = signal.clone();

        assert_eq!(false, clone.is_cancelled());
        signal.cancel();
        assert_eq!(true, clone.is_cancelled());
    }
}
