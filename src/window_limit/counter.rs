use std::sync::atomic::{AtomicUsize, Ordering};

/// Count of admissions in the current window.
///
/// Admits and resets are single atomic operations, so a reset racing an admit
/// leaves either `0` or `1` behind and the count never exceeds the limit it was
/// admitted against.
#[derive(Debug, Default)]
pub struct WindowCounter {
    admitted: AtomicUsize,
}

impl WindowCounter {
    pub const fn new() -> Self {
        Self {
            admitted: AtomicUsize::new(0),
        }
    }

    /// Reserve one slot if fewer than `limit` have been taken this window.
    pub fn try_admit(&self, limit: usize) -> bool {
        self.admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < limit).then_some(current + 1)
            })
            .is_ok()
    }

    /// Start a new window. Returns how many slots the previous window handed out.
    pub fn reset(&self) -> usize {
        self.admitted.swap(0, Ordering::AcqRel)
    }

    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }
}
