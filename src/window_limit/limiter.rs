use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use snafu::{OptionExt, ensure};
use tokio::{
    runtime::Handle,
    sync::Notify,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::{
    InterruptedSnafu, InvalidSettingsSnafu, LimitError, NoRuntimeSnafu, WindowCounter,
    WindowLimitSettings,
    internal_event::{
        WindowAdmission, WindowAdmissionHandle, WindowReset, WindowResetHandle, WindowSaturated,
        WindowSaturatedHandle,
    },
};

/// Admission gate over a [`WindowCounter`] that resets every window.
///
/// The limiter owns the background task that resets the counter. The task is
/// cancelled by [`Limiter::shutdown`] or when the limiter is dropped. Share a
/// limiter between callers with an `Arc`.
#[derive(Debug)]
pub struct Limiter {
    shared: Arc<Shared>,
    reset_task: JoinHandle<()>,
}

#[derive(Debug)]
struct Shared {
    settings: WindowLimitSettings,
    counter: WindowCounter,
    capacity_freed: Notify,
    shut_down: AtomicBool,
    events: Events,
}

#[derive(Clone)]
struct Events {
    admission: WindowAdmissionHandle,
    saturated: WindowSaturatedHandle,
    reset: WindowResetHandle,
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events").finish_non_exhaustive()
    }
}

impl Limiter {
    /// Build a limiter admitting `max_requests` per `window`.
    ///
    /// The reset task is spawned on the current tokio runtime; outside of one this
    /// fails with [`LimitError::NoRuntime`].
    pub fn new(window: Duration, max_requests: usize) -> Result<Self, LimitError> {
        Self::with_settings(
            WindowLimitSettings::builder()
                .window(window)
                .max_requests(max_requests)
                .build(),
        )
    }

    pub fn with_settings(settings: WindowLimitSettings) -> Result<Self, LimitError> {
        settings.validate()?;
        let runtime = Handle::try_current().ok().context(NoRuntimeSnafu)?;
        // The fresh counter is the reset at time zero; the first scheduled reset
        // lands one window later.
        let first_reset = Instant::now()
            .checked_add(settings.window)
            .context(InvalidSettingsSnafu {
                details: "window too large",
            })?;

        let shared = Arc::new(Shared {
            settings,
            counter: WindowCounter::new(),
            capacity_freed: Notify::new(),
            shut_down: AtomicBool::new(false),
            events: Events {
                admission: WindowAdmission.register(),
                saturated: WindowSaturated.register(),
                reset: WindowReset.register(),
            },
        });

        let reset_task = runtime.spawn(run_resets(Arc::clone(&shared), first_reset));

        debug!(
            message = "Window limiter started.",
            window_ms = settings.window.as_millis(),
            max_requests = settings.max_requests,
        );

        Ok(Self { shared, reset_task })
    }

    /// Wait until the current window has a free slot and reserve it.
    ///
    /// A waiting caller wakes on every reset and at least once per window, and
    /// re-checks capacity each time; being woken does not imply admission.
    /// Dropping the returned future gives up the wait without reserving anything.
    pub async fn acquire(&self) -> Result<(), LimitError> {
        let shared = &self.shared;
        let limit = shared.settings.max_requests;
        let started = Instant::now();
        let mut reported_saturation = false;

        loop {
            // Register for the next reset before checking, so a reset landing
            // between the check and the wait still wakes us.
            let notified = shared.capacity_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            ensure!(!shared.shut_down.load(Ordering::Acquire), InterruptedSnafu);

            if shared.counter.try_admit(limit) {
                shared.events.admission.emit(started.elapsed());
                return Ok(());
            }

            if !reported_saturation {
                shared.events.saturated.emit(limit);
                reported_saturation = true;
            }

            // Either outcome leads back to the capacity check.
            let _ = time::timeout(shared.settings.window, notified).await;
        }
    }

    /// Stop the reset task and release every waiting caller with
    /// [`LimitError::Interrupted`]. Later calls to [`Limiter::acquire`] fail the
    /// same way.
    pub fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.reset_task.abort();
        self.shared.capacity_freed.notify_waiters();
        info!(message = "Window limiter shut down.", admitted_in_window = self.admitted());
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }

    /// Slots handed out in the current window.
    pub fn admitted(&self) -> usize {
        self.shared.counter.admitted()
    }

    pub fn settings(&self) -> WindowLimitSettings {
        self.shared.settings
    }
}

impl Drop for Limiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_resets(shared: Arc<Shared>, first_reset: Instant) {
    let mut ticker = time::interval_at(first_reset, shared.settings.window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let admitted = shared.counter.reset();
        shared.events.reset.emit(admitted);
        shared.capacity_freed.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    /// Runs `callers` concurrent acquires and returns each admission's offset from
    /// the start, in admission order.
    async fn admission_offsets(limiter: Arc<Limiter>, callers: usize) -> Vec<Duration> {
        let start = Instant::now();
        let admitted = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                tokio::spawn(async move {
                    limiter.acquire().await.unwrap();
                    admitted.lock().unwrap().push(start.elapsed());
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        admitted.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn third_caller_waits_for_next_window() {
        let limiter = Arc::new(Limiter::new(WINDOW, 2).unwrap());

        let offsets = admission_offsets(limiter, 3).await;

        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets.iter().filter(|o| o.is_zero()).count(), 2);
        let late = offsets.iter().max().unwrap();
        assert!(*late >= WINDOW && *late < WINDOW * 2, "late admission at {late:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn no_window_admits_more_than_limit() {
        let limiter = Arc::new(Limiter::new(WINDOW, 3).unwrap());

        let offsets = admission_offsets(limiter, 10).await;

        let mut per_window = [0usize; 8];
        for offset in &offsets {
            per_window[offset.as_secs() as usize] += 1;
        }
        assert_eq!(&per_window[..5], &[3, 3, 3, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn woken_waiters_recheck_capacity() {
        let limiter = Arc::new(Limiter::new(WINDOW, 1).unwrap());
        limiter.acquire().await.unwrap();

        // Both waiters are woken by the first reset but only one slot opens.
        let mut offsets = admission_offsets(Arc::clone(&limiter), 2).await;
        offsets.sort();

        assert!(offsets[0] >= WINDOW && offsets[0] < WINDOW * 2);
        assert!(offsets[1] >= WINDOW * 2 && offsets[1] < WINDOW * 3);
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_reopens_window_without_waiters() {
        let limiter = Limiter::new(WINDOW, 2).unwrap();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        assert_eq!(limiter.admitted(), 2);

        time::sleep(WINDOW + Duration::from_millis(1)).await;

        assert_eq!(limiter.admitted(), 0);
        let mut next = task::spawn(limiter.acquire());
        assert_ready_ok!(next.poll());
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_acquire_completes_after_reset() {
        let limiter = Limiter::new(WINDOW, 1).unwrap();
        limiter.acquire().await.unwrap();

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        time::advance(WINDOW / 2).await;
        assert_pending!(waiting.poll());

        time::sleep(WINDOW).await;
        assert!(waiting.is_woken());
        assert_ready_ok!(waiting.poll());
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_pending_acquire_reserves_nothing() {
        let limiter = Limiter::new(WINDOW, 1).unwrap();
        limiter.acquire().await.unwrap();

        let timed_out = time::timeout(WINDOW / 4, limiter.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(limiter.admitted(), 1);

        time::sleep(WINDOW).await;
        assert_eq!(limiter.admitted(), 0);
        limiter.acquire().await.unwrap();
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_waiters() {
        let limiter = Limiter::new(WINDOW, 1).unwrap();
        limiter.acquire().await.unwrap();

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        limiter.shutdown();
        assert!(waiting.is_woken());
        let err = assert_ready_err!(waiting.poll());
        assert!(matches!(err, LimitError::Interrupted));
        drop(waiting);

        assert!(limiter.is_shut_down());
        assert!(matches!(
            limiter.acquire().await,
            Err(LimitError::Interrupted)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_resets() {
        let limiter = Limiter::new(WINDOW, 1).unwrap();
        limiter.acquire().await.unwrap();
        limiter.shutdown();
        limiter.shutdown();

        time::sleep(WINDOW * 3).await;
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_settings() {
        assert!(matches!(
            Limiter::new(Duration::ZERO, 1),
            Err(LimitError::InvalidSettings { .. })
        ));
        assert!(matches!(
            Limiter::new(WINDOW, 0),
            Err(LimitError::InvalidSettings { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_window_past_the_clock_range() {
        let err = Limiter::new(Duration::MAX, 1).unwrap_err();
        assert!(matches!(
            err,
            LimitError::InvalidSettings {
                details: "window too large"
            }
        ));
    }

    #[test]
    fn fails_without_runtime() {
        assert!(matches!(
            Limiter::new(WINDOW, 1),
            Err(LimitError::NoRuntime)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_get_exactly_the_limit() {
        let limiter = Arc::new(Limiter::new(Duration::from_secs(60), 5).unwrap());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    time::timeout(Duration::from_millis(200), limiter.acquire())
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
        assert_eq!(limiter.admitted(), 5);
    }
}
