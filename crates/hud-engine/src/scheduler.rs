//! Debounced, non-reentrant rebuild scheduler.
//!
//! Triggers arriving while idle start (or restart) the debounce window; the
//! latest trigger wins. Triggers arriving while a rebuild runs are folded
//! into a single rerun slot, so any number of them produce exactly one
//! further rebuild once the current one finishes.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use hud_protocol::RefreshTrigger;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::timer::DebounceTimer;

/// The rebuild pipeline invoked by the scheduler.
pub type RebuildFn = Arc<dyn Fn(RefreshTrigger) -> BoxFuture<'static, ()> + Send + Sync>;

/// Mutable scheduler state.
#[derive(Debug, Default)]
struct SchedulerState {
    /// Trigger waiting for the debounce window to elapse.
    pending: Option<RefreshTrigger>,
    /// True while a rebuild runs.
    updating: bool,
    /// Latest trigger that arrived during a rebuild.
    rerun: Option<RefreshTrigger>,
    /// Debounce window.
    debounce: Duration,
    /// Completed rebuilds, for diagnostics.
    completed: u64,
}

/// Shared scheduler internals.
struct Inner {
    /// State guarded by a short-lived lock.
    state: Mutex<SchedulerState>,
    /// Debounce timer.
    timer: DebounceTimer,
    /// Pipeline to run.
    run: RebuildFn,
}

/// Debounced update scheduler. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    /// Shared internals.
    inner: Arc<Inner>,
}

/// Clears the updating flag when a rebuild ends, however it ends.
struct UpdatingGuard {
    /// Scheduler to release.
    scheduler: Scheduler,
}

impl Drop for UpdatingGuard {
    fn drop(&mut self) {
        self.scheduler.finish();
    }
}

impl Scheduler {
    /// Create a scheduler that runs `run` after `debounce` of quiet.
    pub fn new(debounce: Duration, run: RebuildFn) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState {
                    debounce,
                    ..SchedulerState::default()
                }),
                timer: DebounceTimer::new(),
                run,
            }),
        }
    }

    /// Request a rebuild. Never blocks.
    pub fn request(&self, trigger: RefreshTrigger) {
        let mut st = self.inner.state.lock();
        if st.updating {
            trace!(%trigger, "rebuild_in_flight_merged");
            st.rerun = Some(trigger);
            return;
        }
        if st.pending.is_some() {
            trace!(%trigger, "debounce_restart");
        }
        st.pending = Some(trigger);
        let delay = st.debounce;
        drop(st);
        self.arm(delay);
    }

    /// Change the debounce window for subsequent requests.
    pub fn set_debounce(&self, debounce: Duration) {
        self.inner.state.lock().debounce = debounce;
    }

    /// True while a rebuild runs.
    pub fn is_updating(&self) -> bool {
        self.inner.state.lock().updating
    }

    /// True while a trigger waits for its debounce window.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Number of rebuilds that have finished.
    pub fn completed(&self) -> u64 {
        self.inner.state.lock().completed
    }

    /// Drop any pending trigger without running it.
    pub fn cancel_pending(&self) {
        self.inner.timer.stop();
        let mut st = self.inner.state.lock();
        st.pending = None;
        st.rerun = None;
    }

    /// Restart the debounce window.
    fn arm(&self, delay: Duration) {
        let this = self.clone();
        self.inner.timer.schedule(delay, move || this.fire());
    }

    /// Debounce window elapsed: run the pipeline with the latest trigger.
    async fn fire(self) {
        let trigger = {
            let mut st = self.inner.state.lock();
            if st.updating {
                return;
            }
            let Some(trigger) = st.pending.take() else {
                return;
            };
            st.updating = true;
            trigger
        };
        debug!(%trigger, "rebuild_start");
        let _guard = UpdatingGuard {
            scheduler: self.clone(),
        };
        (self.inner.run)(trigger).await;
    }

    /// Rebuild finished: release the guard and schedule a rerun if needed.
    fn finish(&self) {
        let mut st = self.inner.state.lock();
        st.updating = false;
        st.completed += 1;
        if let Some(trigger) = st.rerun.take() {
            debug!(%trigger, "rebuild_rerun");
            st.pending = Some(trigger);
            let delay = st.debounce;
            drop(st);
            self.arm(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use tokio::time;

    use super::*;

    /// A scheduler whose pipeline takes `work` and records each trigger.
    fn recording(
        work: Duration,
    ) -> (
        Scheduler,
        Arc<Mutex<Vec<RefreshTrigger>>>,
        Arc<AtomicUsize>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let (seen2, max2) = (seen.clone(), max.clone());
        let run: RebuildFn = Arc::new(move |trigger| {
            let seen = seen2.clone();
            let concurrent = concurrent.clone();
            let max = max2.clone();
            async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                time::sleep(work).await;
                seen.lock().push(trigger);
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }
            .boxed()
        });
        (Scheduler::new(Duration::from_millis(20), run), seen, max)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_to_latest() {
        let (s, seen, _) = recording(Duration::from_millis(5));
        for i in 0..5 {
            s.request(RefreshTrigger::manual(format!("t{i}")));
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(s.is_pending());
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*seen.lock(), vec![RefreshTrigger::manual("t4")]);
        assert!(!s.is_updating());
    }

    #[tokio::test(start_paused = true)]
    async fn requests_during_rebuild_yield_one_rerun() {
        let (s, seen, max) = recording(Duration::from_millis(50));
        s.request(RefreshTrigger::manual("first"));
        time::sleep(Duration::from_millis(30)).await;
        assert!(s.is_updating());
        for i in 0..8 {
            s.request(RefreshTrigger::manual(format!("during{i}")));
        }
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            *seen.lock(),
            vec![
                RefreshTrigger::manual("first"),
                RefreshTrigger::manual("during7")
            ]
        );
        assert_eq!(max.load(Ordering::SeqCst), 1);
        assert_eq!(s.completed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_drops_trigger() {
        let (s, seen, _) = recording(Duration::from_millis(1));
        s.request(RefreshTrigger::SettingsChanged);
        s.cancel_pending();
        time::sleep(Duration::from_millis(100)).await;
        assert!(seen.lock().is_empty());
    }
}
