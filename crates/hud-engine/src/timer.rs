//! Single-slot cancellable timer.
//!
//! At most one window is live at a time. Scheduling a new window cancels the
//! previous one. A window that loses a race with [`DebounceTimer::cancel`]
//! never fires, even if its sleep had already elapsed: the firing task
//! re-checks its sequence number under the lock before running the callback.

use std::{future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Identifies one scheduled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    /// Sequence number of the window.
    seq: u64,
}

/// The live window, if any.
struct Slot {
    /// Sequence number of the live window.
    seq: u64,
    /// Cancels the live window's sleep.
    token: CancellationToken,
}

/// Timer state shared with the spawned tasks.
#[derive(Default)]
struct TimerState {
    /// Last issued sequence number.
    next_seq: u64,
    /// The live window.
    live: Option<Slot>,
}

/// Cancellable one-shot timer holding at most one live window.
#[derive(Clone, Default)]
pub struct DebounceTimer {
    /// Shared state.
    state: Arc<Mutex<TimerState>>,
}

impl DebounceTimer {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a window is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.state.lock().live.is_some()
    }

    /// Run `on_fire` after `delay`, replacing any live window.
    pub fn schedule<F, Fut>(&self, delay: Duration, on_fire: F) -> TimerHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let seq = {
            let mut st = self.state.lock();
            st.next_seq += 1;
            let seq = st.next_seq;
            if let Some(prev) = st.live.replace(Slot {
                seq,
                token: token.clone(),
            }) {
                prev.token.cancel();
                trace!(prev = prev.seq, seq, "timer_replaced");
            }
            seq
        };

        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => {
                    trace!(seq, "timer_cancelled");
                    return;
                }
            }
            {
                let mut st = state.lock();
                match &st.live {
                    Some(slot) if slot.seq == seq => st.live = None,
                    _ => {
                        trace!(seq, "timer_stale");
                        return;
                    }
                }
            }
            trace!(seq, delay_ms = delay.as_millis() as u64, "timer_fire");
            on_fire().await;
        });
        TimerHandle { seq }
    }

    /// Cancel `handle` if it is still the live window.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let mut st = self.state.lock();
        match &st.live {
            Some(slot) if slot.seq == handle.seq => {
                if let Some(slot) = st.live.take() {
                    slot.token.cancel();
                }
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever window is live.
    pub fn stop(&self) -> bool {
        match self.state.lock().live.take() {
            Some(slot) => {
                slot.token.cancel();
                true
            }
            None => false,
        }
    }
}
