//! Debounced ambient music state machine
//!
//! Two signals feed the controller: the set of running games and whether the
//! theme selection UI is open. Both may change in quick succession and some
//! updates are applied after a delay, so every delayed application is checked
//! against a logical clock before it touches the state.
//!
//! - Selection UI: opening applies at once; closing applies after
//!   `dismiss_delay`, unless a more recent call was accepted meanwhile.
//! - Sessions: a non-empty set applies at once. When the last game stops,
//!   pause is re-asserted every `settle_interval` for `settle_window` before
//!   the state is applied. The ambient element may be recreated by the host
//!   during that window, and a single pause can land before it exists. The
//!   repetition works around that race; it is not a synchronization
//!   guarantee.

use crate::{AmbientSlot, AmbientState, AmbientTimings, SessionId};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, trace};

const EVENT_CAPACITY: usize = 64;

struct Tracked {
    state: AmbientState,
    /// Logical time of the last accepted selection UI update
    last_accepted: u64,
    /// Sessions generation of the busy to idle settle still running
    settling: Option<u64>,
}

struct ControllerInner {
    tracked: Mutex<Tracked>,
    clock: AtomicU64,
    session_generation: AtomicU64,
    slot: AmbientSlot,
    timings: AmbientTimings,
    event_tx: broadcast::Sender<AmbientState>,
}

impl ControllerInner {
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current_sessions(&self, generation: u64) -> bool {
        self.session_generation.load(Ordering::SeqCst) == generation
    }

    /// Recomputes the effective state, drives the handle and notifies observers
    ///
    /// Called with the `tracked` guard held so side effects land in state order.
    fn apply_locked(&self, tracked: &Tracked) {
        let state = tracked.state.clone();
        let playing = state.should_play();
        self.slot.set_playing(playing);
        debug!(
            playing,
            sessions = state.active_sessions.len(),
            selection_ui_open = state.selection_ui_open,
            "Ambient state applied"
        );
        // no subscribers is fine
        let _ = self.event_tx.send(state);
    }

    /// Applies the current state unless sessions `generation` was superseded
    fn apply_if_current(&self, generation: u64) -> bool {
        let mut tracked = self.tracked.lock().unwrap();
        if !self.is_current_sessions(generation) {
            return false;
        }
        if tracked.settling == Some(generation) {
            tracked.settling = None;
        }
        self.apply_locked(&tracked);
        true
    }

    /// Accepts a selection UI update stamped `t` unless a newer one already landed
    fn accept_selection_ui(&self, open: bool, t: u64) -> bool {
        let mut tracked = self.tracked.lock().unwrap();
        if t < tracked.last_accepted {
            debug!(open, t, last_accepted = tracked.last_accepted, "Stale selection UI update rejected");
            return false;
        }
        tracked.state.selection_ui_open = open;
        tracked.last_accepted = t;
        self.apply_locked(&tracked);
        true
    }

    /// Re-asserts pause unless sessions `generation` was superseded
    fn pause_if_current(&self, generation: u64) -> bool {
        let _tracked = self.tracked.lock().unwrap();
        if !self.is_current_sessions(generation) {
            return false;
        }
        self.slot.pause();
        true
    }

    async fn settle(self: Arc<Self>, generation: u64) {
        let deadline = Instant::now() + self.timings.settle_window;
        let interval = self.timings.settle_interval.max(Duration::from_millis(1));
        let mut next = Instant::now();

        while next < deadline {
            if !self.pause_if_current(generation) {
                trace!(generation, "Settle superseded");
                return;
            }
            next += interval;
            sleep_until(next.min(deadline)).await;
        }

        if !self.apply_if_current(generation) {
            trace!(generation, "Settle superseded");
        }
    }

    async fn delayed_sessions_apply(self: Arc<Self>, generation: u64) {
        sleep(self.timings.settle_window).await;
        self.apply_if_current(generation);
    }
}

/// Decides when the ambient music plays
///
/// Cloning yields a handle to the same controller. Setters spawn their
/// delayed work on the current Tokio runtime and must be called from within
/// one.
#[derive(Clone)]
pub struct AmbientController {
    inner: Arc<ControllerInner>,
}

impl AmbientController {
    /// Creates a controller with an empty slot at full volume
    pub fn new(timings: AmbientTimings) -> Self {
        Self::with_slot(timings, AmbientSlot::default())
    }

    pub fn with_slot(timings: AmbientTimings, slot: AmbientSlot) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                tracked: Mutex::new(Tracked {
                    state: AmbientState::default(),
                    last_accepted: 0,
                    settling: None,
                }),
                clock: AtomicU64::new(0),
                session_generation: AtomicU64::new(0),
                slot,
                timings,
                event_tx: broadcast::channel(EVENT_CAPACITY).0,
            }),
        }
    }

    /// Replaces the set of running games
    ///
    /// A non-empty set pauses the ambient music right away and cancels any
    /// pending settle. Going from busy to idle starts the settle window; an
    /// idle update while that window runs leaves it untouched. Otherwise idle
    /// to idle applies after the same delay without re-asserting pause.
    pub fn set_active_sessions<I>(&self, sessions: I)
    where
        I: IntoIterator<Item = SessionId>,
    {
        let sessions: BTreeSet<SessionId> = sessions.into_iter().collect();
        let now_idle = sessions.is_empty();

        let mut tracked = self.inner.tracked.lock().unwrap();
        let was_busy = !tracked.state.active_sessions.is_empty();
        tracked.state.active_sessions = sessions;

        if now_idle && !was_busy {
            if let Some(generation) = tracked.settling {
                debug!(generation, "Idle update during settle window");
                return;
            }
        }

        // generation order matches state order
        let generation = self.inner.session_generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(sessions_idle = now_idle, was_busy, generation, "Active sessions updated");

        if !now_idle {
            tracked.settling = None;
            self.inner.apply_locked(&tracked);
        } else if was_busy {
            tracked.settling = Some(generation);
            drop(tracked);
            tokio::spawn(self.inner.clone().settle(generation));
        } else {
            drop(tracked);
            tokio::spawn(self.inner.clone().delayed_sessions_apply(generation));
        }
    }

    /// Records that the theme selection UI opened or closed
    ///
    /// Opening applies immediately. Closing applies after the dismiss delay
    /// and is dropped if a more recent call has been accepted by then, so
    /// a quick close/reopen never lets the music through.
    pub fn set_selection_ui_open(&self, open: bool) {
        let t = self.inner.tick();
        debug!(open, t, "Selection UI update");

        if open {
            self.inner.accept_selection_ui(true, t);
        } else {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                sleep(inner.timings.dismiss_delay).await;
                inner.accept_selection_ui(false, t);
            });
        }
    }

    /// Latest accepted state
    pub fn state(&self) -> AmbientState {
        self.inner.tracked.lock().unwrap().state.clone()
    }

    pub fn should_play(&self) -> bool {
        self.state().should_play()
    }

    /// Receives the state after every applied transition
    pub fn subscribe(&self) -> broadcast::Receiver<AmbientState> {
        self.inner.event_tx.subscribe()
    }

    pub fn slot(&self) -> &AmbientSlot {
        &self.inner.slot
    }

    pub fn timings(&self) -> AmbientTimings {
        self.inner.timings
    }
}

impl std::fmt::Debug for AmbientController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientController")
            .field("state", &self.state())
            .field("timings", &self.inner.timings)
            .finish_non_exhaustive()
    }
}
