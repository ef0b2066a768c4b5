//! Replay engine: dispatches a recorded sequence at its original pacing.
//!
//! # Dispatch Loop
//!
//! ```text
//! play() ──► spawn loop ──► next_step ──► Wait(deadline) ──► sleep_until / wake / cancel
//!                              │
//!                              ├──► Dispatch ──► batch under gate ──► observers
//!                              ├──► Park (paused) ──► wake / cancel
//!                              └──► Exhausted ──► Finished
//! ```
//!
//! Control operations (`pause`, `seek`, `set_playback_speed`) update shared
//! state and wake the loop through a [`Notify`], so a long wait never delays
//! them. `stop`/`finish` cancel the loop's token. Each loop token is a child
//! of a lifetime token that the last player handle cancels on drop, so an
//! abandoned player never keeps its loop parked.
//!
//! # Locking
//!
//! `dispatch_gate` makes delivering a batch and entering a terminal state
//! mutually exclusive: once `stop()` returns, no observer is called again.
//! The gate is reentrant so observers may control the player from inside a
//! delivery. `state` is never held while observers run.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace};

use super::clock::PlaybackClock;
use crate::geo::Location;
use crate::history::{ReplayEvent, ReplaySequence};
use crate::observer::{ObserverId, ObserverList};

/// Lifecycle of a [`ReplayHistoryPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// Created or reset, not started
    Idle,
    /// Dispatching events
    Playing,
    /// Suspended; resumes at the same offset
    Paused,
    /// Every event was delivered, or `finish()` was called
    Finished,
    /// Stopped before the end
    Stopped,
}

impl PlayerState {
    /// True for `Finished` and `Stopped`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Finished | PlayerState::Stopped)
    }

    /// Lowercase name for logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Finished => "finished",
            PlayerState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery: events sharing the same millisecond replay offset.
#[derive(Debug, Clone)]
pub struct ReplayEvents {
    /// Events in sequence order.
    pub events: Vec<ReplayEvent>,
    /// Replay offset of the first event in the batch.
    pub offset: Duration,
    /// Sequence index of the first event in the batch.
    pub first_index: usize,
}

impl ReplayEvents {
    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate events in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReplayEvent> {
        self.events.iter()
    }

    /// Location samples carried by the batch, in order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.events.iter().filter_map(ReplayEvent::location)
    }
}

/// Receives dispatched batches.
pub trait ReplayEventsObserver: Send + Sync {
    /// A batch became due.
    fn on_replay_events(&self, events: &ReplayEvents);
}

impl<F> ReplayEventsObserver for F
where
    F: Fn(&ReplayEvents) + Send + Sync,
{
    fn on_replay_events(&self, events: &ReplayEvents) {
        self(events)
    }
}

struct PlayerInner {
    state: PlayerState,
    cursor: usize,
    clock: PlaybackClock,
    dispatched: usize,
    /// Token of the running dispatch loop.
    runner: Option<CancellationToken>,
}

struct PlayerCore {
    sequence: ReplaySequence,
    runtime: Handle,
    state: Mutex<PlayerInner>,
    observers: Mutex<ObserverList<dyn ReplayEventsObserver>>,
    dispatch_gate: ReentrantMutex<()>,
    wake: Notify,
    state_tx: watch::Sender<PlayerState>,
    /// Parent of every loop token; cancelled when the last handle drops.
    lifetime: CancellationToken,
}

enum Step {
    Dispatch,
    Wait(Instant),
    Park,
    Exhausted,
}

impl PlayerCore {
    fn set_state(&self, inner: &mut PlayerInner, state: PlayerState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "Replay state change");
            inner.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn next_step(&self, now: Instant) -> Step {
        let inner = self.state.lock();
        if inner.state != PlayerState::Playing {
            return Step::Park;
        }
        if inner.cursor >= self.sequence.len() {
            return Step::Exhausted;
        }
        match inner.clock.deadline_for(self.sequence.offset_of(inner.cursor)) {
            Some(deadline) if deadline <= now => Step::Dispatch,
            Some(deadline) => Step::Wait(deadline),
            None => Step::Park,
        }
    }

    /// Deliver the batch at the cursor if it is due.
    fn dispatch_due(&self, now: Instant) {
        let _gate = self.dispatch_gate.lock();

        let batch = {
            let mut inner = self.state.lock();
            let len = self.sequence.len();
            if inner.state != PlayerState::Playing || inner.cursor >= len {
                return;
            }
            let start = inner.cursor;
            match inner.clock.deadline_for(self.sequence.offset_of(start)) {
                Some(deadline) if deadline <= now => {}
                _ => return,
            }

            let key = self.sequence.offset_millis(start);
            let mut end = start + 1;
            while end < len && self.sequence.offset_millis(end) == key {
                end += 1;
            }
            inner.cursor = end;
            inner.dispatched += end - start;

            ReplayEvents {
                events: self.sequence.events()[start..end].to_vec(),
                offset: self.sequence.offset_of(start),
                first_index: start,
            }
        };

        let observers = self.observers.lock().snapshot();
        trace!(
            index = batch.first_index,
            events = batch.len(),
            offset_ms = batch.offset.as_millis() as u64,
            observers = observers.len(),
            "Dispatching replay batch"
        );

        for (id, observer) in observers {
            if self.state.lock().state.is_terminal() {
                break;
            }
            if !self.observers.lock().contains(id) {
                continue;
            }
            observer.on_replay_events(&batch);
        }
    }

    /// Enter a terminal state, stop the loop and release observers.
    ///
    /// Returns false if the player was already terminal.
    fn terminate(&self, state: PlayerState) -> bool {
        let _gate = self.dispatch_gate.lock();
        {
            let mut inner = self.state.lock();
            if inner.state.is_terminal() {
                return false;
            }
            self.enter_terminal(&mut inner, state);
        }
        self.observers.lock().clear();
        true
    }

    /// Finish if playing and nothing is left to deliver.
    fn finish_exhausted(&self) -> bool {
        let _gate = self.dispatch_gate.lock();
        {
            let mut inner = self.state.lock();
            if inner.state != PlayerState::Playing || inner.cursor < self.sequence.len() {
                return false;
            }
            self.enter_terminal(&mut inner, PlayerState::Finished);
        }
        self.observers.lock().clear();
        true
    }

    fn enter_terminal(&self, inner: &mut PlayerInner, state: PlayerState) {
        inner.clock.pause_at(Instant::now());
        if let Some(token) = inner.runner.take() {
            token.cancel();
        }
        self.set_state(inner, state);
    }
}

async fn run_dispatch_loop(core: Arc<PlayerCore>, token: CancellationToken) {
    debug!(events = core.sequence.len(), "Replay dispatch loop started");

    loop {
        if token.is_cancelled() {
            break;
        }

        match core.next_step(Instant::now()) {
            Step::Dispatch => {
                core.dispatch_due(Instant::now());
                tokio::task::yield_now().await;
            }
            Step::Wait(deadline) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = core.wake.notified() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            Step::Park => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = core.wake.notified() => {}
                }
            }
            Step::Exhausted => {
                if core.finish_exhausted() {
                    info!(
                        events = core.state.lock().dispatched,
                        "Replay finished"
                    );
                    break;
                }
            }
        }
    }

    debug!("Replay dispatch loop exited");
}

/// Replays a [`ReplaySequence`] to registered observers.
///
/// Events are delivered at their recorded offsets from the first event,
/// measured from `play()`. Absolute recording time is discarded. Cloning
/// yields another handle to the same player.
///
/// Dropping the last handle ends the dispatch loop and releases the
/// sequence and every observer, even while paused.
#[derive(Clone)]
pub struct ReplayHistoryPlayer {
    core: Arc<PlayerCore>,
    _owner: Arc<DropGuard>,
}

impl std::fmt::Debug for ReplayHistoryPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.core.state.lock();
        f.debug_struct("ReplayHistoryPlayer")
            .field("state", &inner.state)
            .field("cursor", &inner.cursor)
            .field("events", &self.core.sequence.len())
            .field("speed", &inner.clock.speed())
            .finish()
    }
}

impl ReplayHistoryPlayer {
    /// Create an idle player on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(sequence: ReplaySequence) -> Self {
        Self::with_runtime(sequence, Handle::current())
    }

    /// Create an idle player whose dispatch loop runs on `runtime`.
    pub fn with_runtime(sequence: ReplaySequence, runtime: Handle) -> Self {
        let (state_tx, _) = watch::channel(PlayerState::Idle);
        let lifetime = CancellationToken::new();
        let owner = Arc::new(lifetime.clone().drop_guard());
        Self {
            _owner: owner,
            core: Arc::new(PlayerCore {
                sequence,
                runtime,
                state: Mutex::new(PlayerInner {
                    state: PlayerState::Idle,
                    cursor: 0,
                    clock: PlaybackClock::new(),
                    dispatched: 0,
                    runner: None,
                }),
                observers: Mutex::new(ObserverList::new()),
                dispatch_gate: ReentrantMutex::new(()),
                wake: Notify::new(),
                state_tx,
                lifetime,
            }),
        }
    }

    /// The sequence being replayed.
    pub fn sequence(&self) -> &ReplaySequence {
        &self.core.sequence
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayerState {
        self.core.state.lock().state
    }

    /// Watch lifecycle changes.
    pub fn subscribe_state(&self) -> watch::Receiver<PlayerState> {
        self.core.state_tx.subscribe()
    }

    /// Wait until the player is `Finished` or `Stopped`.
    pub async fn wait_until_terminal(&self) -> PlayerState {
        let mut rx = self.core.state_tx.subscribe();
        let reached = rx.wait_for(PlayerState::is_terminal).await.map(|state| *state);
        match reached {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Register a batch observer.
    pub fn observe_replay_events(&self, observer: Arc<dyn ReplayEventsObserver>) -> ObserverId {
        let id = self.core.observers.lock().add(observer);
        debug!(observer = %id, "Replay observer registered");
        id
    }

    /// Remove a batch observer. Returns false if it was not registered.
    pub fn unobserve_replay_events(&self, id: ObserverId) -> bool {
        self.core.observers.lock().remove(id)
    }

    /// Number of registered batch observers.
    pub fn observer_count(&self) -> usize {
        self.core.observers.lock().len()
    }

    /// Start or resume playback. No effect while playing or once terminal.
    pub fn play(&self) {
        {
            let mut inner = self.core.state.lock();
            match inner.state {
                PlayerState::Idle | PlayerState::Paused => {}
                PlayerState::Playing => return,
                state @ (PlayerState::Finished | PlayerState::Stopped) => {
                    debug!(%state, "Ignoring play on terminal player");
                    return;
                }
            }

            inner.clock.play_at(Instant::now());
            self.core.set_state(&mut inner, PlayerState::Playing);

            if inner.runner.is_none() {
                let token = self.core.lifetime.child_token();
                inner.runner = Some(token.clone());
                self.core
                    .runtime
                    .spawn(run_dispatch_loop(Arc::clone(&self.core), token));
            }

            info!(
                events = self.core.sequence.len(),
                cursor = inner.cursor,
                speed = inner.clock.speed(),
                "Replay playing"
            );
        }
        self.core.wake.notify_one();
    }

    /// Suspend playback, remembering the offset reached.
    pub fn pause(&self) {
        {
            let mut inner = self.core.state.lock();
            if inner.state != PlayerState::Playing {
                return;
            }
            inner.clock.pause_at(Instant::now());
            self.core.set_state(&mut inner, PlayerState::Paused);
            let position_ms = inner.clock.position_at(Instant::now()).as_millis() as u64;
            info!(position_ms, "Replay paused");
        }
        self.core.wake.notify_one();
    }

    /// Move to `offset`; the next event delivered is the first at or after it.
    ///
    /// Ignored once terminal.
    pub fn seek(&self, offset: Duration) {
        {
            let mut inner = self.core.state.lock();
            if inner.state.is_terminal() {
                return;
            }
            inner.clock.seek_at(offset, Instant::now());
            inner.cursor = self.core.sequence.index_at_offset(offset);
            debug!(offset_ms = offset.as_millis() as u64, cursor = inner.cursor, "Replay seek");
        }
        self.core.wake.notify_one();
    }

    /// Set the speed multiplier, clamped to `[0.1, 10.0]`.
    pub fn set_playback_speed(&self, speed: f64) {
        {
            let mut inner = self.core.state.lock();
            inner.clock.set_speed_at(speed, Instant::now());
            debug!(requested = speed, speed = inner.clock.speed(), "Replay speed changed");
        }
        self.core.wake.notify_one();
    }

    /// Current speed multiplier.
    pub fn playback_speed(&self) -> f64 {
        self.core.state.lock().clock.speed()
    }

    /// Stop playback for good and release every observer.
    ///
    /// Waits for an in-flight delivery on another thread to complete; no
    /// observer is called after this returns.
    pub fn stop(&self) {
        if self.core.terminate(PlayerState::Stopped) {
            info!("Replay stopped");
        }
    }

    /// Like [`stop`](Self::stop) but ends in `Finished`.
    pub fn finish(&self) {
        if self.core.terminate(PlayerState::Finished) {
            info!("Replay finished");
        }
    }

    /// Cancel the dispatch loop and rewind to `Idle`.
    ///
    /// Observers still registered are kept; a terminal player has none.
    pub fn reset(&self) {
        let _gate = self.core.dispatch_gate.lock();
        let mut inner = self.core.state.lock();
        if let Some(token) = inner.runner.take() {
            token.cancel();
        }
        inner.cursor = 0;
        inner.dispatched = 0;
        inner.clock.reset();
        self.core.set_state(&mut inner, PlayerState::Idle);
        debug!("Replay reset");
    }

    /// Replay offset reached, capped at [`duration`](Self::duration).
    pub fn position(&self) -> Duration {
        let position = self.core.state.lock().clock.position_at(Instant::now());
        position.min(self.duration())
    }

    /// Replay offset of the last event.
    pub fn duration(&self) -> Duration {
        self.core.sequence.duration()
    }

    /// Number of events delivered so far.
    pub fn events_dispatched(&self) -> usize {
        self.core.state.lock().dispatched
    }
}
