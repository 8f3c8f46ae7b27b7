//! Background coordinator: the timer-lifecycle state machine
//!
//! The coordinator is the only writer of scheduled wake-ups and the
//! sole orchestrator of the pause sequence. It owns a generation
//! counter that guards cleanup against racing `set` requests: a pause
//! sequence only clears state it still owns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::adapter::{Notifier, PlayerControl, TargetResolver};
use crate::coordinator::{DurationSpec, Phase, TimerEvent, TimerStatus};
use crate::error::TimerError;
use crate::state::{TargetHandle, TimerRecord, TimerStore};
use crate::utils::Clock;

/// Notification shown when a timer completes and playback was paused.
const NOTIFICATION_TITLE: &str = "Sleep Timer";
const NOTIFICATION_BODY: &str = "Timer completed - Music paused";

/// Mutable coordinator state behind one lock: the lifecycle phase, the
/// generation counter, and the handle of the single scheduled wake-up.
#[derive(Debug)]
struct Inner {
    phase: Phase,
    generation: u64,
    wakeup: Option<JoinHandle<()>>,
}

impl Inner {
    fn cancel_wakeup(&mut self) {
        if let Some(handle) = self.wakeup.take() {
            handle.abort();
        }
    }
}

/// Owns the singleton timer: scheduling, cancellation, restart
/// recovery, and the pause sequence.
pub struct Coordinator {
    store: Arc<dyn TimerStore>,
    resolver: Arc<dyn TargetResolver>,
    player: Arc<dyn PlayerControl>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    /// Web origin the player lives on; candidates are matched against it.
    player_origin: String,
    /// Smallest schedulable wake-up delay. Near-zero remaining
    /// intervals are clamped up to this instead of failing.
    min_delay: Duration,
    inner: Mutex<Inner>,
    /// Serializes store mutations with the generation decision they
    /// belong to, so a cleanup's ownership check cannot go stale
    /// between the check and the clear.
    mutation_lock: tokio::sync::Mutex<()>,
    events_tx: broadcast::Sender<TimerEvent>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn TimerStore>,
        resolver: Arc<dyn TargetResolver>,
        player: Arc<dyn PlayerControl>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        player_origin: String,
        min_delay: Duration,
    ) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            store,
            resolver,
            player,
            notifier,
            clock,
            player_origin,
            min_delay,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                generation: 0,
                wakeup: None,
            }),
            mutation_lock: tokio::sync::Mutex::new(()),
            events_tx,
        })
    }

    /// Subscribe to unsolicited timer events (armed/cancelled/completed).
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events_tx.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lock_inner().phase
    }

    /// Set (or replace) the timer. Resolves a target first; on
    /// `NoTargetFound` the request is rejected with no state mutated.
    pub async fn set_timer(
        self: &Arc<Self>,
        spec: DurationSpec,
        explicit_target: Option<TargetHandle>,
    ) -> Result<TimerRecord, TimerError> {
        let duration_ms = spec.as_millis()?;
        let target = self.resolve_target(explicit_target.as_ref()).await?;

        let _mutation = self.mutation_lock.lock().await;
        let now = self.clock.now_ms();
        let record = TimerRecord::new(now + duration_ms, duration_ms, target);

        // Persist before disarming the previous timer: a rejected
        // write must leave the old record and its wake-up intact.
        self.store.write(&record).await?;

        let generation = {
            let mut inner = self.lock_inner();
            inner.cancel_wakeup();
            inner.generation += 1;
            inner.phase = Phase::Armed;
            inner.generation
        };

        let delay = self.wakeup_delay(record.end_time_ms);
        self.arm(generation, delay);
        info!(
            end_time_ms = record.end_time_ms,
            duration_ms,
            target = %record.tab_id,
            delay_ms = delay.as_millis() as u64,
            "timer armed"
        );
        self.emit(TimerEvent::Armed {
            end_time_ms: record.end_time_ms,
        });
        Ok(record)
    }

    /// Cancel the timer: disarm the wake-up and clear the store.
    /// A no-op when no timer is active. A pause sequence already in
    /// flight is not interrupted, but the generation bump prevents it
    /// from touching state after this point.
    pub async fn cancel(&self) -> Result<(), TimerError> {
        let _mutation = self.mutation_lock.lock().await;
        let was_active = {
            let mut inner = self.lock_inner();
            inner.cancel_wakeup();
            inner.generation += 1;
            let was_active = inner.phase != Phase::Idle;
            inner.phase = Phase::Idle;
            was_active
        };

        self.store.clear().await?;

        if was_active {
            info!("timer cancelled");
            self.emit(TimerEvent::Cancelled);
        } else {
            debug!("cancel requested with no active timer");
        }
        Ok(())
    }

    /// Startup recovery: an expired persisted timer fires immediately,
    /// a future one is re-armed for its remaining interval using the
    /// persisted target handle. Idempotent - a second pass after the
    /// fired timer's cleanup finds no record and does nothing.
    pub async fn recover(self: &Arc<Self>) -> Result<(), TimerError> {
        let mutation = self.mutation_lock.lock().await;
        let record = match self.store.read().await? {
            Some(record) => record,
            None => {
                debug!("no persisted timer found at startup");
                return Ok(());
            }
        };

        let now = self.clock.now_ms();
        if record.is_expired(now) {
            info!(
                end_time_ms = record.end_time_ms,
                "persisted timer already expired, firing now"
            );
            let generation = {
                let mut inner = self.lock_inner();
                inner.cancel_wakeup();
                inner.generation += 1;
                inner.phase = Phase::Armed;
                inner.generation
            };
            // Released before firing; cleanup takes the lock itself.
            drop(mutation);
            self.fire(generation).await;
        } else {
            let delay = self.wakeup_delay(record.end_time_ms);
            info!(
                end_time_ms = record.end_time_ms,
                delay_ms = delay.as_millis() as u64,
                "re-arming persisted timer"
            );
            let generation = {
                let mut inner = self.lock_inner();
                inner.cancel_wakeup();
                inner.generation += 1;
                inner.phase = Phase::Armed;
                inner.generation
            };
            self.arm(generation, delay);
        }
        Ok(())
    }

    /// Snapshot for status display. `remaining_seconds` is derived
    /// from the persisted end time, never from the stored duration.
    pub async fn status(&self) -> Result<TimerStatus, TimerError> {
        let record = self.store.read().await?;
        let now = self.clock.now_ms();
        let remaining_seconds = record.as_ref().map(|r| (r.remaining_ms(now) / 1_000) as u64);
        Ok(TimerStatus {
            phase: self.phase(),
            record,
            remaining_seconds,
        })
    }

    /// Diagnostics: ask the adapter whether the resolved target is
    /// currently playing. Unresolvable targets and adapter errors both
    /// read as "not playing".
    pub async fn check_playing(&self) -> bool {
        let stored = match self.store.read().await {
            Ok(record) => record.map(|r| r.tab_id),
            Err(_) => None,
        };
        match self.resolve_target(stored.as_ref()).await {
            Ok(target) => self.player.is_playing(&target).await.unwrap_or_else(|e| {
                debug!(error = %e, "playback check failed");
                false
            }),
            Err(_) => false,
        }
    }

    /// Liveness log for a content handler announcing itself.
    pub fn adapter_ready(&self, handle: &TargetHandle) {
        info!(target = %handle, "player content handler ready");
    }

    /// Tab-resolution policy: an audible candidate matching the player
    /// origin wins, then the first matching candidate, then the stored
    /// handle if it still resolves to a matching page.
    async fn resolve_target(
        &self,
        stored: Option<&TargetHandle>,
    ) -> Result<TargetHandle, TimerError> {
        let candidates = self.resolver.candidates(&self.player_origin).await;

        if let Some(candidate) = candidates.iter().find(|c| c.audible) {
            debug!(target = %candidate.handle, "resolved audible player tab");
            return Ok(candidate.handle.clone());
        }
        if let Some(candidate) = candidates.first() {
            debug!(target = %candidate.handle, "resolved first matching player tab");
            return Ok(candidate.handle.clone());
        }
        if let Some(handle) = stored {
            if let Some(candidate) = self.resolver.resolve(handle, &self.player_origin).await {
                debug!(target = %candidate.handle, "resolved previously stored target");
                return Ok(candidate.handle);
            }
        }
        Err(TimerError::NoTargetFound)
    }

    /// Spawn the single wake-up task. Installed only if the generation
    /// is still current; a stale wake-up is aborted on the spot.
    fn arm(self: &Arc<Self>, generation: u64, delay: Duration) {
        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            // Fire in a detached task: aborting the wake-up must never
            // interrupt a pause sequence that is already in flight.
            tokio::spawn(async move { coordinator.fire(generation).await });
        });

        let mut inner = self.lock_inner();
        if inner.generation == generation {
            inner.cancel_wakeup();
            inner.wakeup = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Wake-up handler: run the pause sequence against the resolved
    /// target, then clean up. Failures are logged, never retried.
    async fn fire(self: &Arc<Self>, generation: u64) {
        {
            let mut inner = self.lock_inner();
            if inner.generation != generation {
                debug!(generation, "stale wake-up, ignoring");
                return;
            }
            inner.phase = Phase::Firing;
        }
        info!("wake-up fired, starting pause sequence");

        let stored = match self.store.read().await {
            Ok(record) => record.map(|r| r.tab_id),
            Err(e) => {
                warn!(error = %e, "could not read stored record while firing");
                None
            }
        };

        match self.resolve_target(stored.as_ref()).await {
            Ok(target) => {
                self.run_pause_sequence(&target).await;
            }
            Err(e) => {
                error!(error = %e, "no target found, skipping pause sequence");
            }
        }

        self.cleanup(generation).await;
    }

    /// Ordered best-effort pause attempts. Direct invocation first; a
    /// script that ran but returned `false` still counts as success.
    /// On execution failure, fall back to the content-handler round
    /// trip, where any structured reply counts as success. Exactly one
    /// completion notification regardless of which method succeeded.
    async fn run_pause_sequence(&self, target: &TargetHandle) -> bool {
        let paused = match self.player.attempt_pause(target).await {
            Ok(true) => {
                info!(%target, "pause executed via direct invocation");
                true
            }
            Ok(false) => {
                debug!(%target, "pause script executed but pause may have failed");
                true
            }
            Err(direct_err) => {
                debug!(error = %direct_err, "direct invocation failed, trying content handler");
                match self.player.send_pause_message(target).await {
                    Ok(reply) => {
                        if reply.success {
                            info!(%target, "pause executed via content handler");
                        } else {
                            debug!(%target, "content handler replied but pause may have failed");
                        }
                        true
                    }
                    Err(fallback_err) => {
                        error!(
                            direct = %direct_err,
                            fallback = %fallback_err,
                            "all pause methods failed"
                        );
                        false
                    }
                }
            }
        };

        if paused {
            if let Err(e) = self.notifier.notify(NOTIFICATION_TITLE, NOTIFICATION_BODY).await {
                warn!(error = %e, "completion notification failed");
            }
            self.emit(TimerEvent::Completed);
        }
        paused
    }

    /// Clear persisted state and any stray wake-up, but only if this
    /// sequence still owns the current generation - a `set` that
    /// arrived mid-sequence must not have its timer erased.
    async fn cleanup(&self, generation: u64) {
        let _mutation = self.mutation_lock.lock().await;
        {
            let mut inner = self.lock_inner();
            if inner.generation != generation {
                debug!("newer timer armed during pause sequence, leaving its state alone");
                return;
            }
            inner.cancel_wakeup();
            inner.phase = Phase::Idle;
        }

        if let Err(e) = self.store.clear().await {
            error!(error = %e, "failed to clear timer store during cleanup");
        }
        debug!("timer state cleaned up");
    }

    fn wakeup_delay(&self, end_time_ms: i64) -> Duration {
        let remaining = (end_time_ms - self.clock.now_ms()).max(0) as u64;
        Duration::from_millis(remaining).max(self.min_delay)
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine; the popup may simply not be open.
        let _ = self.events_tx.send(event);
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::adapter::{PauseReply, StaticResolver, TargetCandidate};
    use crate::error::AdapterError;
    use crate::state::MemoryTimerStore;

    const ORIGIN: &str = "https://player.example";

    struct MockClock(AtomicI64);

    impl MockClock {
        fn at(ms: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(ms)))
        }
    }

    impl Clock for MockClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    enum PauseBehavior {
        /// Direct invocation returns `Ok(value)`.
        Direct(bool),
        /// Direct invocation sleeps, then returns `Ok(true)`.
        SlowDirect(Duration),
        /// Direct invocation errors; content handler replies.
        Fallback { success: bool },
        /// Both methods fail.
        AllFail,
    }

    struct ScriptedPlayer {
        behavior: PauseBehavior,
        pause_calls: AtomicUsize,
        message_calls: AtomicUsize,
    }

    impl ScriptedPlayer {
        fn new(behavior: PauseBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                pause_calls: AtomicUsize::new(0),
                message_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PlayerControl for ScriptedPlayer {
        async fn attempt_pause(&self, _target: &TargetHandle) -> Result<bool, AdapterError> {
            self.pause_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                PauseBehavior::Direct(value) => Ok(value),
                PauseBehavior::SlowDirect(delay) => {
                    sleep(delay).await;
                    Ok(true)
                }
                PauseBehavior::Fallback { .. } | PauseBehavior::AllFail => {
                    Err(AdapterError::ExecutionFailed("scripted failure".to_string()))
                }
            }
        }

        async fn send_pause_message(
            &self,
            _target: &TargetHandle,
        ) -> Result<PauseReply, AdapterError> {
            self.message_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                PauseBehavior::Fallback { success } => Ok(PauseReply { success }),
                _ => Err(AdapterError::NoResponse("scripted failure".to_string())),
            }
        }

        async fn is_playing(&self, _target: &TargetHandle) -> Result<bool, AdapterError> {
            Ok(true)
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        count: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _title: &str, _body: &str) -> Result<(), AdapterError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AdapterError::NotificationFailed("scripted".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct FailingStore;

    #[async_trait]
    impl TimerStore for FailingStore {
        async fn write(&self, _record: &TimerRecord) -> Result<(), TimerError> {
            Err(TimerError::Persistence("disk full".to_string()))
        }

        async fn read(&self) -> Result<Option<TimerRecord>, TimerError> {
            Ok(None)
        }

        async fn clear(&self) -> Result<(), TimerError> {
            Ok(())
        }
    }

    /// Store that can be told to reject its next write, delegating to
    /// an in-memory store otherwise.
    struct FlakyStore {
        inner: MemoryTimerStore,
        fail_next_write: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryTimerStore::new(),
                fail_next_write: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl TimerStore for FlakyStore {
        async fn write(&self, record: &TimerRecord) -> Result<(), TimerError> {
            if self.fail_next_write.swap(false, Ordering::SeqCst) {
                return Err(TimerError::Persistence("disk full".to_string()));
            }
            self.inner.write(record).await
        }

        async fn read(&self) -> Result<Option<TimerRecord>, TimerError> {
            self.inner.read().await
        }

        async fn clear(&self) -> Result<(), TimerError> {
            self.inner.clear().await
        }
    }

    /// Resolver that reports no open tabs; only the listed handles
    /// re-resolve.
    struct HandleOnlyResolver {
        known: Vec<TargetCandidate>,
    }

    #[async_trait]
    impl TargetResolver for HandleOnlyResolver {
        async fn candidates(&self, _origin: &str) -> Vec<TargetCandidate> {
            Vec::new()
        }

        async fn resolve(&self, handle: &TargetHandle, origin: &str) -> Option<TargetCandidate> {
            self.known
                .iter()
                .find(|c| &c.handle == handle && c.origin == origin)
                .cloned()
        }
    }

    struct Harness {
        coordinator: Arc<Coordinator>,
        store: Arc<MemoryTimerStore>,
        clock: Arc<MockClock>,
        notifier: Arc<CountingNotifier>,
        player: Arc<ScriptedPlayer>,
    }

    fn harness(behavior: PauseBehavior) -> Harness {
        harness_with_resolver(behavior, StaticResolver::single("tab-1", ORIGIN))
    }

    fn harness_with_resolver(
        behavior: PauseBehavior,
        resolver: impl TargetResolver + 'static,
    ) -> Harness {
        let store = Arc::new(MemoryTimerStore::new());
        let clock = MockClock::at(1_000_000);
        let notifier = Arc::new(CountingNotifier::default());
        let player = ScriptedPlayer::new(behavior);
        let coordinator = Coordinator::new(
            store.clone(),
            Arc::new(resolver),
            player.clone(),
            notifier.clone(),
            clock.clone(),
            ORIGIN.to_string(),
            Duration::from_millis(60),
        );
        Harness {
            coordinator,
            store,
            clock,
            notifier,
            player,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn set_persists_end_time_and_arms() {
        let h = harness(PauseBehavior::Direct(true));
        let mut events = h.coordinator.subscribe();

        let record = h
            .coordinator
            .set_timer(DurationSpec::Minutes(10), None)
            .await
            .unwrap();

        assert_eq!(record.end_time_ms, 1_000_000 + 600_000);
        assert_eq!(record.duration_ms, 600_000);
        assert_eq!(h.store.read().await.unwrap(), Some(record.clone()));
        assert_eq!(h.coordinator.phase(), Phase::Armed);
        assert_eq!(
            events.try_recv().unwrap(),
            TimerEvent::Armed {
                end_time_ms: record.end_time_ms
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_set_replaces_first_and_fires_once() {
        let h = harness(PauseBehavior::Direct(true));

        h.coordinator
            .set_timer(DurationSpec::Seconds(30), None)
            .await
            .unwrap();
        let second = h
            .coordinator
            .set_timer(DurationSpec::Seconds(60), None)
            .await
            .unwrap();

        assert_eq!(h.store.read().await.unwrap(), Some(second));

        sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.player.pause_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_disarms_and_clears() {
        let h = harness(PauseBehavior::Direct(true));

        h.coordinator
            .set_timer(DurationSpec::Seconds(30), None)
            .await
            .unwrap();
        h.coordinator.cancel().await.unwrap();

        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);

        sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.player.pause_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_when_idle_is_a_noop() {
        let h = harness(PauseBehavior::Direct(true));
        h.coordinator.cancel().await.unwrap();
        assert_eq!(h.coordinator.phase(), Phase::Idle);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn recover_fires_expired_timer_exactly_once() {
        let h = harness(PauseBehavior::Direct(true));
        h.store
            .write(&TimerRecord::new(
                999_000,
                60_000,
                TargetHandle::new("tab-1"),
            ))
            .await
            .unwrap();

        h.coordinator.recover().await.unwrap();
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);

        // A second startup check finds nothing and does nothing.
        h.coordinator.recover().await.unwrap();
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.player.pause_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recover_rearms_for_the_original_end_time() {
        let h = harness(PauseBehavior::Direct(true));
        // Set 600s ago with a 630s duration: 30s remain.
        h.store
            .write(&TimerRecord::new(
                1_030_000,
                630_000,
                TargetHandle::new("tab-1"),
            ))
            .await
            .unwrap();

        h.coordinator.recover().await.unwrap();
        assert_eq!(h.coordinator.phase(), Phase::Armed);

        sleep(Duration::from_secs(29)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.notifier.count(), 0);

        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn nearly_expired_recover_clamps_to_minimum_delay() {
        let h = harness(PauseBehavior::Direct(true));
        // 10ms remain, below the 60ms minimum schedulable delay.
        h.store
            .write(&TimerRecord::new(
                1_000_010,
                60_000,
                TargetHandle::new("tab-1"),
            ))
            .await
            .unwrap();

        h.coordinator.recover().await.unwrap();
        assert_eq!(h.coordinator.phase(), Phase::Armed);

        sleep(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_reply_counts_as_success() {
        let h = harness(PauseBehavior::Fallback { success: true });

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.player.pause_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.player.message_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn script_returning_false_still_counts_as_success() {
        let h = harness(PauseBehavior::Direct(false));

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.player.message_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn all_methods_failing_still_cleans_up() {
        let h = harness(PauseBehavior::AllFail);

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_notification_is_nonfatal() {
        let mut h = harness(PauseBehavior::Direct(true));
        let notifier = Arc::new(CountingNotifier {
            count: AtomicUsize::new(0),
            fail: true,
        });
        h.notifier = notifier.clone();
        h.coordinator = Coordinator::new(
            h.store.clone(),
            Arc::new(StaticResolver::single("tab-1", ORIGIN)),
            h.player.clone(),
            notifier,
            h.clock.clone(),
            ORIGIN.to_string(),
            Duration::from_millis(60),
        );

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn set_with_no_candidates_is_rejected_without_mutation() {
        let h = harness_with_resolver(PauseBehavior::Direct(true), StaticResolver::new(vec![]));

        let result = h.coordinator.set_timer(DurationSpec::Minutes(5), None).await;
        assert!(matches!(result, Err(TimerError::NoTargetFound)));
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn audible_candidate_is_preferred() {
        let resolver = StaticResolver::new(vec![
            TargetCandidate {
                handle: TargetHandle::new("tab-quiet"),
                origin: ORIGIN.to_string(),
                audible: false,
            },
            TargetCandidate {
                handle: TargetHandle::new("tab-loud"),
                origin: ORIGIN.to_string(),
                audible: true,
            },
        ]);
        let h = harness_with_resolver(PauseBehavior::Direct(true), resolver);

        let record = h
            .coordinator
            .set_timer(DurationSpec::Minutes(5), None)
            .await
            .unwrap();
        assert_eq!(record.tab_id, TargetHandle::new("tab-loud"));
    }

    #[tokio::test(start_paused = true)]
    async fn candidates_of_other_origins_are_ignored() {
        let resolver = StaticResolver::new(vec![TargetCandidate {
            handle: TargetHandle::new("tab-other"),
            origin: "https://elsewhere.example".to_string(),
            audible: true,
        }]);
        let h = harness_with_resolver(PauseBehavior::Direct(true), resolver);

        let result = h.coordinator.set_timer(DurationSpec::Minutes(5), None).await;
        assert!(matches!(result, Err(TimerError::NoTargetFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_rejects_set() {
        let clock = MockClock::at(1_000_000);
        let coordinator = Coordinator::new(
            Arc::new(FailingStore),
            Arc::new(StaticResolver::single("tab-1", ORIGIN)),
            ScriptedPlayer::new(PauseBehavior::Direct(true)),
            Arc::new(CountingNotifier::default()),
            clock,
            ORIGIN.to_string(),
            Duration::from_millis(60),
        );

        let result = coordinator.set_timer(DurationSpec::Minutes(5), None).await;
        assert!(matches!(result, Err(TimerError::Persistence(_))));
        assert_eq!(coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_replacement_leaves_previous_timer_armed() {
        let store = FlakyStore::new();
        let notifier = Arc::new(CountingNotifier::default());
        let coordinator = Coordinator::new(
            store.clone(),
            Arc::new(StaticResolver::single("tab-1", ORIGIN)),
            ScriptedPlayer::new(PauseBehavior::Direct(true)),
            notifier.clone(),
            MockClock::at(1_000_000),
            ORIGIN.to_string(),
            Duration::from_millis(60),
        );

        let first = coordinator
            .set_timer(DurationSpec::Seconds(5), None)
            .await
            .unwrap();

        store.fail_next_write.store(true, Ordering::SeqCst);
        let result = coordinator.set_timer(DurationSpec::Seconds(60), None).await;
        assert!(matches!(result, Err(TimerError::Persistence(_))));

        // The original timer survives the rejected replacement...
        assert_eq!(store.read().await.unwrap(), Some(first));
        assert_eq!(coordinator.phase(), Phase::Armed);

        // ...and still fires on its own schedule.
        sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(notifier.count(), 1);
        assert_eq!(store.read().await.unwrap(), None);
        assert_eq!(coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_handle_is_used_when_no_tabs_are_open() {
        let resolver = HandleOnlyResolver {
            known: vec![TargetCandidate {
                handle: TargetHandle::new("tab-42"),
                origin: ORIGIN.to_string(),
                audible: false,
            }],
        };
        let h = harness_with_resolver(PauseBehavior::Direct(true), resolver);

        let record = h
            .coordinator
            .set_timer(DurationSpec::Seconds(5), Some(TargetHandle::new("tab-42")))
            .await
            .unwrap();
        assert_eq!(record.tab_id, TargetHandle::new("tab-42"));
        assert_eq!(h.coordinator.phase(), Phase::Armed);

        sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_explicit_handle_is_rejected() {
        let h = harness_with_resolver(
            PauseBehavior::Direct(true),
            HandleOnlyResolver { known: Vec::new() },
        );

        let result = h
            .coordinator
            .set_timer(DurationSpec::Minutes(5), Some(TargetHandle::new("tab-gone")))
            .await;
        assert!(matches!(result, Err(TimerError::NoTargetFound)));
        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn check_playing_reflects_the_resolved_target() {
        let h = harness(PauseBehavior::Direct(true));
        assert!(h.coordinator.check_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn check_playing_is_false_without_a_target() {
        let h = harness_with_resolver(PauseBehavior::Direct(true), StaticResolver::new(vec![]));
        assert!(!h.coordinator.check_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn set_racing_inflight_cleanup_is_not_clobbered() {
        // Direct invocation takes 5s, so the pause sequence for the
        // first timer is still in flight when the second set arrives.
        let h = harness(PauseBehavior::SlowDirect(Duration::from_secs(5)));

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_millis(1_100)).await;

        // First timer fired and is paused inside the adapter call.
        let replacement = h
            .coordinator
            .set_timer(DurationSpec::Seconds(60), None)
            .await
            .unwrap();

        // Let the in-flight sequence finish; its cleanup must see the
        // newer generation and leave the replacement untouched.
        sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.store.read().await.unwrap(), Some(replacement));
        assert_eq!(h.coordinator.phase(), Phase::Armed);

        // The replacement still fires on its own schedule.
        sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.notifier.count(), 2);
        assert_eq!(h.store.read().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_inflight_sequence_does_not_resurrect_state() {
        let h = harness(PauseBehavior::SlowDirect(Duration::from_secs(5)));

        h.coordinator
            .set_timer(DurationSpec::Seconds(1), None)
            .await
            .unwrap();
        sleep(Duration::from_millis(1_100)).await;

        h.coordinator.cancel().await.unwrap();
        assert_eq!(h.store.read().await.unwrap(), None);

        sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.store.read().await.unwrap(), None);
        assert_eq!(h.coordinator.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_remaining_from_persisted_end_time() {
        let h = harness(PauseBehavior::Direct(true));

        let status = h.coordinator.status().await.unwrap();
        assert_eq!(status.phase, Phase::Idle);
        assert!(status.record.is_none());
        assert!(status.remaining_seconds.is_none());

        h.coordinator
            .set_timer(DurationSpec::Minutes(5), None)
            .await
            .unwrap();
        let status = h.coordinator.status().await.unwrap();
        assert_eq!(status.phase, Phase::Armed);
        assert_eq!(status.remaining_seconds, Some(300));
    }
}
