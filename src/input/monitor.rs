//! Edge-detection and debounce loop
//!
//! Samples the pin every 10 ms on a dedicated thread, detects LOW-to-HIGH
//! transitions and applies a debounce window before invoking the trigger
//! callback. The callback runs synchronously on the sampling thread, so
//! trigger handling is serialized: a new edge is not evaluated while a
//! previous trigger is still being dispatched.

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::pin::PinReader;

/// Default minimum time between two accepted triggers
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Floor for the configurable debounce window
pub const MIN_DEBOUNCE: Duration = Duration::from_millis(100);

/// Interval between pin samples
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sleep used in the simulated and error back-off paths
const IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Bound on waiting for the sampling thread to exit in [`PinMonitor::stop`]
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Invoked (with no arguments) for every accepted trigger
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

/// Clamp a configured debounce window to the supported floor
pub fn clamp_debounce(debounce: Duration) -> Duration {
    debounce.max(MIN_DEBOUNCE)
}

/// Rising-edge detector with a debounce window
///
/// Pure state machine over (level, timestamp) samples; owns nothing but the
/// previous sample and the last accepted trigger time.
struct EdgeDetector {
    debounce: Duration,
    previous: Option<bool>,
    last_trigger: Option<Instant>,
}

impl EdgeDetector {
    fn new(debounce: Duration) -> Self {
        Self {
            debounce: clamp_debounce(debounce),
            previous: None,
            last_trigger: None,
        }
    }

    /// Feed one sample; returns true when a debounced trigger fires
    ///
    /// The first sample only establishes the baseline. An edge exactly at the
    /// debounce boundary is discarded (strict greater-than).
    fn sample(&mut self, level: bool, now: Instant) -> bool {
        let rising = self.previous == Some(false) && level;
        self.previous = Some(level);
        if !rising {
            return false;
        }

        match self.last_trigger {
            Some(last) if now.duration_since(last) <= self.debounce => false,
            _ => {
                self.last_trigger = Some(now);
                true
            }
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done_rx: Receiver<()>,
}

/// Polls a [`PinReader`] and fires a debounced trigger callback
///
/// `Stopped -> Running` on [`start`](Self::start), back on
/// [`stop`](Self::stop); both are idempotent.
pub struct PinMonitor {
    reader: Arc<dyn PinReader>,
    debounce: Duration,
    on_trigger: TriggerCallback,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl PinMonitor {
    pub fn new(
        reader: Arc<dyn PinReader>,
        debounce: Duration,
        on_trigger: TriggerCallback,
    ) -> Self {
        Self {
            reader,
            debounce: clamp_debounce(debounce),
            on_trigger,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Begin sampling on a dedicated thread
    ///
    /// Calling while already running is a no-op that logs a warning.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Pin monitoring already active");
            return;
        }

        let reader = Arc::clone(&self.reader);
        let running = Arc::clone(&self.running);
        let on_trigger = Arc::clone(&self.on_trigger);
        let detector = EdgeDetector::new(self.debounce);
        let (done_tx, done_rx) = bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("pin-monitor".to_string())
            .spawn(move || {
                sample_loop(reader, detector, running, on_trigger);
                let _ = done_tx.send(());
            })
            .expect("failed to spawn pin-monitor thread");

        *self.worker.lock() = Some(Worker { handle, done_rx });
        info!("Pin monitoring started ({})", self.reader.describe());
    }

    /// Request cooperative termination and wait for the loop to exit
    ///
    /// Waiting is bounded by 1 s; a loop stuck in a dispatch is detached
    /// rather than force-killed. Safe to call multiple times.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        match worker.done_rx.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => {
                let _ = worker.handle.join();
                info!("Pin monitoring stopped");
            }
            Err(_) => {
                warn!("Sampling thread did not stop within {:?}, detaching", STOP_TIMEOUT);
            }
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Effective (clamped) debounce window
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Current pin level; read errors are logged and reported as LOW
    pub fn pin_state(&self) -> bool {
        match self.reader.read() {
            Ok(level) => level,
            Err(e) => {
                error!("Failed to read pin state: {}", e);
                false
            }
        }
    }

    pub fn reader_description(&self) -> String {
        self.reader.describe()
    }

    pub fn is_simulated(&self) -> bool {
        self.reader.is_simulated()
    }
}

impl Drop for PinMonitor {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn sample_loop(
    reader: Arc<dyn PinReader>,
    mut detector: EdgeDetector,
    running: Arc<AtomicBool>,
    on_trigger: TriggerCallback,
) {
    let simulated = reader.is_simulated();

    while running.load(Ordering::SeqCst) {
        if simulated {
            std::thread::sleep(IDLE_INTERVAL);
            continue;
        }

        match reader.read() {
            Ok(level) => {
                if detector.sample(level, Instant::now()) {
                    debug!("Debounced rising edge on {}", reader.describe());
                    on_trigger();
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                // Transient read errors never terminate the loop
                error!("Pin sample failed: {}", e);
                std::thread::sleep(IDLE_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::AtomicUsize;

    fn detector_with_ms(ms: u64) -> EdgeDetector {
        EdgeDetector::new(Duration::from_millis(ms))
    }

    #[test]
    fn test_first_sample_is_baseline_only() {
        let base = Instant::now();
        let mut det = detector_with_ms(500);
        // Even an immediate HIGH establishes the baseline without triggering
        assert!(!det.sample(true, base));
        assert!(!det.sample(true, base + Duration::from_millis(10)));
    }

    #[test]
    fn test_rising_edge_triggers_once() {
        let base = Instant::now();
        let mut det = detector_with_ms(500);
        assert!(!det.sample(false, base));
        assert!(det.sample(true, base + Duration::from_millis(50)));
        // Held HIGH: no further edges
        assert!(!det.sample(true, base + Duration::from_millis(60)));
        assert!(!det.sample(true, base + Duration::from_millis(70)));
    }

    #[test]
    fn test_bounce_within_window_is_discarded() {
        // Trigger at t=0.05, a bounce at t=0.2 is swallowed, a fresh edge at
        // t=0.6 fires again
        let base = Instant::now();
        let mut det = detector_with_ms(500);
        assert!(!det.sample(false, base));
        assert!(det.sample(true, base + Duration::from_millis(50)));
        assert!(!det.sample(false, base + Duration::from_millis(100)));
        assert!(!det.sample(true, base + Duration::from_millis(200)));
        assert!(!det.sample(false, base + Duration::from_millis(300)));
        assert!(det.sample(true, base + Duration::from_millis(600)));
    }

    #[test]
    fn test_debounce_boundary_is_strict() {
        let base = Instant::now();
        let mut det = detector_with_ms(500);
        assert!(!det.sample(false, base));
        assert!(det.sample(true, base));
        // Exactly at the boundary: discarded
        assert!(!det.sample(false, base + Duration::from_millis(250)));
        assert!(!det.sample(true, base + Duration::from_millis(500)));
        // Just past it: accepted
        assert!(!det.sample(false, base + Duration::from_millis(750)));
        assert!(det.sample(true, base + Duration::from_millis(1001)));
    }

    #[test]
    fn test_debounce_is_floor_clamped() {
        assert_eq!(clamp_debounce(Duration::from_millis(10)), MIN_DEBOUNCE);
        assert_eq!(clamp_debounce(Duration::from_millis(100)), MIN_DEBOUNCE);
        assert_eq!(
            clamp_debounce(Duration::from_millis(750)),
            Duration::from_millis(750)
        );

        let det = detector_with_ms(50);
        assert_eq!(det.debounce, MIN_DEBOUNCE);
    }

    /// Reader that replays a scripted sequence, then holds the last level
    struct ScriptedPin {
        levels: Mutex<Vec<bool>>,
        last: AtomicBool,
        reads: AtomicUsize,
    }

    impl ScriptedPin {
        fn new(levels: Vec<bool>) -> Self {
            let mut levels = levels;
            levels.reverse();
            Self {
                levels: Mutex::new(levels),
                last: AtomicBool::new(false),
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl PinReader for ScriptedPin {
        fn read(&self) -> Result<bool> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match self.levels.lock().pop() {
                Some(level) => {
                    self.last.store(level, Ordering::SeqCst);
                    Ok(level)
                }
                None => Ok(self.last.load(Ordering::SeqCst)),
            }
        }

        fn describe(&self) -> String {
            "scripted pin".to_string()
        }
    }

    fn counting_callback() -> (TriggerCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        let cb: TriggerCallback = Arc::new(move || {
            cb_count.fetch_add(1, Ordering::SeqCst);
        });
        (cb, count)
    }

    #[test]
    fn test_monitor_fires_on_edge() {
        let reader = Arc::new(ScriptedPin::new(vec![false, true]));
        let (cb, count) = counting_callback();
        let monitor = PinMonitor::new(reader, DEFAULT_DEBOUNCE, cb);

        monitor.start();
        std::thread::sleep(Duration::from_millis(120));
        monitor.stop();

        // One LOW->HIGH transition, then held HIGH: exactly one trigger
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_twice_keeps_one_loop() {
        let reader = Arc::new(ScriptedPin::new(vec![false]));
        let (cb, _count) = counting_callback();
        let monitor = PinMonitor::new(Arc::clone(&reader) as Arc<dyn PinReader>, DEFAULT_DEBOUNCE, cb);

        monitor.start();
        monitor.start(); // no-op
        assert!(monitor.is_monitoring());

        std::thread::sleep(Duration::from_millis(60));
        monitor.stop();
        assert!(!monitor.is_monitoring());

        // With the loop stopped the read counter must not advance
        let settled = reader.reads();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(reader.reads(), settled);
    }

    #[test]
    fn test_stop_then_restart_resumes() {
        let reader = Arc::new(ScriptedPin::new(vec![false, true]));
        let (cb, count) = counting_callback();
        let monitor = PinMonitor::new(reader, DEFAULT_DEBOUNCE, cb);

        monitor.start();
        std::thread::sleep(Duration::from_millis(60));
        monitor.stop();
        assert!(!monitor.is_monitoring());
        let first_run = count.load(Ordering::SeqCst);
        assert_eq!(first_run, 1);

        monitor.stop(); // second stop is safe

        monitor.start();
        assert!(monitor.is_monitoring());
        std::thread::sleep(Duration::from_millis(40));
        monitor.stop();

        // Held HIGH across the restart: the new baseline sees no edge
        assert_eq!(count.load(Ordering::SeqCst), first_run);
    }

    /// Reader that always fails; the loop must survive it
    struct BrokenPin;

    impl PinReader for BrokenPin {
        fn read(&self) -> Result<bool> {
            anyhow::bail!("read failure")
        }

        fn describe(&self) -> String {
            "broken pin".to_string()
        }
    }

    #[test]
    fn test_read_errors_do_not_kill_the_loop() {
        let (cb, count) = counting_callback();
        let monitor = PinMonitor::new(Arc::new(BrokenPin), DEFAULT_DEBOUNCE, cb);

        monitor.start();
        std::thread::sleep(Duration::from_millis(120));
        assert!(monitor.is_monitoring());
        monitor.stop();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!monitor.pin_state());
    }

    #[test]
    fn test_simulated_reader_never_triggers() {
        let (cb, count) = counting_callback();
        let monitor = PinMonitor::new(
            Arc::new(crate::input::SimulatedPin::new(18)),
            DEFAULT_DEBOUNCE,
            cb,
        );

        monitor.start();
        assert!(monitor.is_monitoring());
        assert!(monitor.is_simulated());
        std::thread::sleep(Duration::from_millis(50));
        monitor.stop();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
