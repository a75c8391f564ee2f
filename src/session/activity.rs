use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// User interaction that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerDown,
    KeyPress,
    Scroll,
}

/// Idle state published by the activity monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStatus {
    /// No session is being monitored.
    Inactive,
    Active,
    /// The session will time out in `remaining` unless activity is recorded.
    Warning { remaining: Duration },
    /// The idle limit was reached and the timeout callback has run.
    Expired,
}

struct Shared {
    last_activity: Mutex<Instant>,
    listening: AtomicBool,
    status: watch::Sender<IdleStatus>,
}

impl Shared {
    fn publish(&self, next: IdleStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Handle through which the host reports interaction events.
///
/// Events are ignored while the monitor is stopped.
#[derive(Clone)]
pub struct ActivityListener {
    shared: Arc<Shared>,
}

impl ActivityListener {
    pub fn record(&self, event: ActivityEvent) {
        if !self.shared.listening.load(Ordering::Acquire) {
            return;
        }
        tracing::trace!(?event, "Activity recorded");
        *self.shared.last_activity.lock() = Instant::now();
        self.shared.publish(IdleStatus::Active);
    }

    /// "Stay signed in" from an expiry warning prompt.
    pub fn keep_alive(&self) {
        self.record(ActivityEvent::PointerDown);
    }
}

// `tokio::time::interval` panics on a zero period
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Watches for inactivity and runs a callback once the idle limit passes.
///
/// The recurring check is a spawned Tokio task, so [`start`](Self::start)
/// must be called from within a runtime. The task is aborted on
/// [`stop`](Self::stop), on restart and on drop.
pub(crate) struct ActivityMonitor {
    shared: Arc<Shared>,
    check_interval: Duration,
    warning_lead: Option<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityMonitor {
    pub(crate) fn new(check_interval: Duration, warning_lead: Option<Duration>) -> Self {
        let (status, _) = watch::channel(IdleStatus::Inactive);
        Self {
            shared: Arc::new(Shared {
                last_activity: Mutex::new(Instant::now()),
                listening: AtomicBool::new(false),
                status,
            }),
            check_interval: check_interval.max(MIN_CHECK_INTERVAL),
            warning_lead,
            task: Mutex::new(None),
        }
    }

    /// Begin monitoring. A monitor that is already running is stopped first.
    ///
    /// `on_timeout` runs once per idle period; it is re-armed only by new
    /// activity.
    pub(crate) fn start<F>(&self, on_timeout: F, idle_limit: Duration)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();

        *self.shared.last_activity.lock() = Instant::now();
        self.shared.listening.store(true, Ordering::Release);
        self.shared.publish(IdleStatus::Active);

        let check = IdleCheck {
            shared: self.shared.clone(),
            idle_limit,
            check_interval: self.check_interval,
            warning_lead: self.warning_lead,
        };
        *self.task.lock() = Some(tokio::spawn(check.run(on_timeout)));

        tracing::debug!(idle_limit_secs = idle_limit.as_secs(), "Activity monitor started");
    }

    /// Stop listening and cancel the recurring check. Safe to call when idle.
    pub(crate) fn stop(&self) {
        self.shared.listening.store(false, Ordering::Release);
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("Activity monitor stopped");
        }
        self.shared.publish(IdleStatus::Inactive);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub(crate) fn listener(&self) -> ActivityListener {
        ActivityListener {
            shared: self.shared.clone(),
        }
    }

    pub(crate) fn status(&self) -> watch::Receiver<IdleStatus> {
        self.shared.status.subscribe()
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

struct IdleCheck {
    shared: Arc<Shared>,
    idle_limit: Duration,
    check_interval: Duration,
    warning_lead: Option<Duration>,
}

impl IdleCheck {
    async fn run<F: Fn()>(self, on_timeout: F) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        let mut fired = false;
        loop {
            ticker.tick().await;
            let last = *self.shared.last_activity.lock();
            let idle = Instant::now().saturating_duration_since(last);

            if idle >= self.idle_limit {
                if !fired {
                    fired = true;
                    tracing::info!(idle_secs = idle.as_secs(), "Session idle limit reached");
                    self.shared.publish(IdleStatus::Expired);
                    on_timeout();
                }
                continue;
            }

            fired = false;
            let remaining = self.idle_limit - idle;
            match self.warning_lead {
                Some(lead) if remaining <= lead => {
                    self.shared.publish(IdleStatus::Warning { remaining });
                }
                _ => self.shared.publish(IdleStatus::Active),
            }
        }
    }
}
