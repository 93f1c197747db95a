//! The worker side of a [`PeriodicTimer`](crate::PeriodicTimer): shared state
//! and the loop that runs on the dedicated thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
#[cfg(feature = "logging")]
use log::{debug, trace};
use tokio::runtime;
use tokio::sync::Notify;
use tokio::time;

use crate::errors::TimerError;
use crate::timer::{TimerCallback, TimerState, TimerStatistics};

/// Configuration guarded by a single lock. Never held across a wait or a
/// callback.
struct Config {
    state: TimerState,
    interval: Duration,
    callback: Option<Arc<dyn TimerCallback>>,
    /// Bumped by every client call that wakes the worker.
    epoch: u64,
    /// Bumped only by start, start_once and stop.
    requests: u64,
    started_at: Option<Instant>,
}

/// What the worker read before waiting.
struct Snapshot {
    state: TimerState,
    interval: Duration,
    epoch: u64,
    requests: u64,
}

/// Outcome of an elapsed wait.
enum Tick {
    /// The configuration changed after the wait was armed.
    Stale,
    /// Fire with whatever callback is installed right now.
    Due(Option<Arc<dyn TimerCallback>>),
}

pub(crate) struct Shared {
    config: Mutex<Config>,
    /// Holds at most one pending wake, so a signal sent while the worker is
    /// busy is seen by its next wait.
    notify: Notify,
    statistics: Mutex<TimerStatistics>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    pub(crate) fn new(
        state: TimerState,
        interval: Duration,
        callback: Option<Arc<dyn TimerCallback>>,
    ) -> Self {
        let started_at = state.is_active().then(Instant::now);
        Shared {
            config: Mutex::new(Config {
                state,
                interval,
                callback,
                epoch: 0,
                requests: 0,
                started_at,
            }),
            notify: Notify::new(),
            statistics: Mutex::new(TimerStatistics::default()),
        }
    }

    pub(crate) fn state(&self) -> TimerState {
        lock(&self.config).state
    }

    pub(crate) fn interval(&self) -> Duration {
        lock(&self.config).interval
    }

    pub(crate) fn statistics(&self) -> TimerStatistics {
        lock(&self.statistics).clone()
    }

    /// Moves to `next` and wakes the worker.
    pub(crate) fn transition(&self, next: TimerState) {
        {
            let mut config = lock(&self.config);
            config.state = config.state.request(next);
            if config.state.is_active() {
                config.started_at = Some(Instant::now());
            }
            config.epoch += 1;
            config.requests += 1;
        }
        self.notify.notify_one();
    }

    pub(crate) fn set_interval(&self, interval: Duration) {
        let wake = {
            let mut config = lock(&self.config);
            config.interval = interval;
            if config.state != TimerState::Stopped {
                config.epoch += 1;
                true
            } else {
                false
            }
        };
        if wake {
            self.notify.notify_one();
        }
    }

    pub(crate) fn set_callback(&self, callback: Option<Arc<dyn TimerCallback>>) {
        lock(&self.config).callback = callback;
    }

    fn snapshot(&self) -> Snapshot {
        let config = lock(&self.config);
        Snapshot {
            state: config.state,
            interval: config.interval,
            epoch: config.epoch,
            requests: config.requests,
        }
    }

    /// Decides whether an elapsed wait may fire. A client call that landed
    /// while the wait was timing out wins over the firing.
    fn tick(&self, epoch: u64) -> Tick {
        let config = lock(&self.config);
        if config.epoch != epoch || !config.state.is_active() {
            Tick::Stale
        } else {
            Tick::Due(config.callback.clone())
        }
    }

    /// Records a completed firing and applies the worker's own transition,
    /// unless a client requested a new state in the meantime. Interval
    /// changes do not count as such a request.
    fn fired(&self, requests: u64) {
        let started_at = {
            let mut config = lock(&self.config);
            if config.requests == requests {
                config.state = config.state.after_fire();
            }
            config.started_at
        };

        let mut stats = lock(&self.statistics);
        stats.execution_count += 1;
        if let Some(started_at) = started_at {
            stats.elapsed_time = started_at.elapsed();
        }
    }
}

/// Spawns the worker thread with its own single-threaded runtime.
pub(crate) fn spawn(shared: Arc<Shared>, name: String) -> Result<JoinHandle<()>, TimerError> {
    let runtime = runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || runtime.block_on(run(shared)))?;
    Ok(handle)
}

async fn run(shared: Arc<Shared>) {
    #[cfg(feature = "logging")]
    debug!("Timer worker started.");

    loop {
        let Snapshot {
            state,
            interval,
            epoch,
            requests,
        } = shared.snapshot();

        match state {
            TimerState::Terminated => break,
            TimerState::Stopped => shared.notify.notified().await,
            TimerState::Running | TimerState::RunningOnce => {
                // Any wake before the timeout re-arms a full interval.
                if time::timeout(interval, shared.notify.notified())
                    .await
                    .is_ok()
                {
                    continue;
                }

                let callback = match shared.tick(epoch) {
                    Tick::Stale => continue,
                    Tick::Due(callback) => callback,
                };

                #[cfg(feature = "logging")]
                trace!("Timer fired.");

                if let Some(callback) = callback {
                    callback.execute().await;
                }
                shared.fired(requests);
            }
        }
    }

    #[cfg(feature = "logging")]
    debug!("Timer worker exited.");
}
