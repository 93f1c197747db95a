use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use async_trait::async_trait;
#[cfg(feature = "logging")]
use log::{debug, error};

use crate::errors::TimerError;
use crate::worker::{self, Shared};

/// Interval used by [`PeriodicTimer::default`] and [`TimerBuilder::new`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Name given to the worker thread unless the builder overrides it.
pub const DEFAULT_THREAD_NAME: &str = "periodic-timer";

/// Represents the state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Idle; the worker waits without a timeout.
    Stopped,
    /// Fires the callback every interval.
    Running,
    /// Fires the callback once, then falls back to `Stopped`.
    RunningOnce,
    /// The timer is being torn down. Never left once entered.
    Terminated,
}

impl TimerState {
    /// Resolves a requested transition. `Terminated` absorbs every request.
    pub(crate) fn request(self, next: TimerState) -> TimerState {
        match self {
            TimerState::Terminated => TimerState::Terminated,
            _ => next,
        }
    }

    /// The state the worker moves to after a firing completes.
    pub(crate) fn after_fire(self) -> TimerState {
        match self {
            TimerState::RunningOnce => TimerState::Stopped,
            other => other,
        }
    }

    /// Whether the worker waits with a timeout in this state.
    pub fn is_active(self) -> bool {
        matches!(self, TimerState::Running | TimerState::RunningOnce)
    }
}

/// Statistics for a timer.
#[derive(Debug, Clone, Default)]
pub struct TimerStatistics {
    /// Number of times the callback has been executed.
    pub execution_count: usize,
    /// Time between the latest start and the latest execution.
    pub elapsed_time: Duration,
}

/// A trait for timer callbacks.
///
/// Any `Fn() + Send + Sync` closure is a callback. Implement the trait
/// directly to run async work on the worker's runtime.
#[async_trait]
pub trait TimerCallback: Send + Sync {
    /// The function to execute when the timer triggers.
    async fn execute(&self);
}

#[async_trait]
impl<F> TimerCallback for F
where
    F: Fn() + Send + Sync,
{
    async fn execute(&self) {
        (self)()
    }
}

/// A timer that invokes its callback from a dedicated worker thread.
///
/// Dropping the timer terminates the worker and blocks until it has exited.
/// If the callback panicked, the panic is re-raised on the dropping thread;
/// use [`PeriodicTimer::shutdown`] to receive it as an error instead.
pub struct PeriodicTimer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// Creates a stopped timer.
    pub fn new<C>(interval: Duration, callback: C) -> Result<Self, TimerError>
    where
        C: TimerCallback + 'static,
    {
        TimerBuilder::new()
            .interval(interval)
            .callback(callback)
            .build()
    }

    /// Creates a timer that is already running.
    pub fn started<C>(interval: Duration, callback: C) -> Result<Self, TimerError>
    where
        C: TimerCallback + 'static,
    {
        TimerBuilder::new()
            .interval(interval)
            .callback(callback)
            .autostart(true)
            .build()
    }

    /// Returns a builder for a fully configured timer.
    pub fn builder() -> TimerBuilder {
        TimerBuilder::new()
    }

    /// Gets the current state of the timer.
    pub fn get_state(&self) -> TimerState {
        self.shared.state()
    }

    /// Gets the currently configured interval.
    pub fn interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Replaces the interval.
    ///
    /// A running timer re-arms its wait with the new interval right away
    /// instead of finishing the old one. A zero interval is allowed and fires
    /// as fast as the worker can loop.
    pub fn set_interval(&self, interval: Duration) {
        self.shared.set_interval(interval);
        #[cfg(feature = "logging")]
        debug!("Timer interval set to {:?}.", interval);
    }

    /// Replaces the callback. A callback that is currently executing is not
    /// interrupted; the new one is used from the next firing on.
    pub fn set_callback<C>(&self, callback: C)
    where
        C: TimerCallback + 'static,
    {
        self.shared.set_callback(Some(Arc::new(callback)));
    }

    /// Removes the callback. Firings still happen but do nothing.
    pub fn clear_callback(&self) {
        self.shared.set_callback(None);
    }

    /// Starts firing every interval. Calling it on a running timer only
    /// restarts the current wait.
    pub fn start(&self) {
        self.shared.transition(TimerState::Running);
        #[cfg(feature = "logging")]
        debug!("Timer started.");
    }

    /// Fires the callback once after one interval, then stops.
    pub fn start_once(&self) {
        self.shared.transition(TimerState::RunningOnce);
        #[cfg(feature = "logging")]
        debug!("Timer started once.");
    }

    /// Stops the timer. A callback already executing runs to completion.
    pub fn stop(&self) {
        self.shared.transition(TimerState::Stopped);
        #[cfg(feature = "logging")]
        debug!("Timer stopped.");
    }

    /// Gets the timer's statistics.
    pub fn get_statistics(&self) -> TimerStatistics {
        self.shared.statistics()
    }

    /// Terminates the worker and waits for it, reporting a worker that died
    /// from a callback panic as [`TimerError::CallbackError`].
    pub fn shutdown(mut self) -> Result<(), TimerError> {
        match self.terminate() {
            Some(Err(payload)) => Err(TimerError::from_panic(payload.as_ref())),
            _ => Ok(()),
        }
    }

    fn terminate(&mut self) -> Option<thread::Result<()>> {
        let handle = self.handle.take()?;
        self.shared.transition(TimerState::Terminated);
        #[cfg(feature = "logging")]
        debug!("Terminating timer worker.");
        let result = handle.join();
        if result.is_err() {
            #[cfg(feature = "logging")]
            error!("Timer worker exited with a panicking callback.");
        }
        Some(result)
    }
}

impl Default for PeriodicTimer {
    /// A stopped timer with a one second interval and no callback.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned.
    fn default() -> Self {
        match TimerBuilder::new().build() {
            Ok(timer) => timer,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        if let Some(Err(payload)) = self.terminate() {
            if !thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("state", &self.get_state())
            .field("interval", &self.interval())
            .finish()
    }
}

/// Builder for [`PeriodicTimer`].
pub struct TimerBuilder {
    interval: Duration,
    callback: Option<Arc<dyn TimerCallback>>,
    autostart: bool,
    thread_name: String,
}

impl TimerBuilder {
    /// A builder with a one second interval, no callback and no autostart.
    pub fn new() -> Self {
        TimerBuilder {
            interval: DEFAULT_INTERVAL,
            callback: None,
            autostart: false,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn callback<C>(mut self, callback: C) -> Self
    where
        C: TimerCallback + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Whether the timer begins in the `Running` state.
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Spawns the worker and returns the timer.
    pub fn build(self) -> Result<PeriodicTimer, TimerError> {
        let state = if self.autostart {
            TimerState::Running
        } else {
            TimerState::Stopped
        };
        let shared = Arc::new(Shared::new(state, self.interval, self.callback));
        let handle = worker::spawn(Arc::clone(&shared), self.thread_name)?;

        #[cfg(feature = "logging")]
        debug!("Timer created in state {:?}.", state);

        Ok(PeriodicTimer {
            shared,
            handle: Some(handle),
        })
    }
}

impl Default for TimerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
