use std::time::Duration;

use async_trait::async_trait;
use periodic_timer::{PeriodicTimer, TimerCallback, TimerState};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

struct SendTick {
    sender: mpsc::UnboundedSender<u32>,
    label: u32,
}

#[async_trait]
impl TimerCallback for SendTick {
    async fn execute(&self) {
        // Runs on the worker's own runtime, so tokio timers are available.
        sleep(Duration::from_millis(1)).await;
        let _ = self.sender.send(self.label);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn async_callback_runs_on_worker() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let timer = PeriodicTimer::started(
        Duration::from_millis(10),
        SendTick { sender, label: 1 },
    )
    .unwrap();

    for _ in 0..3 {
        let label = timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("tick within deadline");
        assert_eq!(label, Some(1));
    }

    timer.stop();
    assert_eq!(timer.get_state(), TimerState::Stopped);
    assert!(timer.shutdown().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_callback_can_replace_closure() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let timer = PeriodicTimer::new(Duration::from_millis(10), || {}).unwrap();
    timer.set_callback(SendTick { sender, label: 7 });
    timer.start_once();

    let label = timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("tick within deadline");
    assert_eq!(label, Some(7));

    sleep(Duration::from_millis(100)).await;
    assert!(receiver.try_recv().is_err());
    assert_eq!(timer.get_state(), TimerState::Stopped);
}
