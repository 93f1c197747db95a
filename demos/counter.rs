use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use periodic_timer::PeriodicTimer;

fn main() {
    env_logger::init();

    let count = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::clone(&count);

    // 1. A timer that counts every 200ms
    let timer = PeriodicTimer::new(Duration::from_millis(200), move || {
        let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
        println!("200ms elapsed, count = {}", n);
    })
    .expect("spawn timer");
    timer.start();

    // 2. Poll from a separate thread until ten ticks were seen
    let watched = Arc::clone(&count);
    let watcher = thread::spawn(move || {
        while watched.load(Ordering::SeqCst) < 10 {
            thread::sleep(Duration::from_millis(10));
        }
    });
    watcher.join().expect("watcher thread");

    // 3. Speed up, then fire a single extra tick
    timer.stop();
    timer.set_interval(Duration::from_millis(50));
    timer.start_once();
    thread::sleep(Duration::from_millis(200));
    println!("state after start_once: {:?}", timer.get_state());
    println!("statistics: {:?}", timer.get_statistics());

    // 4. Dropping the timer joins its worker
    drop(timer);
    println!("final count = {}", count.load(Ordering::SeqCst));
}
