use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use periodic_timer::PeriodicTimer;

fn bench_control_calls(c: &mut Criterion) {
    let timer = PeriodicTimer::new(Duration::from_secs(60), || {}).unwrap();

    c.bench_function("start_stop", |b| {
        b.iter(|| {
            timer.start();
            timer.stop();
        })
    });

    c.bench_function("set_interval_running", |b| {
        timer.start();
        b.iter(|| timer.set_interval(black_box(Duration::from_secs(60))));
        timer.stop();
    });

    c.bench_function("get_state", |b| b.iter(|| black_box(timer.get_state())));
}

fn bench_lifecycle(c: &mut Criterion) {
    c.bench_function("create_and_drop", |b| {
        b.iter(|| {
            let timer = PeriodicTimer::new(Duration::from_secs(60), || {}).unwrap();
            drop(black_box(timer));
        })
    });

    c.bench_function("start_once_round_trip", |b| {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = PeriodicTimer::new(Duration::ZERO, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        b.iter(|| {
            let before = fired.load(Ordering::SeqCst);
            timer.start_once();
            while fired.load(Ordering::SeqCst) == before {
                std::hint::spin_loop();
            }
        })
    });
}

criterion_group!(benches, bench_control_calls, bench_lifecycle);
criterion_main!(benches);
