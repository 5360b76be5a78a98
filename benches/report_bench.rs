//! Benchmarks for the sampling and reporting path

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sched_timer_probe::report::{format_row, Reporter};
use sched_timer_probe::timer::{IntervalTimer, TimerQuery, TimerSample};
use sched_timer_probe::tracker::{Label, TimeSample, TimeTracker};
use sched_timer_probe::ProcessCpuClock;
use std::io;
use std::time::Duration;

fn alarm_sample(seq: u64) -> TimeSample {
    TimeSample {
        label: Label::Alarm,
        seq,
        elapsed: Duration::from_millis(12_345),
        timer: Some(TimerSample {
            remaining: Duration::from_millis(1_990),
            interval: Duration::from_secs(2),
        }),
    }
}

fn benchmark_format_row(c: &mut Criterion) {
    let sample = alarm_sample(1);
    c.bench_function("format_row", |b| {
        b.iter(|| black_box(format_row(black_box(&sample))));
    });
}

fn benchmark_write_sample(c: &mut Criterion) {
    let mut reporter = Reporter::new(io::sink(), 20);
    let mut seq = 0;
    c.bench_function("write_sample", |b| {
        b.iter(|| {
            seq += 1;
            let _ = black_box(reporter.write_sample(&alarm_sample(seq)));
        });
    });
}

fn benchmark_clocks(c: &mut Criterion) {
    let clock = ProcessCpuClock;
    c.bench_function("process_cpu_clock", |b| {
        b.iter(|| black_box(clock.now()));
    });

    let timer = IntervalTimer::new();
    c.bench_function("getitimer", |b| {
        b.iter(|| black_box(timer.query()));
    });

    let mut tracker = TimeTracker::new(timer);
    c.bench_function("tracker_sample_with_timer", |b| {
        b.iter(|| black_box(tracker.sample(Label::Main, true)));
    });
}

criterion_group!(
    benches,
    benchmark_format_row,
    benchmark_write_sample,
    benchmark_clocks
);
criterion_main!(benches);
