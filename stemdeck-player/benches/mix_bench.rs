//! Mix Bus Throughput Benchmark
//!
//! Measures the render path the audio callback runs: four scheduled stems
//! summed into one stereo block.
//!
//! **Target:** a 512-frame block must render far faster than its 11.6 ms
//! of audio at 44.1 kHz.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stemdeck_player::audio::{AudioFrame, Resampler, StemBuffer};
use stemdeck_player::engine::{MixBus, Track};

const SAMPLE_RATE: u32 = 44_100;

fn scheduled_bus(tracks: usize) -> (MixBus, Vec<Track>) {
    let bus = MixBus::new();
    let tracks: Vec<Track> = (0..tracks)
        .map(|i| {
            let samples: Vec<f32> = (0..SAMPLE_RATE as usize * 2 * 10)
                .map(|n| ((n + i * 7) % 200) as f32 / 200.0 - 0.5)
                .collect();
            let track = Track::new(
                format!("stem-{}", i),
                StemBuffer::new(samples, SAMPLE_RATE),
                0.5,
                0.2,
            );
            bus.attach(&track);
            track.schedule_start(0.0, 0).unwrap();
            track
        })
        .collect();
    (bus, tracks)
}

fn bench_mix_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_bus");

    for block in [256usize, 512, 1024] {
        group.bench_with_input(BenchmarkId::new("four_stems", block), &block, |b, &block| {
            let (bus, _tracks) = scheduled_bus(4);
            let mut out = vec![AudioFrame::zero(); block];
            let mut now = 0u64;

            b.iter(|| {
                bus.render_into(now, &mut out);
                now = (now + block as u64) % (SAMPLE_RATE as u64 * 9);
                black_box(&out);
            });
        });
    }

    group.finish();
}

fn bench_resample_stem(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    group.sample_size(10);

    group.bench_function("one_second_48k_to_44k1", |b| {
        let input: Vec<f32> = (0..48_000 * 2)
            .map(|n| (n as f32 * 0.01).sin() * 0.5)
            .collect();

        b.iter(|| {
            let output = Resampler::resample(black_box(&input), 48_000, SAMPLE_RATE).unwrap();
            black_box(output);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mix_block, bench_resample_stem);
criterion_main!(benches);
