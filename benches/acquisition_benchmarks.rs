use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use drop_sense::acquisition::{build_channels, AcquisitionSession, ChannelMask, Direction};
use drop_sense::config::BoardConfig;
use drop_sense::hal::simulator::SimulatedBoard;

const CHANNEL_COUNTS: &[u8] = &[1, 2, 4, 8];

fn benchmark_channel_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("channels");

    for &count in CHANNEL_COUNTS {
        let bindings: Vec<(u8, u8)> = (0..count).map(|id| (id, id + 4)).collect();

        group.bench_with_input(BenchmarkId::new("build_and_mask", count), &bindings, |b, bindings| {
            b.iter(|| {
                let channels = build_channels(black_box(bindings)).unwrap();
                ChannelMask::from_channels(&channels).bits()
            });
        });
    }

    group.finish();
}

fn benchmark_threshold_encoding(c: &mut Criterion) {
    c.bench_function("encode_thresholds", |b| {
        b.iter(|| {
            (0..=u16::MAX)
                .step_by(257)
                .map(|t| Direction::Falling.encode(black_box(t)) + Direction::Rising.encode(t))
                .sum::<i32>()
        });
    });
}

fn benchmark_polling(c: &mut Criterion) {
    let board = SimulatedBoard::new();
    board.set_recording(false);
    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11), (2, 12)]).unwrap();
    board.feed().set_samples(&[(1, 40_000), (2, 39_000)]);

    let mut group = c.benchmark_group("polling");
    group.bench_function("read_latest", |b| {
        b.iter(|| session.read_latest(black_box(1)).unwrap())
    });
    group.bench_function("read_all", |b| b.iter(|| session.read_all().unwrap()));
    group.finish();
}

criterion_group!(
    benches,
    benchmark_channel_setup,
    benchmark_threshold_encoding,
    benchmark_polling
);
criterion_main!(benches);
