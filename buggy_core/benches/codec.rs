use buggy_core::{FrameParser, RingBuffer};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

// Mixed traffic: speed reports, packed floats, and some line noise
fn synth_stream(frames: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut out = Vec::with_capacity(frames * 8);
    for i in 0..frames {
        let r = next();
        match i % 8 {
            0 => out.extend_from_slice(format!("v{r},").as_bytes()),
            7 => out.extend_from_slice(b"\r\nok\r\n"),
            _ => out.extend_from_slice(format!("x{},", r % 255).as_bytes()),
        }
    }
    out
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p buggy_core --bench codec
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_parser(c: &mut Criterion) {
    let stream = synth_stream(10_000, 0xB0661E);
    let mut g = c.benchmark_group("frame_parser");
    configure(&mut g);
    g.throughput(Throughput::Bytes(stream.len() as u64));
    g.bench_function("feed", |b| {
        b.iter_batched(
            FrameParser::new,
            |mut p| {
                let mut sum = 0u64;
                p.feed(black_box(&stream), |cmd| sum += u64::from(cmd.value));
                black_box(sum);
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

pub fn bench_ring_buffer(c: &mut Criterion) {
    let stream = synth_stream(10_000, 0x5EED);
    let mut g = c.benchmark_group("ring_buffer");
    configure(&mut g);
    g.throughput(Throughput::Bytes(stream.len() as u64));
    for &chunk in &[16usize, 64] {
        g.bench_function(format!("write_read_{chunk}"), |b| {
            let mut out = [0u8; 64];
            b.iter(|| {
                let mut rb = RingBuffer::<128>::new();
                let mut moved = 0usize;
                for piece in stream.chunks(chunk) {
                    rb.write(black_box(piece));
                    moved += rb.read(&mut out);
                }
                black_box(moved);
            })
        });
    }
    g.finish();
}

criterion_group!(codec, bench_parser, bench_ring_buffer);
criterion_main!(codec);
