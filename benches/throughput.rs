use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ninetone::protocol::*;
use ninetone::{Decoder, Output};

const PAYLOAD_SIZES: &[usize] = &[1, 8, 32, 128, 255];

/// Over-the-air duration of a transmission at the reference WAV rate.
fn audio_duration_secs(payload_len: usize) -> f64 {
    let symbols = LEAD_SILENCE_SYMBOLS
        + SYNC_PREAMBLE_SYMBOLS
        + 1
        + payload_len
        + TAIL_SILENCE_SYMBOLS;
    (symbols * SAMPLE_COUNT) as f64 / WAV_SAMPLE_RATE as f64
}

/// Print the wire bandwidth table once before benchmarks run.
fn print_wire_table() {
    println!();
    println!(
        "=== Wire Bandwidth (9 tones, {} samples/symbol @ {} Hz) ===",
        SAMPLE_COUNT, WAV_SAMPLE_RATE
    );
    println!(
        "{:>7} {:>8} {:>10} {:>10} {:>12}",
        "Payload", "Symbols", "Samples", "Duration", "Bitrate"
    );
    println!(
        "{:>7} {:>8} {:>10} {:>10} {:>12}",
        "(bytes)", "", "", "(sec)", "(bit/s)"
    );
    println!("{}", "-".repeat(52));
    for &size in PAYLOAD_SIZES {
        let symbols =
            LEAD_SILENCE_SYMBOLS + SYNC_PREAMBLE_SYMBOLS + 1 + size + TAIL_SILENCE_SYMBOLS;
        let samples = symbols * SAMPLE_COUNT;
        let duration = samples as f64 / WAV_SAMPLE_RATE as f64;
        let bitrate = (size * 8) as f64 / duration;
        println!(
            "{:>7} {:>8} {:>10} {:>10.3} {:>10.0}",
            size, symbols, samples, duration, bitrate,
        );
    }
    println!();
}

fn make_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 7 + 13) % 255 + 1) as u8).collect()
}

fn decode_all(audio: &[f32]) -> Vec<u8> {
    let mut decoder = Decoder::new();
    let mut out = Vec::new();
    for &s in audio {
        match decoder.decode_f32(s) {
            Output::Pending => {}
            Output::Byte(b) => out.push(b),
            Output::Eof => break,
        }
    }
    out
}

fn bench_encode(c: &mut Criterion) {
    print_wire_table();

    let mut group = c.benchmark_group("encode");
    for &size in PAYLOAD_SIZES {
        let payload = make_payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| ninetone::encode(payload, DATA_AMPLITUDE).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for &size in PAYLOAD_SIZES {
        let payload = make_payload(size);
        let audio = ninetone::encode(&payload, DATA_AMPLITUDE).unwrap();
        let duration = audio_duration_secs(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &audio, |b, audio| {
            b.iter(|| {
                let decoded = decode_all(audio);
                assert_eq!(decoded.len(), size);
            });
        });
        let decode_time = {
            let start = std::time::Instant::now();
            for _ in 0..10 {
                let _ = decode_all(&audio);
            }
            start.elapsed().as_secs_f64() / 10.0
        };
        println!(
            "  decode/{size}: audio {duration:.3}s, decode {decode_time:.6}s -> {:.0}x real-time",
            duration / decode_time
        );
    }
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");
    for &size in PAYLOAD_SIZES {
        let payload = make_payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let audio = ninetone::encode(payload, DATA_AMPLITUDE).unwrap();
                decode_all(&audio)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip);
criterion_main!(benches);
