//! # Lidar Decode Benchmark

use byteorder::{ByteOrder, LittleEndian};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::{Duration, Instant};

use rov_lib::lidar::{crc8, FrameSync, LidarParams, SectorEstimator, FRAME_SIZE, HEADER};

/// One revolution's worth of frames, roughly what the sensor sends every 100 ms.
const FRAMES_PER_REV: usize = 38;

fn build_revolution() -> Vec<u8> {
    let mut stream = Vec::with_capacity(FRAMES_PER_REV * FRAME_SIZE);
    let span_deg = 360.0 / FRAMES_PER_REV as f64;

    for i in 0..FRAMES_PER_REV {
        let start = i as f64 * span_deg;
        let end = (start + span_deg) % 360.0;

        let mut f = vec![0u8; FRAME_SIZE];
        f[0] = HEADER[0];
        f[1] = HEADER[1];
        LittleEndian::write_u16(&mut f[4..6], (start * 100.0) as u16);
        LittleEndian::write_u16(&mut f[42..44], (end * 100.0) as u16);
        for p in 0..12 {
            let o = 6 + 3 * p;
            LittleEndian::write_u16(&mut f[o..o + 2], (300 + 40 * ((i + p) % 50)) as u16);
            f[o + 2] = 200;
        }
        f[FRAME_SIZE - 1] = crc8(&f[..FRAME_SIZE - 1]);

        stream.extend_from_slice(&f);
    }

    stream
}

fn decode_benchmark(c: &mut Criterion) {
    let stream = build_revolution();
    let params = LidarParams::default();

    c.bench_function("decode revolution", |b| {
        b.iter(|| {
            let mut sync = FrameSync::new(false, Duration::from_secs(1));
            let mut est = SectorEstimator::new(&params);
            sync.push(black_box(&stream));
            while let Some(p) = sync.next_packet(Instant::now()) {
                est.apply_packet(&p);
            }
            est.state()
        })
    });

    c.bench_function("decode revolution with crc", |b| {
        b.iter(|| {
            let mut sync = FrameSync::new(true, Duration::from_secs(1));
            let mut est = SectorEstimator::new(&params);
            sync.push(black_box(&stream));
            while let Some(p) = sync.next_packet(Instant::now()) {
                est.apply_packet(&p);
            }
            est.state()
        })
    });
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
