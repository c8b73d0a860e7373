// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::hint::black_box;

use beatclick::clips::ClipSet;
use beatclick::scheduler::BeatScheduler;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SAMPLE_RATE: u32 = 48000;
const CLIP_LEN: usize = 4800;

fn generate_click(len: usize, frequency: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let envelope = 1.0 - i as f32 / len as f32;
            envelope * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn benchmark_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");

    let clips = ClipSet::new(
        generate_click(CLIP_LEN, 1000.0),
        Some(generate_click(CLIP_LEN, 1500.0)),
    )
    .unwrap();

    // Typical device buffer sizes.
    for buffer_frames in [64usize, 256, 1024, 4096] {
        let mut scheduler = BeatScheduler::new(133.0, 4, clips.clone(), SAMPLE_RATE).unwrap();
        let mut buffer = vec![0.0f32; buffer_frames];

        group.throughput(Throughput::Elements(buffer_frames as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_frames),
            &buffer_frames,
            |b, _| {
                b.iter(|| {
                    scheduler.fill(black_box(&mut buffer));
                    black_box(buffer[0])
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_fill);
criterion_main!(benches);
