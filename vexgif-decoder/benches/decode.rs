//! Decoder benchmarks

#[path = "../tests/common/mod.rs"]
mod common;

use common::{lzw_encode, write_sub_blocks, FrameSpec, GifBuilder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vexgif_core::MemorySource;
use vexgif_decoder::{CodeReader, FrameStatus, GifStream, LzwDecoder};

fn generate_raster(width: usize, height: usize) -> Vec<u8> {
    // Diagonal bands with some noise: compresses like a typical sprite sheet.
    let mut seed = 0x1234_5678u32;
    (0..width * height)
        .map(|i| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let band = ((i % width + i / width) / 6) as u8;
            if seed >> 28 == 0 {
                (seed >> 20) as u8
            } else {
                band
            }
        })
        .collect()
}

fn palette() -> Vec<[u8; 3]> {
    (0..=255u8).map(|i| [i, i.wrapping_mul(3), 255 - i]).collect()
}

fn bench_lzw(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzw_decode");

    for (width, height, name) in &[(96usize, 64usize, "sprite"), (480, 272, "brain_screen")] {
        let raster = generate_raster(*width, *height);
        let mut data = Vec::new();
        write_sub_blocks(&mut data, &lzw_encode(&raster, 8));

        group.throughput(Throughput::Elements(raster.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            let mut pixels = vec![0u8; raster.len()];
            b.iter(|| {
                let mut src = MemorySource::new(data.clone());
                let mut reader = CodeReader::new(&mut src);
                let mut decoder = LzwDecoder::new(8).unwrap();
                black_box(decoder.decode(&mut reader, pixels.as_mut_slice()).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");

    for frames in [1usize, 8, 24] {
        let mut builder = GifBuilder::new(480, 272, palette()).netscape(0);
        for i in 0..frames {
            let size = 64 + (i % 4) as u16 * 32;
            let raster = generate_raster(size as usize, size as usize);
            builder = builder.frame(
                FrameSpec::new((i * 11 % 300) as u16, (i * 7 % 150) as u16, size, size, raster)
                    .delay(4)
                    .disposal(if i % 2 == 0 { 1 } else { 2 }),
            );
        }
        let bytes = builder.build();

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(BenchmarkId::new("frames", frames), &bytes, |b, bytes| {
            b.iter(|| {
                let mut gif = GifStream::from_bytes(bytes.clone()).unwrap();
                let mut rgb = vec![0u8; gif.frame_buffer_len()];
                while let FrameStatus::Produced = gif.next_frame().unwrap() {
                    gif.render_frame(&mut rgb).unwrap();
                }
                black_box(rgb)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lzw, bench_stream);
criterion_main!(benches);
