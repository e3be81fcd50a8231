use corrflow::{
    Accelerator, AcceleratorConfig, CorrelationFlow, FrameBuffer, FrameExtent, ParamRegistry,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> FrameBuffer {
    FrameBuffer::from_fn(width, height, |x, y| {
        (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as f32
    })
    .unwrap()
}

struct Outputs {
    flow_x: FrameBuffer,
    flow_y: FrameBuffer,
    confidence: FrameBuffer,
    surfaces: FrameBuffer,
}

impl Outputs {
    fn new(extent: FrameExtent, window: usize) -> Self {
        Self {
            flow_x: FrameBuffer::with_extent(extent).unwrap(),
            flow_y: FrameBuffer::with_extent(extent).unwrap(),
            confidence: FrameBuffer::with_extent(extent).unwrap(),
            surfaces: FrameBuffer::with_extent(extent.scaled(window).unwrap()).unwrap(),
        }
    }
}

fn bench_compute_flow(c: &mut Criterion) {
    let width = 128;
    let height = 100;
    let window = 18;
    let params = ParamRegistry::new();

    for (name, parallel) in [("compute_flow_sequential", false), ("compute_flow_parallel", true)] {
        if parallel && !cfg!(feature = "rayon") {
            continue;
        }
        let accel = Accelerator::acquire(AcceleratorConfig {
            parallel,
            ..AcceleratorConfig::default()
        })
        .unwrap();
        let mut image = make_image(width, height);
        let extent = image.extent();
        let mut engine = CorrelationFlow::new(&accel);
        engine.initialize(extent, window).unwrap();
        let mut out = Outputs::new(extent, window);

        c.bench_function(name, |b| {
            b.iter(|| {
                engine
                    .compute_flow(
                        &mut image,
                        &mut out.flow_x,
                        &mut out.flow_y,
                        &mut out.confidence,
                        &mut out.surfaces,
                        &params,
                    )
                    .unwrap();
                black_box(out.confidence.as_slice()[0]);
            });
        });
    }
}

fn bench_small_windows(c: &mut Criterion) {
    let accel = Accelerator::acquire(AcceleratorConfig::default()).unwrap();
    let mut image = make_image(256, 256);
    let extent = image.extent();
    let params = ParamRegistry::new();
    for window in [5, 9] {
        let mut engine = CorrelationFlow::new(&accel);
        engine.initialize(extent, window).unwrap();
        let mut out = Outputs::new(extent, window);
        c.bench_function(&format!("compute_flow_256_window_{window}"), |b| {
            b.iter(|| {
                engine
                    .compute_flow(
                        &mut image,
                        &mut out.flow_x,
                        &mut out.flow_y,
                        &mut out.confidence,
                        &mut out.surfaces,
                        &params,
                    )
                    .unwrap();
                black_box(out.flow_x.as_slice()[0]);
            });
        });
    }
}

criterion_group!(benches, bench_compute_flow, bench_small_windows);
criterion_main!(benches);
