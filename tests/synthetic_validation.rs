//! Integration tests validating flow estimates on synthetic images with known
//! self-similarity.

use corrflow::{
    Accelerator, AcceleratorConfig, CorrelationFlow, FrameBuffer, FrameExtent, ParamRegistry,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Spatial period of the sinusoid tests in pixels.
const PERIOD: usize = 4;

/// Tolerance for comparing flows of affinely related images.
const AFFINE_TOLERANCE: f32 = 1e-3;

struct Flow {
    flow_x: FrameBuffer,
    flow_y: FrameBuffer,
    confidence: FrameBuffer,
    surfaces: FrameBuffer,
}

fn run(image: &FrameBuffer, window: usize, parallel: bool) -> Flow {
    let accel = Accelerator::acquire(AcceleratorConfig {
        parallel,
        ..AcceleratorConfig::default()
    })
    .unwrap();
    let extent = image.extent();
    let mut engine = CorrelationFlow::new(&accel);
    engine.initialize(extent, window).unwrap();

    let mut image = image.clone();
    let mut flow_x = FrameBuffer::with_extent(extent).unwrap();
    let mut flow_y = FrameBuffer::with_extent(extent).unwrap();
    let mut confidence = FrameBuffer::with_extent(extent).unwrap();
    let mut surfaces = FrameBuffer::with_extent(extent.scaled(window).unwrap()).unwrap();
    // Stale values must be overwritten everywhere, border included.
    for frame in [&mut flow_x, &mut flow_y, &mut confidence, &mut surfaces] {
        frame.fill(f32::NAN);
    }
    engine
        .compute_flow(
            &mut image,
            &mut flow_x,
            &mut flow_y,
            &mut confidence,
            &mut surfaces,
            &ParamRegistry::new(),
        )
        .unwrap();
    engine.destroy();
    Flow {
        flow_x,
        flow_y,
        confidence,
        surfaces,
    }
}

fn interior(width: usize, height: usize, window: usize) -> impl Iterator<Item = (usize, usize)> {
    let m = window / 2;
    (m..height - m).flat_map(move |y| (m..width - m).map(move |x| (x, y)))
}

fn mean_interior_confidence(flow: &Flow, window: usize) -> f32 {
    let (w, h) = (flow.confidence.width(), flow.confidence.height());
    let values: Vec<f32> = interior(w, h, window)
        .map(|(x, y)| flow.confidence.at(x, y))
        .collect();
    values.iter().sum::<f32>() / values.len() as f32
}

fn chirp(width: usize, height: usize) -> FrameBuffer {
    // Period PERIOD along x; the row phase varies so rows are not repeats of
    // each other.
    FrameBuffer::from_fn(width, height, |x, y| {
        (2.0 * PI * x as f32 / PERIOD as f32 + 0.3 * (y * y) as f32).sin()
    })
    .unwrap()
}

fn noise(width: usize, height: usize, seed: u64) -> FrameBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    FrameBuffer::from_fn(width, height, |_, _| rng.random_range(-1.0f32..1.0)).unwrap()
}

fn textured(width: usize, height: usize) -> FrameBuffer {
    FrameBuffer::from_fn(width, height, |x, y| {
        ((x * 7919 + y * 104729 + x * y * 31) % 1009) as f32 / 1009.0
    })
    .unwrap()
}

#[test]
fn outputs_cover_every_pixel() {
    let flow = run(&textured(13, 11), 5, false);
    for frame in [&flow.flow_x, &flow.flow_y, &flow.confidence, &flow.surfaces] {
        assert!(frame.as_slice().iter().all(|v| v.is_finite()));
    }
    assert_eq!(flow.surfaces.width(), 65);
    assert_eq!(flow.surfaces.height(), 55);
    for &c in flow.confidence.as_slice() {
        assert!((0.0..=1.0).contains(&c));
    }
}

#[test]
fn border_pixels_carry_the_sentinel() {
    let (w, h, n) = (10, 10, 5);
    let flow = run(&textured(w, h), n, false);
    let tile_row = w * n;
    for y in 0..h {
        for x in 0..w {
            let border = x < 2 || x >= 8 || y < 2 || y >= 8;
            if !border {
                continue;
            }
            assert_eq!(flow.flow_x.at(x, y), 0.0, "flow_x at {x},{y}");
            assert_eq!(flow.flow_y.at(x, y), 0.0, "flow_y at {x},{y}");
            assert_eq!(flow.confidence.at(x, y), 0.0, "confidence at {x},{y}");
            for j in 0..n {
                let tile = &flow.surfaces.as_slice()[(y * n + j) * tile_row + x * n..][..n];
                assert!(tile.iter().all(|&v| v == 0.0));
            }
        }
    }
}

#[test]
fn interior_tiles_hold_unit_zero_lag() {
    let (w, h, n) = (14, 12, 5);
    let flow = run(&textured(w, h), n, false);
    let c = n / 2;
    for (x, y) in interior(w, h, n) {
        let zero_lag = flow.surfaces.at(x * n + c, y * n + c);
        assert!((zero_lag - 1.0).abs() < 1e-4, "zero lag at {x},{y}");
        // The peak value is the confidence and never exceeds the zero lag.
        let tile_max = (0..n)
            .flat_map(|j| (0..n).map(move |i| (i, j)))
            .map(|(i, j)| flow.surfaces.at(x * n + i, y * n + j))
            .fold(f32::MIN, f32::max);
        assert!(flow.confidence.at(x, y) <= tile_max + 1e-6);
    }
}

#[test]
fn uniform_field_is_fully_self_similar() {
    for (w, h, n) in [(16, 12, 5), (20, 20, 8), (9, 9, 9)] {
        let image = FrameBuffer::from_fn(w, h, |_, _| 42.5).unwrap();
        let flow = run(&image, n, false);
        for (x, y) in interior(w, h, n) {
            assert_eq!(flow.flow_x.at(x, y), 0.0);
            assert_eq!(flow.flow_y.at(x, y), 0.0);
            assert!((flow.confidence.at(x, y) - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn zero_image_is_flat_too() {
    let flow = run(&FrameBuffer::new(8, 8).unwrap(), 3, false);
    for (x, y) in interior(8, 8, 3) {
        assert_eq!(flow.confidence.at(x, y), 1.0);
    }
}

#[test]
fn periodic_pattern_recovers_its_period() {
    let (w, h, n) = (24, 24, 9);
    let flow = run(&chirp(w, h), n, false);
    for (x, y) in interior(w, h, n) {
        let fx = flow.flow_x.at(x, y);
        let fy = flow.flow_y.at(x, y);
        assert!(
            (fx.abs() - PERIOD as f32).abs() <= 1.0,
            "flow_x {fx} at {x},{y}"
        );
        assert!(fy.abs() <= 1.0, "flow_y {fy} at {x},{y}");
    }

    let noisy = run(&noise(w, h, 0x5eed), n, false);
    assert!(mean_interior_confidence(&flow, n) > mean_interior_confidence(&noisy, n));
}

#[test]
fn identical_rows_recover_long_periods() {
    for period in [4usize, 8, 12] {
        let n = 2 * period;
        let size = 2 * n + 8;
        let image = FrameBuffer::from_fn(size, size, |x, _| {
            (2.0 * PI * x as f32 / period as f32).sin()
        })
        .unwrap();
        let flow = run(&image, n, false);
        for (x, y) in interior(size, size, n) {
            let fx = flow.flow_x.at(x, y);
            assert!(
                (fx.abs() - period as f32).abs() <= 1.0,
                "period {period}: flow_x {fx} at {x},{y}"
            );
            assert!(flow.flow_y.at(x, y).abs() <= 1.0);
            assert!(flow.confidence.at(x, y) > 0.99);
        }
    }
}

#[test]
fn affine_intensity_changes_do_not_move_the_peak() {
    let (w, h, n) = (20, 16, 7);
    let image = textured(w, h);
    let scaled = FrameBuffer::from_vec(
        image.as_slice().iter().map(|v| 2.5 * v - 7.0).collect(),
        w,
        h,
    )
    .unwrap();

    let a = run(&image, n, false);
    let b = run(&scaled, n, false);
    let pairs = [
        (&a.flow_x, &b.flow_x),
        (&a.flow_y, &b.flow_y),
        (&a.confidence, &b.confidence),
    ];
    for (lhs, rhs) in pairs {
        for (&u, &v) in lhs.as_slice().iter().zip(rhs.as_slice()) {
            assert!((u - v).abs() <= AFFINE_TOLERANCE, "{u} vs {v}");
        }
    }
}

#[test]
fn large_offsets_keep_texture_and_peaks() {
    let (w, h, n) = (20, 16, 7);
    // Multiples of 1/8 below 8 stay exact in f32 after adding 1e5.
    let image = FrameBuffer::from_fn(w, h, |x, y| {
        ((x * 7919 + y * 104729 + x * y * 31) % 64) as f32 / 8.0
    })
    .unwrap();
    let lifted = FrameBuffer::from_vec(
        image.as_slice().iter().map(|v| v + 1.0e5).collect(),
        w,
        h,
    )
    .unwrap();

    let a = run(&image, n, false);
    let b = run(&lifted, n, false);
    for (x, y) in interior(w, h, n) {
        assert!(b.confidence.at(x, y) < 0.99, "lifted window at {x},{y} is flat");
    }
    let pairs = [
        (&a.flow_x, &b.flow_x),
        (&a.flow_y, &b.flow_y),
        (&a.confidence, &b.confidence),
    ];
    for (lhs, rhs) in pairs {
        for (&u, &v) in lhs.as_slice().iter().zip(rhs.as_slice()) {
            assert!((u - v).abs() <= AFFINE_TOLERANCE, "{u} vs {v}");
        }
    }
}

#[test]
fn non_finite_windows_get_no_estimate() {
    let (w, h, n) = (12, 12, 5);
    let mut image = textured(w, h);
    image.set(6, 6, f32::NAN);
    let flow = run(&image, n, false);
    for (x, y) in interior(w, h, n) {
        let touches_nan = x.abs_diff(6) <= 2 && y.abs_diff(6) <= 2;
        if touches_nan {
            assert_eq!(flow.flow_x.at(x, y), 0.0);
            assert_eq!(flow.flow_y.at(x, y), 0.0);
            assert_eq!(flow.confidence.at(x, y), 0.0);
            for j in 0..n {
                let tile = &flow.surfaces.as_slice()[(y * n + j) * w * n + x * n..][..n];
                assert!(tile.iter().all(|&v| v == 0.0), "tile at {x},{y}");
            }
        } else {
            assert!(flow.confidence.at(x, y).is_finite());
        }
    }
}

#[test]
fn window_of_one_yields_flat_tiles() {
    let flow = run(&textured(6, 5), 1, false);
    assert_eq!(flow.surfaces.as_slice(), &[1.0; 30]);
    assert!(flow.flow_x.as_slice().iter().all(|&v| v == 0.0));
    assert!(flow.confidence.as_slice().iter().all(|&v| v == 1.0));
}
