//! Kernel-level integration tests: numeric model, tile scheduler, activation
//! tables, Linear / Conv2D / gate fusion against straightforward references.

use approx::assert_abs_diff_eq;
use fixnet_core::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_q12(rng: &mut StdRng, len: usize, limit: i16) -> Vec<i16> {
    (0..len).map(|_| rng.gen_range(-limit..=limit)).collect()
}

// =============================================================================
// Numeric model
// =============================================================================

#[test]
fn test_q12_round_trip_over_range() {
    for i in -4096..4096 {
        let x = i as f32 / 1024.0 + 0.000_1;
        let back = fixed::to_f32(fixed::from_f32(x));
        assert!((x - back).abs() <= 1.0 / 4096.0, "x = {x}, back = {back}");
    }
}

#[test]
fn test_q12_constants() {
    assert_eq!(ONE, 4096);
    assert_eq!(FRAC_BITS, 12);
    assert_eq!(fixed::from_f32(-4.0), -16384);
    assert_eq!(fixed::to_f32(-16384), -4.0);
}

// =============================================================================
// Linear kernel
// =============================================================================

#[test]
fn test_linear_identity_rows() {
    let weights: [i16; 8] = [ONE, 0, 0, 0, 0, ONE, 0, 0];
    let bias = [0i16; 2];
    let input = Tensor::<i16, 4>::from_f32(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    let mut out = [0i16; 2];

    linear(&Portable, &TileSchedule::riscy(), &weights, Some(&bias[..]), input.as_slice(), &mut out).unwrap();

    assert_eq!(out, [4096, 8192]);
    assert_eq!(fixed::to_f32(out[0]), 1.0);
    assert_eq!(fixed::to_f32(out[1]), 2.0);
}

#[test]
fn test_linear_bias_only() {
    let weights = [0i16; 12];
    let bias = [fixed::from_f32(0.5), fixed::from_f32(-0.5)];
    let input = [1234i16, -32768, 32767, 7, -1, 0];
    for schedule in [TileSchedule::riscy(), TileSchedule::asip(), TileSchedule::untiled()] {
        let mut out = [99i16; 2];
        linear(&Portable, &schedule, &weights, Some(&bias[..]), &input, &mut out).unwrap();
        assert_eq!(out, bias);
    }
}

#[test]
fn test_linear_float_build() {
    let weights = [1.0f32, 0.5, -0.25, 2.0];
    let bias = [0.1f32, -0.1];
    let mut out = [0.0f32; 2];
    linear(&Portable, &TileSchedule::asip(), &weights, Some(&bias[..]), &[2.0, 4.0], &mut out).unwrap();
    assert_abs_diff_eq!(out[0], 0.1 + 2.0 + 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[1], -0.1 - 0.5 + 8.0, epsilon = 1e-6);
}

#[test]
fn test_linear_matches_untiled_reference_for_any_schedule() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let schedules = [
        TileSchedule::riscy(),
        TileSchedule::asip(),
        TileSchedule::new(&[16, 10, 3, 1]).unwrap(),
        TileSchedule::new(&[5, 1]).unwrap(),
    ];

    for _ in 0..50 {
        let in_len = rng.gen_range(1..40);
        let out_len = rng.gen_range(1..48);
        let weights = random_q12(&mut rng, in_len * out_len, 4096);
        let bias = random_q12(&mut rng, out_len, 4096);
        let input = random_q12(&mut rng, in_len, 4096);

        let mut reference = vec![0i16; out_len];
        for (o, r) in reference.iter_mut().enumerate() {
            let mut acc = (bias[o] as i32) << 12;
            for i in 0..in_len {
                acc += weights[o * in_len + i] as i32 * input[i] as i32;
            }
            *r = (acc >> 12) as i16;
        }

        for schedule in &schedules {
            let mut out = vec![0i16; out_len];
            linear(&Portable, schedule, &weights, Some(&bias[..]), &input, &mut out).unwrap();
            assert_eq!(out, reference, "schedule {:?}, {in_len}x{out_len}", schedule.widths());

            let mut hw = vec![0i16; out_len];
            linear(&PulpExt, schedule, &weights, Some(&bias[..]), &input, &mut hw).unwrap();
            assert_eq!(hw, reference);
        }
    }
}

// =============================================================================
// Tile scheduler
// =============================================================================

#[test]
fn test_tile_passes_cover_every_channel_once() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..300 {
        let mut widths: Vec<usize> = (2..=16).filter(|_| rng.gen_bool(0.3)).collect();
        widths.truncate(7);
        widths.reverse();
        widths.push(1);
        let schedule = TileSchedule::new(&widths).unwrap();

        let n = rng.gen_range(1..500);
        let mut hits = vec![0u32; n];
        let mut total = 0;
        for pass in schedule.passes(n) {
            assert!(widths.contains(&pass.width));
            assert!(pass.tiles > 0);
            for first in pass.tile_starts() {
                for c in first..first + pass.width {
                    hits[c] += 1;
                }
            }
            total += pass.channels();
        }
        assert_eq!(total, n);
        assert!(hits.iter().all(|&h| h == 1), "widths {widths:?}, n = {n}");
    }
}

#[test]
fn test_tile_passes_are_greedy() {
    let passes: Vec<TilePass> = TileSchedule::new(&[8, 4, 2, 1]).unwrap().passes(15).collect();
    let shape: Vec<(usize, usize)> = passes.iter().map(|p| (p.width, p.tiles)).collect();
    assert_eq!(shape, [(8, 1), (4, 1), (2, 1), (1, 1)]);
}

// =============================================================================
// Activation approximator
// =============================================================================

#[test]
fn test_tanh_table_boundaries() {
    // The complement mirror puts tanh(0) four LSBs above zero.
    assert_eq!(tanh_q12(0), 4);
    assert_eq!(tanh_q12(16384), ONE);
    assert_eq!(tanh_q12(i16::MAX), ONE);
    assert_eq!(tanh_q12(-16384), -ONE);
    assert_eq!(tanh_q12(i16::MIN), -ONE);
    assert_eq!(tanh_q12(16383), 4092);
}

#[test]
fn test_sigmoid_table_boundaries() {
    assert_eq!(sigmoid_q12(0), 2048);
    assert_eq!(fixed::to_f32(sigmoid_q12(0)), 0.5);
    assert_eq!(sigmoid_q12(16384), ONE);
    assert_eq!(sigmoid_q12(-16384), 0);
}

#[test]
fn test_sigmoid_monotonic_across_table() {
    let mut prev = sigmoid_q12(i16::MIN);
    for k in -17i32..17 {
        let x = (k * 1024 + 512) as i16;
        let y = sigmoid_q12(x);
        assert!(y >= prev, "sigmoid dropped at bucket midpoint {x}");
        prev = y;
    }

    let mut prev = sigmoid_q12(-20000);
    for x in (-20000i16..=20000).step_by(64) {
        let y = sigmoid_q12(x);
        assert!(y >= prev, "sigmoid dropped at {x}");
        prev = y;
    }
}

#[test]
fn test_tanh_monotonic_at_bucket_midpoints() {
    let mut prev = tanh_q12(i16::MIN);
    for k in -17i32..17 {
        let y = tanh_q12((k * 1024 + 512) as i16);
        assert!(y >= prev);
        prev = y;
    }
}

#[test]
fn test_float_activations_are_exact() {
    let mut x = [0.0f32, 100.0, -100.0];
    tanh_tensor(&Portable, &mut x);
    assert_abs_diff_eq!(x[0], 0.0);
    assert_abs_diff_eq!(x[1], 1.0);
    assert_abs_diff_eq!(x[2], -1.0);

    let mut y = [0.0f32];
    sigmoid_tensor(&Portable, &mut y);
    assert_abs_diff_eq!(y[0], 0.5);
}

// =============================================================================
// Conv2D kernel
// =============================================================================

/// Straight clamped-window convolution, one channel and pixel at a time.
fn conv_reference(g: &ConvGeometry, weights: &[i16], bias: &[i16], input: &[i16]) -> Vec<i16> {
    let half = (g.kernel_size / 2) as isize;
    let (h_len, w_len) = (g.height as isize, g.width as isize);
    let mut out = vec![0i16; g.output_len()];
    for co in 0..g.out_channels {
        for h in 0..h_len {
            for w in 0..w_len {
                let mut acc = (bias[co] as i32) << 12;
                for kh in -half..=half {
                    for kw in -half..=half {
                        let (r, c) = (h + kh, w + kw);
                        if r < 0 || r >= h_len || c < 0 || c >= w_len {
                            continue;
                        }
                        for ci in 0..g.in_channels {
                            let x = input[((r * w_len + c) as usize) * g.in_channels + ci];
                            let tap = ((kh + half) as usize * g.kernel_size + (kw + half) as usize) * g.in_channels;
                            let wt = weights[co * g.filter_len() + tap + ci];
                            acc += x as i32 * wt as i32;
                        }
                    }
                }
                out[co * g.height * g.width + (h * w_len + w) as usize] = (acc >> 12) as i16;
            }
        }
    }
    out
}

#[test]
fn test_conv_3x3_on_single_pixel_uses_center_tap_only() {
    let g = ConvGeometry { in_channels: 2, out_channels: 3, kernel_size: 3, height: 1, width: 1 };
    // Off-center taps are large so any contribution would show.
    let mut weights = vec![30000i16; g.weights_len()];
    let center = 4 * g.in_channels;
    let centers: [[i16; 2]; 3] = [[ONE, 0], [2048, -2048], [-ONE, 1024]];
    for (co, c) in centers.iter().enumerate() {
        weights[co * g.filter_len() + center] = c[0];
        weights[co * g.filter_len() + center + 1] = c[1];
    }
    let bias = [100i16, -200, 300];
    let input = [fixed::from_f32(0.5), fixed::from_f32(1.0)];

    let mut out = [0i16; 3];
    conv2d(&Portable, &TileSchedule::riscy(), &g, &weights, &bias, &input, &mut out).unwrap();

    for co in 0..3 {
        let acc = ((bias[co] as i32) << 12) + centers[co][0] as i32 * input[0] as i32 + centers[co][1] as i32 * input[1] as i32;
        assert_eq!(out[co] as i32, acc >> 12, "channel {co}");
    }
    assert_eq!(out, [100 + 2048, -200 + 1024 - 2048, 300 - 2048 + 1024]);
}

#[test]
fn test_conv_matches_reference_with_borders() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(cin, cout, k, h, w) in &[(1, 1, 3, 4, 4), (3, 5, 3, 5, 7), (2, 17, 5, 6, 3), (4, 2, 1, 3, 3), (1, 3, 7, 2, 2)] {
        let g = ConvGeometry { in_channels: cin, out_channels: cout, kernel_size: k, height: h, width: w };
        let weights = random_q12(&mut rng, g.weights_len(), 2048);
        let bias = random_q12(&mut rng, cout, 4096);
        let input = random_q12(&mut rng, g.input_len(), 4096);
        let reference = conv_reference(&g, &weights, &bias, &input);

        for schedule in [TileSchedule::riscy(), TileSchedule::asip(), TileSchedule::untiled()] {
            let mut out = vec![0i16; g.output_len()];
            conv2d(&Portable, &schedule, &g, &weights, &bias, &input, &mut out).unwrap();
            assert_eq!(out, reference, "geometry {g:?}");
        }
    }
}

#[test]
fn test_conv_output_is_channel_planar() {
    // 1x1 kernel, two input channels interleaved per pixel, two output planes.
    let g = ConvGeometry { in_channels: 2, out_channels: 2, kernel_size: 1, height: 1, width: 3 };
    let weights = [ONE, 0, 0, ONE];
    let input = [1, 10, 2, 20, 3, 30].map(|v: i16| v * 16);
    let mut out = [0i16; 6];
    conv2d(&Portable, &TileSchedule::riscy(), &g, &weights, &[0, 0], &input, &mut out).unwrap();
    assert_eq!(out, [16, 32, 48, 160, 320, 480]);
}

#[test]
fn test_conv_rejects_bad_lengths() {
    let g = ConvGeometry { in_channels: 1, out_channels: 2, kernel_size: 3, height: 2, width: 2 };
    let mut out = [0i16; 8];
    let err = conv2d(&Portable, &TileSchedule::riscy(), &g, &[0; 17], &[0; 2], &[0; 4], &mut out);
    assert_eq!(err, Err(KernelError::ShapeMismatch { tensor: "conv2d weights", expected: 18, actual: 17 }));
    let err = conv2d(&Portable, &TileSchedule::riscy(), &g, &[0; 18], &[0; 2], &[0; 5], &mut out);
    assert_eq!(err, Err(KernelError::ShapeMismatch { tensor: "conv2d input", expected: 4, actual: 5 }));
}

// =============================================================================
// Gate fusion
// =============================================================================

#[test]
fn test_gate_fusion_matches_single_accumulation() {
    let mut rng = StdRng::seed_from_u64(99);
    let (in1, in2, out_len) = (13, 6, 11);
    let w1 = random_q12(&mut rng, in1 * out_len, 3000);
    let w2 = random_q12(&mut rng, in2 * out_len, 3000);
    let b1 = random_q12(&mut rng, out_len, 3000);
    let b2 = random_q12(&mut rng, out_len, 3000);
    let x1 = random_q12(&mut rng, in1, 3000);
    let x2 = random_q12(&mut rng, in2, 3000);

    for activation in [Activation::Identity, Activation::Tanh, Activation::Sigmoid] {
        let mut out = vec![0i16; out_len];
        gate_fusion(
            &Portable,
            &TileSchedule::asip(),
            Projection { weights: &w1, bias: &b1, input: &x1 },
            Projection { weights: &w2, bias: &b2, input: &x2 },
            activation,
            &mut out,
        )
        .unwrap();

        for o in 0..out_len {
            let mut acc = (b1[o] as i32 + b2[o] as i32) << 12;
            acc += (0..in1).map(|i| w1[o * in1 + i] as i32 * x1[i] as i32).sum::<i32>();
            acc += (0..in2).map(|i| w2[o * in2 + i] as i32 * x2[i] as i32).sum::<i32>();
            let expected = LutActivate::<i16>::apply(&Portable, activation, (acc >> 12) as i16);
            assert_eq!(out[o], expected, "{} channel {o}", activation.name());
        }
    }
}
