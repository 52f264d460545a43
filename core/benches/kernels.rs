use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fixnet_core::*;

fn q12_ramp(len: usize, step: i32) -> Vec<i16> {
    (0..len).map(|i| (((i as i32 * step) % 8192) - 4096) as i16).collect()
}

fn schedules() -> [(&'static str, TileSchedule); 3] {
    [("riscy", TileSchedule::riscy()), ("asip", TileSchedule::asip()), ("untiled", TileSchedule::untiled())]
}

fn bench_linear(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear");
    for &(in_len, out_len) in &[(64usize, 32usize), (256, 64), (512, 128)] {
        let weights = q12_ramp(in_len * out_len, 37);
        let bias = q12_ramp(out_len, 11);
        let input = q12_ramp(in_len, 53);
        let mut out = vec![0i16; out_len];
        for (name, schedule) in schedules() {
            let id = BenchmarkId::new(name, format!("{in_len}x{out_len}"));
            group.bench_with_input(id, &schedule, |b, schedule| {
                b.iter(|| {
                    linear(&PulpExt, schedule, &weights, Some(bias.as_slice()), black_box(&input), &mut out)
                        .unwrap();
                });
            });
        }
    }
    group.finish();
}

fn bench_conv2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv2d");
    for &size in &[8usize, 16, 32] {
        let geometry = ConvGeometry { in_channels: 4, out_channels: 8, kernel_size: 3, height: size, width: size };
        let weights = q12_ramp(geometry.weights_len(), 29);
        let bias = q12_ramp(geometry.out_channels, 7);
        let input = q12_ramp(geometry.input_len(), 41);
        let mut out = vec![0i16; geometry.output_len()];
        for (name, schedule) in schedules() {
            group.bench_with_input(BenchmarkId::new(name, size), &schedule, |b, schedule| {
                b.iter(|| {
                    conv2d(&PulpExt, schedule, &geometry, &weights, &bias, black_box(&input), &mut out).unwrap();
                });
            });
        }
    }
    group.finish();
}

fn bench_gate_fusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_fusion");
    for &hidden in &[16usize, 64, 128] {
        let input_size = hidden / 2;
        let w_ih = q12_ramp(hidden * input_size, 13);
        let w_hh = q12_ramp(hidden * hidden, 17);
        let bias = q12_ramp(hidden, 5);
        let x = q12_ramp(input_size, 31);
        let h = q12_ramp(hidden, 23);
        let mut out = vec![0i16; hidden];
        for (name, schedule) in schedules() {
            group.bench_with_input(BenchmarkId::new(name, hidden), &schedule, |b, schedule| {
                b.iter(|| {
                    let first = Projection { weights: &w_ih, bias: &bias, input: black_box(&x) };
                    let second = Projection { weights: &w_hh, bias: &bias, input: &h };
                    gate_fusion(&PulpExt, schedule, first, second, Activation::Sigmoid, &mut out).unwrap();
                });
            });
        }
    }
    group.finish();
}

fn bench_lstm_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("lstm_step");
    for &hidden in &[16usize, 32, 64] {
        let input_size = hidden;
        let w_ih = q12_ramp(4 * hidden * input_size, 19);
        let w_hh = q12_ramp(4 * hidden * hidden, 43);
        let b = q12_ramp(4 * hidden, 3);
        let x = q12_ramp(input_size, 61);
        let mut state = vec![0i16; layers::recurrent::lstm_state_len(hidden)];
        let weights = RecurrentWeights { weight_ih: &w_ih, weight_hh: &w_hh, bias_ih: &b, bias_hh: &b };
        let mut lstm = LstmLayer::new(weights, input_size, hidden, &mut state).unwrap();
        for (name, config) in [("riscy", KernelConfig::riscy()), ("asip", KernelConfig::asip())] {
            group.bench_with_input(BenchmarkId::new(name, hidden), &config, |bench, config| {
                bench.iter(|| {
                    lstm.forward(&PulpExt, config, black_box(&x), 1).unwrap();
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_linear, bench_conv2d, bench_gate_fusion, bench_lstm_step);
criterion_main!(benches);
