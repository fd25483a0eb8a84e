use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use cnn_stream::{naive, CnnPipeline, Geometry};

fn synth(len: usize, scale: f32) -> Vec<f32> {
    (0..len).map(|i| ((i % 17) as f32) * scale - 0.8).collect()
}

fn bench_conv_layer(c: &mut Criterion) {
    let geom = Geometry::new(8, 3, 32).unwrap();
    let input = synth(geom.input_len(), 0.1);
    let weight = synth(geom.weight_len(), 0.05);
    let bias = synth(geom.bias_len(), 0.3);

    let mut group = c.benchmark_group("conv_layer");
    group.throughput(Throughput::Elements(geom.mac_count()));

    group.bench_function("naive", |b| {
        let mut output = vec![0.0; geom.output_len()];
        b.iter(|| naive::conv_layer(&geom, &input, &weight, &bias, &mut output));
    });

    group.bench_function("pipeline", |b| {
        let mut pipe = CnnPipeline::new();
        let mut output = vec![0.0; geom.output_len()];
        b.iter(|| {
            pipe.run(&geom, &input, &weight, &bias, &mut output)
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_conv_layer);
criterion_main!(benches);
