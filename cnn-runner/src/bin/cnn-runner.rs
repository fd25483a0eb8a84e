//! Host driver for the streaming kernels.
//!
//! Usage:
//!   cnn-runner gen -c 8 -k 3 --img 32 --data ./data
//!   cnn-runner run -c 8 -k 3 --img 32 --data ./data
//!   cnn-runner vadd --len 8192
//!   cnn-runner knn --synth

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use cnn_runner::{data, gen, verify, Error};
use cnn_stream::knn::IMAGE_BYTES;
use cnn_stream::stream::DEFAULT_DEPTH;
use cnn_stream::{naive, CnnPipeline, Geometry};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(|s| s.as_str()) {
        Some("run") => cmd_run(&args[1..]),
        Some("gen") => cmd_gen(&args[1..]),
        Some("vadd") => cmd_vadd(&args[1..]),
        Some("knn") => cmd_knn(&args[1..]),
        Some("--help") | Some("-h") | None => print_usage(),
        Some(other) => {
            eprintln!("error: unknown subcommand '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("cnn-runner - streaming kernel driver");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cnn-runner run [--data <dir>] [-c <n>] [-k <n>] [--img <n>] [--depth <n>]");
    eprintln!("  cnn-runner gen [--data <dir>] [-c <n>] [-k <n>] [--img <n>]");
    eprintln!("  cnn-runner vadd [--len <n>] [--depth <n>]");
    eprintln!("  cnn-runner knn [--synth] [--train-num <n>] [--test-num <n>]");
    eprintln!();
    eprintln!("Subcommands:");
    eprintln!("  run    Stream a convolution layer and verify it against a reference");
    eprintln!("  gen    Write a synthetic dataset plus its reference output");
    eprintln!("  vadd   Stream a vector add as a smoke test");
    eprintln!("  knn    Stream 1-NN classification over byte images");
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn cmd_run(args: &[String]) {
    let mut data_dir = PathBuf::from("./data");
    let mut channels: usize = 256;
    let mut kernel: usize = 5;
    let mut image: usize = 224;
    let mut depth: usize = DEFAULT_DEPTH;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                i += 1;
                data_dir = PathBuf::from(args.get(i).unwrap_or_else(|| {
                    eprintln!("--data requires a directory path");
                    process::exit(1);
                }));
            }
            "-c" | "--channels" => {
                i += 1;
                channels = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("-c requires a channel count");
                    process::exit(1);
                });
            }
            "-k" | "--kernel" => {
                i += 1;
                kernel = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("-k requires a kernel size");
                    process::exit(1);
                });
            }
            "--img" | "--image" => {
                i += 1;
                image = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--img requires an image size");
                    process::exit(1);
                });
            }
            "--depth" => {
                i += 1;
                depth = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--depth requires a chunk count");
                    process::exit(1);
                });
            }
            "--help" | "-h" => {
                eprintln!("Usage: cnn-runner run [OPTIONS]");
                eprintln!();
                eprintln!("Stream a convolution layer and verify it against a reference.");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --data <DIR>        Dataset directory (default: ./data)");
                eprintln!("  -c, --channels <N>  Channel count (default: 256)");
                eprintln!("  -k, --kernel <N>    Kernel size (default: 5)");
                eprintln!("  --img <N>           Convolution image size (default: 224)");
                eprintln!("  --depth <N>         FIFO depth in chunks (default: 4)");
                eprintln!();
                eprintln!("Reads input.bin, weight.bin, and bias.bin from the dataset");
                eprintln!("directory; write them first with `cnn-runner gen`. The result");
                eprintln!("is checked against the sequential kernel, and also against");
                eprintln!("output.bin when the directory holds one.");
                eprintln!();
                eprintln!("Environment:");
                eprintln!("  RUST_LOG=warn    Show the first mismatching cell");
                eprintln!("  RUST_LOG=debug   Show per-run pipeline geometry");
                process::exit(0);
            }
            other => {
                eprintln!("unexpected argument: {other}");
                eprintln!("       cnn-runner run --help for usage");
                process::exit(1);
            }
        }
        i += 1;
    }

    let geom = Geometry::new(channels, kernel, image).unwrap_or_else(|e| fail(e));

    eprintln!("==> Loading data from {}", data_dir.display());
    let tensors = data::load_tensors(&data_dir, &geom).unwrap_or_else(|e| fail(e));
    let reference = data::load_reference(&data_dir, &geom).unwrap_or_else(|e| fail(e));

    eprintln!("==> Running sequential reference");
    let mut seq_out = vec![0.0f32; geom.output_len()];
    let start = Instant::now();
    naive::conv_layer(
        &geom,
        &tensors.input,
        &tensors.weight,
        &tensors.bias,
        &mut seq_out,
    );
    let seq_us = start.elapsed().as_micros();

    eprintln!("==> Running streaming pipeline");
    let mut out = vec![0.0f32; geom.output_len()];
    let mut pipeline = CnnPipeline::with_depth(depth);
    let start = Instant::now();
    pipeline
        .run(&geom, &tensors.input, &tensors.weight, &tensors.bias, &mut out)
        .unwrap_or_else(|e| fail(e));
    let run_us = start.elapsed().as_micros();

    eprintln!(
        "Sequential: {:.3}s ({:.3} GFlops)",
        seq_us as f64 / 1e6,
        gflops(&geom, seq_us)
    );
    eprintln!(
        "Streamed:   {:.3}s ({:.3} GFlops)",
        run_us as f64 / 1e6,
        gflops(&geom, run_us)
    );

    let seq_report = verify::compare_output(&out, &seq_out, &geom);
    let mut pass = seq_report.passed();
    if !pass {
        eprintln!(
            "FAIL ({} cells differ from the sequential reference)",
            seq_report.mismatches
        );
    }
    if let Some(want) = &reference {
        let file_report = verify::compare_output(&out, want, &geom);
        if !file_report.passed() {
            eprintln!("FAIL ({} cells differ from output.bin)", file_report.mismatches);
            pass = false;
        }
    }
    if !pass {
        process::exit(1);
    }
    eprintln!("PASS");
}

// ---------------------------------------------------------------------------
// gen
// ---------------------------------------------------------------------------

fn cmd_gen(args: &[String]) {
    let mut data_dir = PathBuf::from("./data");
    let mut channels: usize = 256;
    let mut kernel: usize = 5;
    let mut image: usize = 224;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                i += 1;
                data_dir = PathBuf::from(args.get(i).unwrap_or_else(|| {
                    eprintln!("--data requires a directory path");
                    process::exit(1);
                }));
            }
            "-c" | "--channels" => {
                i += 1;
                channels = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("-c requires a channel count");
                    process::exit(1);
                });
            }
            "-k" | "--kernel" => {
                i += 1;
                kernel = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("-k requires a kernel size");
                    process::exit(1);
                });
            }
            "--img" | "--image" => {
                i += 1;
                image = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--img requires an image size");
                    process::exit(1);
                });
            }
            "--help" | "-h" => {
                eprintln!("Usage: cnn-runner gen [OPTIONS]");
                eprintln!();
                eprintln!("Write input.bin, weight.bin, bias.bin, and the sequential");
                eprintln!("reference output.bin for the given geometry.");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --data <DIR>        Output directory (default: ./data)");
                eprintln!("  -c, --channels <N>  Channel count (default: 256)");
                eprintln!("  -k, --kernel <N>    Kernel size (default: 5)");
                eprintln!("  --img <N>           Convolution image size (default: 224)");
                process::exit(0);
            }
            other => {
                eprintln!("unexpected argument: {other}");
                eprintln!("       cnn-runner gen --help for usage");
                process::exit(1);
            }
        }
        i += 1;
    }

    let geom = Geometry::new(channels, kernel, image).unwrap_or_else(|e| fail(e));

    eprintln!(
        "==> Generating {channels}x{image}x{image} dataset (kernel {kernel}) under {}",
        data_dir.display()
    );
    gen::generate(&data_dir, &geom).unwrap_or_else(|e| fail(e));
    eprintln!("==> Done");
}

// ---------------------------------------------------------------------------
// vadd
// ---------------------------------------------------------------------------

fn cmd_vadd(args: &[String]) {
    use cnn_stream::vadd::run_vadd_with_depth;

    let mut len: usize = 8192;
    let mut depth: usize = DEFAULT_DEPTH;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--len" => {
                i += 1;
                len = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--len requires an element count");
                    process::exit(1);
                });
            }
            "--depth" => {
                i += 1;
                depth = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--depth requires a chunk count");
                    process::exit(1);
                });
            }
            "--help" | "-h" => {
                eprintln!("Usage: cnn-runner vadd [OPTIONS]");
                eprintln!();
                eprintln!("Stream an element-wise vector add and check the result.");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --len <N>    Vector length (default: 8192)");
                eprintln!("  --depth <N>  FIFO depth in chunks (default: 4)");
                process::exit(0);
            }
            other => {
                eprintln!("unexpected argument: {other}");
                eprintln!("       cnn-runner vadd --help for usage");
                process::exit(1);
            }
        }
        i += 1;
    }

    let a: Vec<f32> = (0..len).map(|i| i as f32).collect();
    let b: Vec<f32> = (0..len).map(|i| (2 * i) as f32).collect();

    let mut want = vec![0.0f32; len];
    naive::vadd(&a, &b, &mut want);

    eprintln!("==> Streaming {len}-element vector add");
    let mut out = vec![0.0f32; len];
    run_vadd_with_depth(&a, &b, &mut out, depth).unwrap_or_else(|e| fail(e));

    let report = verify::compare_vectors(&out, &want);
    if report.passed() {
        eprintln!("PASS");
    } else {
        eprintln!("FAIL ({} mismatches)", report.mismatches);
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// knn
// ---------------------------------------------------------------------------

fn cmd_knn(args: &[String]) {
    use cnn_stream::knn::{run_knn, NUM_CLASSES};

    let mut data_dir = PathBuf::from("./cifar-10");
    let mut train_num: usize = 32;
    let mut test_num: usize = 32;
    let mut synth = false;
    let mut depth: usize = DEFAULT_DEPTH;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                i += 1;
                data_dir = PathBuf::from(args.get(i).unwrap_or_else(|| {
                    eprintln!("--data requires a directory path");
                    process::exit(1);
                }));
            }
            "--train-num" => {
                i += 1;
                train_num = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--train-num requires an image count");
                    process::exit(1);
                });
            }
            "--test-num" => {
                i += 1;
                test_num = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--test-num requires an image count");
                    process::exit(1);
                });
            }
            "--synth" => synth = true,
            "--depth" => {
                i += 1;
                depth = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--depth requires a chunk count");
                    process::exit(1);
                });
            }
            "--help" | "-h" => {
                eprintln!("Usage: cnn-runner knn [OPTIONS]");
                eprintln!();
                eprintln!("Stream 1-NN classification over flat byte images and compare");
                eprintln!("the predictions with the sequential classifier.");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --data <DIR>     Image directory (default: ./cifar-10)");
                eprintln!("  --train-num <N>  Training images per class (default: 32)");
                eprintln!("  --test-num <N>   Test images (default: 32)");
                eprintln!("  --synth          Use a generated dataset instead of files");
                eprintln!("  --depth <N>      FIFO depth in chunks (default: 4)");
                eprintln!();
                eprintln!("The image directory holds train_image_<class>.bin for classes");
                eprintln!("0 through 9 plus test_image.bin and test_label.bin.");
                process::exit(0);
            }
            other => {
                eprintln!("unexpected argument: {other}");
                eprintln!("       cnn-runner knn --help for usage");
                process::exit(1);
            }
        }
        i += 1;
    }

    let (train, test, truth) = if synth {
        eprintln!("==> Generating synthetic dataset");
        let dataset = gen::synth_knn(train_num, test_num);
        (dataset.train, dataset.test, dataset.labels)
    } else {
        eprintln!("==> Loading images from {}", data_dir.display());
        let mut train = Vec::with_capacity(NUM_CLASSES);
        for class in 0..NUM_CLASSES {
            let path = data_dir.join(data::train_image_file(class));
            let buf = data::load_u8(&path).unwrap_or_else(|e| fail(e));
            train.push(take_images(buf, train_num, &path));
        }

        let test_path = data_dir.join(data::TEST_IMAGE_FILE);
        let test_buf = data::load_u8(&test_path).unwrap_or_else(|e| fail(e));
        let test = take_images(test_buf, test_num, &test_path);

        let label_path = data_dir.join(data::TEST_LABEL_FILE);
        let mut labels = data::load_u8(&label_path).unwrap_or_else(|e| fail(e));
        if labels.len() < test_num {
            fail(Error::Incomplete {
                path: label_path,
                expected: test_num,
                actual: labels.len(),
            });
        }
        labels.truncate(test_num);
        (train, test, labels)
    };

    eprintln!(
        "==> Classifying {test_num} images against {} training images",
        train_num * NUM_CLASSES
    );

    let start = Instant::now();
    let baseline = naive::knn_classify(&train, &test, IMAGE_BYTES, train_num, test_num);
    let seq_us = start.elapsed().as_micros();

    let start = Instant::now();
    let streamed = run_knn(&train, &test, test_num, train_num, depth).unwrap_or_else(|e| fail(e));
    let run_us = start.elapsed().as_micros();

    eprintln!("Sequential: {:.3}s", seq_us as f64 / 1e6);
    eprintln!("Streamed:   {:.3}s", run_us as f64 / 1e6);

    if streamed != baseline {
        let diff = (0..test_num).filter(|&t| streamed[t] != baseline[t]).count();
        eprintln!("FAIL ({diff} predictions differ from the sequential classifier)");
        process::exit(1);
    }

    let acc = verify::label_accuracy(&streamed, &truth);
    eprintln!("Correct: {} out of {}", acc.correct, acc.total);
    eprintln!("Accuracy: {}%", acc.percent());
    eprintln!("PASS");
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("error: {err}");
    process::exit(1);
}

fn gflops(geom: &Geometry, us: u128) -> f64 {
    (2 * geom.mac_count()) as f64 / (us as f64 * 1e3)
}

/// Trims a raw image buffer to exactly `count` images, failing when the
/// file holds fewer.
fn take_images(mut buf: Vec<u8>, count: usize, path: &Path) -> Vec<u8> {
    let need = count * IMAGE_BYTES;
    if buf.len() < need {
        fail(Error::Incomplete {
            path: path.to_path_buf(),
            expected: need,
            actual: buf.len(),
        });
    }
    buf.truncate(need);
    buf
}
