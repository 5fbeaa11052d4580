use std::path::PathBuf;
use style_base::{Tensor, log};
use style_image::{load_rgb, save_png};
use style_infer::backends::OnnxBackend;
use style_infer::{
    Backend, DeviceTarget, InferError, LoadStatus, ModelInfo, ModelSource, StyleConfig,
    benchmark, prepare_session,
};

const OUTPUT_PATH: &str = "output.png";

fn print_model_info(info: &ModelInfo) {
    println!("Model: {}", info.name);
    println!("  inputs:");
    for input in &info.inputs {
        println!("    {input}");
    }
    println!("  outputs:");
    for output in &info.outputs {
        println!("    {output}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    style_base::init_stdout_logger();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <model> <image> <device-priorities>", args[0]);
        eprintln!("  e.g. {} candy.onnx input.jpg TensorRT.0,CUDA.0,CPU", args[0]);
        std::process::exit(1);
    }

    let config = StyleConfig::from_env()?;
    let backend = OnnxBackend::new(config.gpu_ordinals);
    let source = ModelSource::File(PathBuf::from(&args[1]));

    println!("Available devices:");
    for device in backend.available_devices()? {
        println!("  {device}");
    }

    let image = load_rgb(&args[2])?;
    let (height, width, _) = image.hwc()?;
    log::info!("loaded {} ({}x{})", args[2], width, height);

    let target = DeviceTarget::parse(&args[3])?;
    let prepared = prepare_session(
        &backend,
        &source,
        &target,
        width,
        height,
        &config.compile_options(),
        config.normalization,
    )?;
    print_model_info(&prepared.info);
    if let LoadStatus::Degraded { reason } = &prepared.status {
        println!("Running at the model's native size: {reason}");
    }
    let mut session = prepared.session;
    println!("Height: {}", session.height());
    println!("Width: {}", session.width());

    // no resizing here, the model has to accept the image as is
    if (session.width(), session.height()) != (width, height) {
        return Err(InferError::ShapeMismatch {
            expected: format!("{width}x{height}"),
            got: format!("{}x{}", session.width(), session.height()),
        }
        .into());
    }

    let report = benchmark(
        &mut session,
        &image.data,
        config.benchmark_iterations,
        |timing| {
            println!(
                "Inference time: {:.3}ms ({:.2}fps)",
                timing.millis(),
                timing.fps()
            )
        },
    )?;
    log::debug!("mean inference time {:?}", report.mean());

    save_png(OUTPUT_PATH, &Tensor::new(vec![height, width, 3], report.output)?)?;
    println!("End");
    Ok(())
}
