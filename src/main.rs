//! gridconv CLI - Convolve images, draw the Taylor circle, probe GPU devices.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::de::DeserializeOwned;

use gridconv::{
    compute::{ConvolutionStrategy, Kernel, Strategy, circle_points, gpu::GpuContext, to_display},
    raster::{load_grayscale, rasterize_points, save_grayscale},
    schema::{CircleConfig, ConvolutionConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("convolve") if args.len() >= 5 => run_convolve(&args[2], &args[3], &args[4]),
        Some("circle") if args.len() >= 3 => run_circle(&args[2], args.get(3)),
        Some("devices") => run_devices(),
        Some("--example") => print_example_config(),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} convolve <config.json> <input> <output>", program);
    eprintln!("  {} circle <output> [circle.json]", program);
    eprintln!("  {} devices", program);
    eprintln!("  {} --example", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  convolve   Convolve a grayscale image and save the result");
    eprintln!("  circle     Plot a circle using Taylor-series sin/cos");
    eprintln!("  devices    Initialize the GPU and print the selected adapter");
    eprintln!("  --example  Print example configuration files");
}

fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

fn run_convolve(config_path: &str, input_path: &str, output_path: &str) {
    let config: ConvolutionConfig = load_json(Path::new(config_path));
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let kernel = Kernel::from_config(&config.kernel).unwrap_or_else(|e| {
        eprintln!("Invalid kernel: {}", e);
        std::process::exit(1);
    });

    let input = load_grayscale(input_path).unwrap_or_else(|e| {
        eprintln!("Error: could not load image from {}: {}", input_path, e);
        std::process::exit(1);
    });

    let strategy = Strategy::from_config(&config.strategy).unwrap_or_else(|e| {
        eprintln!("Error initializing {:?} strategy: {}", config.strategy, e);
        std::process::exit(1);
    });

    println!("gridconv Convolution");
    println!("====================");
    println!("Image: {}x{}", input.width(), input.height());
    println!("Kernel: {}x{}", kernel.size(), kernel.size());
    println!("Strategy: {}", strategy.name());
    if let Strategy::Gpu(gpu) = &strategy {
        println!("Adapter: {}", gpu.context().describe());
    }
    println!();

    let start = Instant::now();
    let output = strategy.convolve(&input, &kernel).unwrap_or_else(|e| {
        eprintln!("Convolution failed: {}", e);
        std::process::exit(1);
    });
    let elapsed = start.elapsed();

    let (min, max) = output.value_range();
    println!("Response range: [{:.3}, {:.3}]", min, max);

    let display = to_display(&output, config.normalize);
    if let Err(e) = save_grayscale(&display, output_path) {
        eprintln!("Error saving {}: {}", output_path, e);
        std::process::exit(1);
    }

    println!("Convolution completed. Output saved at: {}", output_path);
    println!("Execution time: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
}

fn run_circle(output_path: &str, config_path: Option<&String>) {
    let config: CircleConfig = match config_path {
        Some(path) => load_json(Path::new(path)),
        None => CircleConfig::default(),
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let start = Instant::now();
    let sample = circle_points(&config);
    let elapsed = start.elapsed();

    let (canvas, plotted) =
        rasterize_points(&sample.points, config.width, config.height).unwrap_or_else(|e| {
            eprintln!("Error creating canvas: {}", e);
            std::process::exit(1);
        });

    if let Err(e) = save_grayscale(&canvas, output_path) {
        eprintln!("Error saving {}: {}", output_path, e);
        std::process::exit(1);
    }

    println!(
        "Final Taylor series Result = sin(t) = {:.5}, cos(t) = {:.5}",
        sample.sin_sum, sample.cos_sum
    );
    println!(
        "Plotted {}/{} points to {}",
        plotted,
        sample.points.len(),
        output_path
    );
    println!("Total Execution Time = {:.6} seconds", elapsed.as_secs_f64());
}

fn run_devices() {
    match pollster::block_on(GpuContext::new()) {
        Ok(context) => {
            println!("GPU platform and device initialized successfully!");
            println!("  Adapter: {}", context.describe());
        }
        Err(e) => {
            eprintln!("GPU initialization failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_example_config() {
    let config = ConvolutionConfig::default();
    let circle = CircleConfig::default();

    println!("Example convolution configuration (config.json):");
    println!("{}", to_pretty_json(&config));
    println!();
    println!("Example circle configuration (circle.json):");
    println!("{}", to_pretty_json(&circle));
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing example: {}", e);
        std::process::exit(1);
    })
}
