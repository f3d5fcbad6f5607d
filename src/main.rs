use std::{path::PathBuf, process};

use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    module::Module,
    optim::AdamConfig,
    record::CompactRecorder,
};
use clap::Parser;
use env_logger::Env;

use crate::{data::DataConfig, error::Error, model::ModelConfig, training::TrainingConfig};

mod data;
mod error;
mod model;
mod split;
mod training;

/// Train a convolutional neural network to recognize traffic signs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory with one numbered subdirectory of images per sign category
    data_dir: PathBuf,

    /// File to save the trained model to
    model_path: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    type Backend = Wgpu<f32, i32>;
    type AutodiffBackend = Autodiff<Backend>;

    let device = WgpuDevice::default();

    let data = DataConfig::new();
    let model = ModelConfig::new(data.category_count, data.image_width, data.image_height);
    let config = TrainingConfig::new(model, AdamConfig::new(), data);

    let (model, evaluation) = training::run::<AutodiffBackend>(&args.data_dir, &config, device)?;
    println!(
        "loss: {:.4} - accuracy: {:.4}",
        evaluation.loss, evaluation.accuracy
    );

    if let Some(path) = args.model_path {
        model
            .save_file(&path, &CompactRecorder::new())
            .map_err(|source| Error::Save {
                path: path.clone(),
                source,
            })?;
        println!("Model saved to {}.", path.display());
    }

    Ok(())
}
