use std::{path::Path, sync::Arc};

use burn::{
    config::Config,
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use log::info;

use crate::{
    data::{load_data, DataConfig, SignBatch, SignBatcher},
    error::Error,
    model::{Model, ModelConfig},
    split::{one_hot_encode, train_test_split},
};

#[derive(Config)]
pub struct TrainingConfig {
    pub model: ModelConfig,

    pub optimizer: AdamConfig,

    pub data: DataConfig,

    #[config(default = 10)]
    pub epoch_count: usize,

    #[config(default = 32)]
    pub batch_size: usize,

    #[config(default = 0.4)]
    pub test_fraction: f64,

    #[config(default = 1.0e-3)]
    pub learning_rate: f64,

    #[config(default = 4)]
    pub worker_count: usize,

    /// Seeds the backend, the split, and the dataloader shuffle. Unseeded
    /// runs partition and shuffle independently per invocation.
    pub seed: Option<u64>,
}

/// Loss and accuracy over the held-out subset.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Runs the whole pipeline on the images under `data_dir`: load, one-hot
/// encode, split, fit for the configured number of epochs, and evaluate on
/// the held-out subset. Returns the trained model along with the evaluation.
pub fn run<B: AutodiffBackend>(
    data_dir: &Path,
    config: &TrainingConfig,
    device: B::Device,
) -> Result<(Model<B>, Evaluation), Error> {
    if let Some(seed) = config.seed {
        B::seed(seed);
    }

    let (images, categories) = load_data(data_dir, &config.data)?;
    info!("loaded {} images from {}", images.len(), data_dir.display());

    let labels = one_hot_encode(&categories, config.data.category_count);
    let (train_dataset, test_dataset) =
        train_test_split(images, labels, config.test_fraction, config.seed)?;
    info!(
        "split into {} training and {} evaluation samples",
        train_dataset.len(),
        test_dataset.len()
    );

    let dataloader_train = DataLoaderBuilder::new(SignBatcher::<B>::new(device.clone(), &config.data))
        .batch_size(config.batch_size)
        .shuffle(config.seed.unwrap_or_else(rand::random))
        .num_workers(config.worker_count)
        .build(train_dataset);

    let dataloader_test = DataLoaderBuilder::new(SignBatcher::<B::InnerBackend>::new(
        device.clone(),
        &config.data,
    ))
    .batch_size(config.batch_size)
    .num_workers(config.worker_count)
    .build(test_dataset);

    let mut model = config.model.init::<B>(&device);
    let mut optim = config.optimizer.init();

    for epoch in 1..=config.epoch_count {
        let mut epoch_loss = 0.0;
        let mut correct = 0;
        let mut seen = 0;

        for batch in dataloader_train.iter() {
            let batch_size = batch.targets.dims()[0];
            let output = model.forward_classification(batch.images, batch.targets);

            epoch_loss += output.loss.clone().into_scalar().elem::<f32>() * batch_size as f32;
            correct += count_correct(&output.output, &output.targets);
            seen += batch_size;

            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        info!(
            "epoch {epoch}/{} - loss: {:.4} - accuracy: {:.4}",
            config.epoch_count,
            epoch_loss / seen as f32,
            correct as f32 / seen as f32
        );
    }

    let evaluation = evaluate(&model.valid(), &dataloader_test);

    Ok((model, evaluation))
}

fn evaluate<B: Backend>(
    model: &Model<B>,
    dataloader: &Arc<dyn DataLoader<SignBatch<B>>>,
) -> Evaluation {
    let mut total_loss = 0.0;
    let mut correct = 0;
    let mut seen = 0;

    for batch in dataloader.iter() {
        let batch_size = batch.targets.dims()[0];
        let output = model.forward_classification(batch.images, batch.targets);

        total_loss += output.loss.into_scalar().elem::<f32>() * batch_size as f32;
        correct += count_correct(&output.output, &output.targets);
        seen += batch_size;
    }

    Evaluation {
        loss: total_loss / seen as f32,
        accuracy: correct as f32 / seen as f32,
    }
}

fn count_correct<B: Backend>(output: &Tensor<B, 2>, targets: &Tensor<B, 1, Int>) -> i64 {
    let predictions: Tensor<B, 1, Int> = output.clone().argmax(1).squeeze(1);

    predictions
        .equal(targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem()
}
