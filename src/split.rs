use burn::data::dataset::InMemDataset;
use ndarray::Array2;
use rand::{rngs::StdRng, seq::SliceRandom, thread_rng, SeedableRng};

use crate::{
    data::{SignDataset, SignImage, SignSample},
    error::SplitError,
};

/// Expands integer categories into rows of a one-hot matrix of width
/// `category_count`.
pub fn one_hot_encode(categories: &[usize], category_count: usize) -> Array2<f32> {
    let mut labels = Array2::zeros((categories.len(), category_count));
    for (row, &category) in categories.iter().enumerate() {
        labels[[row, category]] = 1.0;
    }

    labels
}

/// Recovers the integer category from a one-hot label row.
pub fn one_hot_decode(label: &[f32]) -> usize {
    label
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(category, _)| category)
        .unwrap_or(0)
}

/// Randomly partitions the dataset into disjoint training and evaluation
/// subsets, the evaluation subset holding `ceil(test_fraction * n)` samples.
/// A seed makes the partition deterministic; without one every invocation
/// shuffles independently.
pub fn train_test_split(
    images: Vec<SignImage>,
    labels: Array2<f32>,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<(SignDataset, SignDataset), SplitError> {
    if test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    if images.len() != labels.nrows() {
        return Err(SplitError::LengthMismatch {
            images: images.len(),
            labels: labels.nrows(),
        });
    }
    if images.is_empty() {
        return Err(SplitError::Empty);
    }

    let mut items: Vec<SignSample> = images
        .into_iter()
        .zip(labels.outer_iter())
        .map(|(image, label)| SignSample {
            image,
            label: label.to_vec(),
        })
        .collect();

    match seed {
        Some(seed) => items.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => items.shuffle(&mut thread_rng()),
    }

    let test_count = (items.len() as f64 * test_fraction).ceil() as usize;
    let train_items = items.split_off(test_count);

    Ok((
        SignDataset {
            dataset: InMemDataset::new(train_items),
        },
        SignDataset {
            dataset: InMemDataset::new(items),
        },
    ))
}
