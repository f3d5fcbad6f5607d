use std::{fs, iter, path::Path};

use burn::{
    data::{
        dataloader::batcher::Batcher,
        dataset::{Dataset, InMemDataset},
    },
    prelude::*,
};
use image::{imageops::FilterType, ImageReader};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{error::DataError, split::one_hot_decode};

pub const CHANNEL_COUNT: usize = 3;

/// Shape of the dataset: every loaded image is resized to
/// `image_width` x `image_height`, and category directories are numbered
/// `0..category_count`.
#[derive(Config, Debug)]
pub struct DataConfig {
    #[config(default = 30)]
    pub image_width: usize,

    #[config(default = 30)]
    pub image_height: usize,

    #[config(default = 43)]
    pub category_count: usize,
}

/// A decoded RGB raster, stored channel-major (3 x height x width).
#[derive(Debug, Clone)]
pub struct SignImage {
    pub pixels: Vec<u8>,
}

/// An image paired with its one-hot category label.
#[derive(Debug, Clone)]
pub struct SignSample {
    pub image: SignImage,
    pub label: Vec<f32>,
}

pub struct SignDataset {
    pub dataset: InMemDataset<SignSample>,
}

impl Dataset<SignSample> for SignDataset {
    fn get(&self, index: usize) -> Option<SignSample> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

/// Loads every image under `data_dir/<category>/` for each category in
/// `0..category_count`, resized to the configured shape. Returns the images
/// together with a parallel vector of integer category labels.
///
/// Categories are visited in ascending order and files within a category in
/// lexicographic order, so the loaded order is stable across platforms.
pub fn load_data(
    data_dir: &Path,
    config: &DataConfig,
) -> Result<(Vec<SignImage>, Vec<usize>), DataError> {
    if !data_dir.is_dir() {
        return Err(DataError::MissingRoot(data_dir.to_path_buf()));
    }

    let mut images = Vec::new();
    let mut labels = Vec::new();

    for category in 0..config.category_count {
        let category_images = read_category(&data_dir.join(category.to_string()), config)?;
        debug!("category {category}: {} images", category_images.len());

        labels.extend(iter::repeat(category).take(category_images.len()));
        images.extend(category_images);
    }

    Ok((images, labels))
}

fn read_category(dir: &Path, config: &DataConfig) -> Result<Vec<SignImage>, DataError> {
    if !dir.is_dir() {
        return Err(DataError::MissingCategory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut paths: Vec<_> = entries.into_iter().map(|entry| entry.path()).collect();
    paths.sort();

    paths
        .par_iter()
        .map(|path| read_image(path, config))
        .collect()
}

fn read_image(path: &Path, config: &DataConfig) -> Result<SignImage, DataError> {
    let decoded = ImageReader::open(path)
        .map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| DataError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let (width, height) = (config.image_width, config.image_height);
    let resized = decoded
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .to_rgb8();

    let mut pixels = vec![0; CHANNEL_COUNT * height * width];
    for (i, pixel) in resized.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        pixels[i] = r;
        pixels[height * width + i] = g;
        pixels[2 * height * width + i] = b;
    }

    Ok(SignImage { pixels })
}

#[derive(Clone, Debug)]
pub struct SignBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone)]
pub struct SignBatcher<B: Backend> {
    device: B::Device,
    image_width: usize,
    image_height: usize,
}

impl<B: Backend> SignBatcher<B> {
    pub fn new(device: B::Device, config: &DataConfig) -> Self {
        Self {
            device,
            image_width: config.image_width,
            image_height: config.image_height,
        }
    }
}

impl<B: Backend> Batcher<SignSample, SignBatch<B>> for SignBatcher<B> {
    fn batch(&self, items: Vec<SignSample>) -> SignBatch<B> {
        let (width, height) = (self.image_width, self.image_height);

        let images = items
            .iter()
            .map(|item| {
                TensorData::new(item.image.pixels.clone(), [CHANNEL_COUNT, height, width])
                    .convert::<B::FloatElem>()
            })
            .map(|data| Tensor::<B, 3>::from_data(data, &self.device))
            .map(|tensor| tensor.reshape([1, CHANNEL_COUNT, height, width]))
            .map(|tensor| tensor / 255.)
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                let category = one_hot_decode(&item.label) as i64;
                Tensor::<B, 1, Int>::from_data([category.elem::<B::IntElem>()], &self.device)
            })
            .collect();

        let images = Tensor::cat(images, 0).to_device(&self.device);
        let targets = Tensor::cat(targets, 0).to_device(&self.device);

        SignBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use image::{Rgb, RgbImage};

    type TestBackend = burn::backend::NdArray;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trafficnet-{}-{name}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_config() -> DataConfig {
        DataConfig::new()
            .with_image_width(8)
            .with_image_height(8)
            .with_category_count(2)
    }

    fn write_image(path: &Path, color: [u8; 3], width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn loads_every_file_with_matching_labels() {
        let root = scratch("loads");
        fs::create_dir(root.join("0")).unwrap();
        fs::create_dir(root.join("1")).unwrap();
        for i in 0..3 {
            write_image(&root.join("0").join(format!("{i}.png")), [255, 0, 0], 10, 20);
        }
        for i in 0..2 {
            write_image(&root.join("1").join(format!("{i}.png")), [0, 0, 255], 40, 15);
        }

        let (images, labels) = load_data(&root, &small_config()).unwrap();

        assert_eq!(images.len(), 5);
        assert_eq!(labels, vec![0, 0, 0, 1, 1]);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn resizes_every_image_to_the_configured_shape() {
        let root = scratch("resizes");
        fs::create_dir(root.join("0")).unwrap();
        fs::create_dir(root.join("1")).unwrap();
        write_image(&root.join("0").join("a.png"), [10, 20, 30], 3, 3);
        write_image(&root.join("0").join("b.png"), [10, 20, 30], 64, 64);
        write_image(&root.join("1").join("c.png"), [10, 20, 30], 10, 20);

        let (images, _) = load_data(&root, &small_config()).unwrap();

        for image in images {
            assert_eq!(image.pixels.len(), CHANNEL_COUNT * 8 * 8);
        }
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn stores_pixels_channel_major() {
        let root = scratch("channels");
        fs::create_dir(root.join("0")).unwrap();
        fs::create_dir(root.join("1")).unwrap();
        write_image(&root.join("0").join("red.png"), [255, 0, 0], 16, 16);
        write_image(&root.join("1").join("blue.png"), [0, 0, 255], 16, 16);

        let (images, _) = load_data(&root, &small_config()).unwrap();

        let red = &images[0].pixels;
        assert!(red[..64].iter().all(|&value| value == 255));
        assert!(red[64..].iter().all(|&value| value == 0));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = scratch("missing-root").join("nowhere");
        let result = load_data(&root, &small_config());
        assert!(matches!(result, Err(DataError::MissingRoot(_))));
    }

    #[test]
    fn missing_category_directory_is_an_error() {
        let root = scratch("missing-category");
        fs::create_dir(root.join("0")).unwrap();

        let result = load_data(&root, &small_config());
        assert!(matches!(result, Err(DataError::MissingCategory(_))));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn undecodable_file_aborts_loading() {
        let root = scratch("undecodable");
        fs::create_dir(root.join("0")).unwrap();
        fs::create_dir(root.join("1")).unwrap();
        write_image(&root.join("1").join("ok.png"), [0, 255, 0], 8, 8);
        fs::write(root.join("0").join("junk.png"), b"not an image").unwrap();

        let result = load_data(&root, &small_config());
        assert!(matches!(result, Err(DataError::Decode { .. })));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn batches_images_and_targets() {
        let pixel_count = CHANNEL_COUNT * 8 * 8;
        let first = SignSample {
            image: SignImage {
                pixels: vec![255; pixel_count],
            },
            label: vec![1.0, 0.0],
        };
        let second = SignSample {
            image: SignImage {
                pixels: vec![0; pixel_count],
            },
            label: vec![0.0, 1.0],
        };

        let batcher = SignBatcher::<TestBackend>::new(Default::default(), &small_config());
        let batch = batcher.batch(vec![first, second]);

        assert_eq!(batch.images.dims(), [2, CHANNEL_COUNT, 8, 8]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 1]);

        // Pixels are scaled into [0, 1].
        let max = batch.images.max().into_scalar();
        assert_eq!(max, 1.0);
    }
}
