use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
    train::ClassificationOutput,
};

use crate::data::CHANNEL_COUNT;

const FILTER_COUNT: usize = 32;
const KERNEL_SIZE: [usize; 2] = [3, 3];

/// Minimal convolutional classifier: one 3x3 convolution, flatten, and a
/// sigmoid-activated dense output with one unit per category.
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    conv: Conv2d<B>,
    output: Linear<B>,
}

impl<B: Backend> Model<B> {
    /// Scores a `[batch, 3, height, width]` batch, returning one activation
    /// per category for each image.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv.forward(images));
        let x: Tensor<B, 2> = x.flatten(1, 3);

        sigmoid(self.output.forward(x))
    }

    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    pub category_count: usize,
    pub image_width: usize,
    pub image_height: usize,
}

impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        // The 3x3 valid convolution shrinks each spatial dimension by 2.
        let feature_count = FILTER_COUNT * (self.image_width - 2) * (self.image_height - 2);

        Model {
            conv: Conv2dConfig::new([CHANNEL_COUNT, FILTER_COUNT], KERNEL_SIZE).init(device),
            output: LinearConfig::new(feature_count, self.category_count).init(device),
        }
    }
}
