use crate::encode::chw_to_hwc;
use crate::error::Result;
use crate::loader::Cifar10Loader;
use crate::shard::{read_shard, CHANNELS, HEIGHT, PIXELS_PER_IMAGE, WIDTH};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::Backend;
use burn::tensor::{ElementConversion, Int, Shape, Tensor, TensorData};

// Per-channel mean and std of the CIFAR-10 training images, pixels scaled to [0, 1]
const MEAN: [f32; 3] = [0.4914, 0.48216, 0.44653];
const STD: [f32; 3] = [0.24703, 0.24349, 0.26159];

/// One CIFAR-10 sample, pixels in `[H, W, C]` order.
#[derive(Debug, Clone, PartialEq)]
pub struct CifarItem {
	pub image: Vec<u8>,
	pub label: u8,
}

/// A split held fully in memory, for use with burn's `DataLoaderBuilder`.
#[derive(Debug, Clone)]
pub struct CifarDataset {
	pixels: Vec<u8>,
	labels: Vec<u8>,
}

impl CifarDataset {
	pub fn train(loader: &Cifar10Loader) -> Result<Self> {
		Self::from_shards(&loader.train_shards)
	}

	pub fn test(loader: &Cifar10Loader) -> Result<Self> {
		Self::from_shards(std::slice::from_ref(&loader.test_shard))
	}

	fn from_shards<P: AsRef<std::path::Path>>(paths: &[P]) -> Result<Self> {
		let mut pixels = Vec::new();
		let mut labels = Vec::new();

		for path in paths {
			let shard = read_shard(path)?;
			pixels.extend(chw_to_hwc(&shard.pixels, shard.len()));
			labels.extend(shard.labels);
		}

		Ok(Self { pixels, labels })
	}
}

impl Dataset<CifarItem> for CifarDataset {
	fn get(&self, index: usize) -> Option<CifarItem> {
		let label = *self.labels.get(index)?;
		let start = index * PIXELS_PER_IMAGE;

		Some(CifarItem {
			image: self.pixels[start..start + PIXELS_PER_IMAGE].to_vec(),
			label,
		})
	}

	fn len(&self) -> usize {
		self.labels.len()
	}
}

/// Standardizes `[B, 3, H, W]` images with the CIFAR-10 channel statistics.
#[derive(Clone)]
pub struct Normalizer<B: Backend> {
	pub mean: Tensor<B, 4>,
	pub std: Tensor<B, 4>,
}

impl <B: Backend> Normalizer<B> {
	pub fn new(device: &B::Device) -> Self {
		let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([1, 3, 1, 1]);
		let std = Tensor::<B, 1>::from_floats(STD, device).reshape([1, 3, 1, 1]);
		Self { mean, std }
	}

	pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		(input - self.mean.clone()) / self.std.clone()
	}
}

#[derive(Clone, Debug)]
pub struct ClassificationBatch<B: Backend> {
	/// `[B, 3, 32, 32]`
	pub images: Tensor<B, 4>,
	pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone)]
pub struct ClassificationBatcher<B: Backend> {
	normalizer: Normalizer<B>,
	device: B::Device,
}

impl <B: Backend> ClassificationBatcher<B> {
	pub fn new(device: B::Device) -> Self {
		Self {
			normalizer: Normalizer::<B>::new(&device),
			device,
		}
	}
}

impl<B: Backend> Batcher<CifarItem, ClassificationBatch<B>> for ClassificationBatcher<B> {
	fn batch(&self, items: Vec<CifarItem>) -> ClassificationBatch<B> {
		let targets = items
			.iter()
			.map(|item| {
				Tensor::<B, 1, Int>::from_data(
					TensorData::from([(item.label as i64).elem::<B::IntElem>()]),
					&self.device,
				)
			})
			.collect();

		let images = items
			.into_iter()
			.map(|item| TensorData::new(item.image, Shape::new([HEIGHT, WIDTH, CHANNELS])))
			.map(|data| {
				Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), &self.device)
					.permute([2, 0, 1]) // [C, H, W]
			})
			.map(|tensor| tensor / 255)
			.collect();

		let images = Tensor::stack(images, 0);
		let targets = Tensor::cat(targets, 0);

		let images = self.normalizer.normalize(images);

		ClassificationBatch { images, targets }
	}
}
