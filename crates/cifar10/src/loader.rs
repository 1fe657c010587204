use crate::config::LoaderConfig;
use crate::encode::{chw_to_hwc, encode_images, encode_labels};
use crate::error::{CifarError, Result};
use crate::shard::{count_records, read_shard, PIXELS_PER_IMAGE};
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const TRAIN_PREFIX: &str = "data_batch";
pub const TEST_FILE: &str = "test_batch.bin";

pub const CLASSES: [&str; 10] = [
	"airplane",
	"automobile",
	"bird",
	"cat",
	"deer",
	"dog",
	"frog",
	"horse",
	"ship",
	"truck",
];

pub fn class_names() -> &'static [&'static str] {
	&CLASSES
}

/// Images and labels of a whole split or of one mini-batch.
#[derive(Debug, Clone)]
pub struct CifarArrays {
	/// `[n, 32, 32, 3]`
	pub images: TensorData,
	/// `[n]` or `[n, 10]`
	pub labels: TensorData,
}

impl CifarArrays {
	pub fn len(&self) -> usize {
		self.labels.shape[0]
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Accessor over an extracted `cifar-10-batches-bin` directory.
#[derive(Debug, Clone)]
pub struct Cifar10Loader {
	pub train_shards: Vec<PathBuf>,
	pub test_shard: PathBuf,
	pub num_train: usize,
	pub num_test: usize,
}

impl Cifar10Loader {
	pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
		let dir = dir.as_ref();

		let mut train_shards = Vec::new();
		for entry in dir.read_dir()? {
			let path = entry?.path();
			let is_train = path
				.file_name()
				.and_then(|name| name.to_str())
				.is_some_and(|name| name.starts_with(TRAIN_PREFIX));
			if is_train && path.is_file() {
				train_shards.push(path);
			}
		}
		train_shards.sort();

		if train_shards.is_empty() {
			return Err(CifarError::NoTrainingShards(dir.to_path_buf()));
		}

		let test_shard = dir.join(TEST_FILE);

		let num_train = train_shards
			.iter()
			.map(count_records)
			.sum::<Result<usize>>()?;
		let num_test = count_records(&test_shard)?;

		log::info!(
			"Found {} training shards ({} samples) and {} test samples in {:?}",
			train_shards.len(),
			num_train,
			num_test,
			dir
		);

		Ok(Self {
			train_shards,
			test_shard,
			num_train,
			num_test,
		})
	}

	pub fn load_test(&self, onehot: bool, normalize: bool) -> Result<CifarArrays> {
		let shard = read_shard(&self.test_shard)?;
		let n = shard.len();
		let hwc = chw_to_hwc(&shard.pixels, n);

		Ok(CifarArrays {
			images: encode_images(hwc, n, normalize),
			labels: encode_labels(&shard.labels, onehot),
		})
	}

	/// The whole training split, shards concatenated in file name order.
	pub fn load_train(&self, onehot: bool, normalize: bool) -> Result<CifarArrays> {
		let mut pixels = Vec::with_capacity(self.num_train * PIXELS_PER_IMAGE);
		let mut labels = Vec::with_capacity(self.num_train);

		for path in &self.train_shards {
			let shard = read_shard(path)?;
			pixels.extend(chw_to_hwc(&shard.pixels, shard.len()));
			labels.extend(shard.labels);
		}

		let n = labels.len();
		Ok(CifarArrays {
			images: encode_images(pixels, n, normalize),
			labels: encode_labels(&labels, onehot),
		})
	}

	/// Streams one epoch of training mini-batches, one shard in memory at a time.
	pub fn train_epoch(&self, config: &LoaderConfig) -> Result<TrainEpoch> {
		if config.batch_size == 0 {
			return Err(CifarError::InvalidBatchSize);
		}

		let rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};

		Ok(TrainEpoch {
			shards: self.train_shards.clone().into_iter(),
			config: config.clone(),
			rng,
			current: None,
		})
	}
}

/// Training shard held in memory while its batches are handed out.
struct ShardCursor {
	// HWC, image after image
	pixels: Vec<u8>,
	labels: Vec<u8>,
	indices: Vec<usize>,
	position: usize,
}

impl ShardCursor {
	fn next_range(&mut self, batch_size: usize, drop_last: bool) -> Option<Range<usize>> {
		let remaining = self.indices.len() - self.position;
		if remaining == 0 || (drop_last && remaining < batch_size) {
			return None;
		}

		let start = self.position;
		let end = start + remaining.min(batch_size);
		self.position = end;

		Some(start..end)
	}
}

/// Iterator returned by [`Cifar10Loader::train_epoch`].
///
/// The same RNG shuffles every shard, so a fixed seed reproduces the whole epoch.
pub struct TrainEpoch {
	shards: std::vec::IntoIter<PathBuf>,
	config: LoaderConfig,
	rng: StdRng,
	current: Option<ShardCursor>,
}

impl TrainEpoch {
	fn open(&mut self, path: &Path) -> Result<ShardCursor> {
		let shard = read_shard(path)?;
		let n = shard.len();

		let mut indices: Vec<usize> = (0..n).collect();
		if self.config.shuffle {
			indices.shuffle(&mut self.rng);
		}

		Ok(ShardCursor {
			pixels: chw_to_hwc(&shard.pixels, n),
			labels: shard.labels,
			indices,
			position: 0,
		})
	}
}

impl Iterator for TrainEpoch {
	type Item = Result<CifarArrays>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(cursor) = self.current.as_mut() {
				if let Some(range) = cursor.next_range(self.config.batch_size, self.config.drop_last) {
					let slice = &cursor.indices[range];
					let mut pixels = Vec::with_capacity(slice.len() * PIXELS_PER_IMAGE);
					let mut labels = Vec::with_capacity(slice.len());
					for &index in slice {
						let start = index * PIXELS_PER_IMAGE;
						pixels.extend_from_slice(&cursor.pixels[start..start + PIXELS_PER_IMAGE]);
						labels.push(cursor.labels[index]);
					}

					return Some(Ok(CifarArrays {
						images: encode_images(pixels, labels.len(), self.config.normalize),
						labels: encode_labels(&labels, self.config.onehot),
					}));
				}
				self.current = None;
			}

			let path = self.shards.next()?;
			match self.open(&path) {
				Ok(cursor) => self.current = Some(cursor),
				Err(err) => {
					log::warn!("Stopping epoch at {:?}: {}", path, err);
					self.shards = Vec::new().into_iter();
					return Some(Err(err));
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::shard::tests::write_shard;
	use crate::shard::NUM_CLASSES;

	fn fixture(train: &[&[u8]], test: &[u8]) -> tempfile::TempDir {
		let dir = tempfile::tempdir().unwrap();
		for (i, labels) in train.iter().enumerate() {
			write_shard(&dir.path().join(format!("data_batch_{}.bin", i + 1)), labels);
		}
		write_shard(&dir.path().join(TEST_FILE), test);
		std::fs::write(dir.path().join("batches.meta.txt"), "airplane\n").unwrap();
		dir
	}

	fn sparse_labels(batch: &CifarArrays) -> Vec<i64> {
		batch.labels.to_vec::<i64>().unwrap()
	}

	#[test]
	fn discovers_and_counts_shards() {
		let dir = fixture(&[&[0, 1, 2], &[3, 4]], &[5, 6, 7, 8]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();

		assert_eq!(loader.train_shards.len(), 2);
		assert!(loader.train_shards[0].ends_with("data_batch_1.bin"));
		assert_eq!(loader.num_train, 5);
		assert_eq!(loader.num_test, 4);
	}

	#[test]
	fn no_training_shards() {
		let dir = fixture(&[], &[1]);
		assert!(matches!(Cifar10Loader::new(dir.path()), Err(CifarError::NoTrainingShards(_))));
	}

	#[test]
	fn missing_test_shard() {
		let dir = fixture(&[&[1]], &[]);
		std::fs::remove_file(dir.path().join(TEST_FILE)).unwrap();
		assert!(matches!(Cifar10Loader::new(dir.path()), Err(CifarError::StdIoError(_))));
	}

	#[test]
	fn loads_test_split() {
		let dir = fixture(&[&[0]], &[5, 6]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();

		let test = loader.load_test(true, true).unwrap();
		assert_eq!(test.len(), 2);
		assert_eq!(test.images.shape, vec![2, 32, 32, 3]);
		assert_eq!(test.labels.shape, vec![2, NUM_CLASSES]);

		// record 1 has channel values 3, 4, 5 in every pixel
		let images = test.images.to_vec::<f32>().unwrap();
		let second = &images[PIXELS_PER_IMAGE..PIXELS_PER_IMAGE + 3];
		assert!((second[0] - 3.0 / 255.0).abs() < 1e-6);
		assert!((second[2] - 5.0 / 255.0).abs() < 1e-6);

		let raw = loader.load_test(false, false).unwrap();
		assert_eq!(sparse_labels(&raw), vec![5, 6]);
		assert_eq!(&raw.images.to_vec::<u8>().unwrap()[..3], &[0, 1, 2]);
	}

	#[test]
	fn loads_whole_train_split() {
		let dir = fixture(&[&[0, 1], &[2, 3, 4]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();

		let train = loader.load_train(false, false).unwrap();
		assert_eq!(train.len(), 5);
		assert_eq!(sparse_labels(&train), vec![0, 1, 2, 3, 4]);
	}

	#[test]
	fn epoch_drops_partial_batch_per_shard() {
		let dir = fixture(&[&[0, 1, 2, 3, 4], &[5, 6, 7]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new().with_batch_size(2).with_onehot(false);

		let batches = loader.train_epoch(&config).unwrap().collect::<Result<Vec<_>>>().unwrap();

		let labels: Vec<Vec<i64>> = batches.iter().map(sparse_labels).collect();
		assert_eq!(labels, vec![vec![0, 1], vec![2, 3], vec![5, 6]]);
		assert!(batches.iter().all(|b| b.images.shape == vec![2, 32, 32, 3]));
	}

	#[test]
	fn epoch_keeps_partial_batch_when_asked() {
		let dir = fixture(&[&[0, 1, 2], &[3]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new()
			.with_batch_size(2)
			.with_onehot(false)
			.with_drop_last(false);

		let labels: Vec<Vec<i64>> = loader
			.train_epoch(&config)
			.unwrap()
			.map(|batch| sparse_labels(&batch.unwrap()))
			.collect();

		assert_eq!(labels, vec![vec![0, 1], vec![2], vec![3]]);
	}

	#[test]
	fn batch_larger_than_shard_yields_nothing() {
		let dir = fixture(&[&[0, 1, 2]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new().with_batch_size(4);

		assert_eq!(loader.train_epoch(&config).unwrap().count(), 0);
	}

	#[test]
	fn seeded_shuffle_is_reproducible_permutation() {
		let shard: Vec<u8> = (0..10).collect();
		let dir = fixture(&[&shard, &shard], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new()
			.with_batch_size(5)
			.with_onehot(false)
			.with_shuffle(true)
			.with_seed(Some(42));

		let epoch = |config: &LoaderConfig| -> Vec<i64> {
			loader
				.train_epoch(config)
				.unwrap()
				.flat_map(|batch| sparse_labels(&batch.unwrap()))
				.collect()
		};

		let first = epoch(&config);
		assert_eq!(first, epoch(&config));

		for half in first.chunks(10) {
			let mut sorted = half.to_vec();
			sorted.sort();
			assert_eq!(sorted, (0..10).collect::<Vec<i64>>());
		}
	}

	#[test]
	fn unseeded_shuffle_covers_every_shard() {
		let shard: Vec<u8> = (0..10).collect();
		let dir = fixture(&[&shard, &shard, &shard], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new()
			.with_batch_size(5)
			.with_onehot(false)
			.with_shuffle(true);
		assert_eq!(config.seed, None);

		let labels: Vec<i64> = loader
			.train_epoch(&config)
			.unwrap()
			.flat_map(|batch| sparse_labels(&batch.unwrap()))
			.collect();

		assert_eq!(labels.len(), 30);
		for shard in labels.chunks(10) {
			let mut sorted = shard.to_vec();
			sorted.sort();
			assert_eq!(sorted, (0..10).collect::<Vec<i64>>());
		}
	}

	#[test]
	fn shuffled_images_follow_their_labels() {
		let dir = fixture(&[&[0, 1, 2, 3, 4, 5, 6, 7]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new()
			.with_batch_size(4)
			.with_onehot(false)
			.with_normalize(false)
			.with_shuffle(true)
			.with_seed(Some(3));

		for batch in loader.train_epoch(&config).unwrap() {
			let batch = batch.unwrap();
			let images = batch.images.to_vec::<u8>().unwrap();
			for (row, label) in sparse_labels(&batch).into_iter().enumerate() {
				// fixture record i carries label i and red value i * 3
				assert_eq!(images[row * PIXELS_PER_IMAGE] as i64, label * 3);
			}
		}
	}

	#[test]
	fn zero_batch_size_is_rejected() {
		let dir = fixture(&[&[0]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		let config = LoaderConfig::new().with_batch_size(0);

		assert!(matches!(loader.train_epoch(&config), Err(CifarError::InvalidBatchSize)));
	}

	#[test]
	fn epoch_stops_after_unreadable_shard() {
		let dir = fixture(&[&[0, 1], &[2, 3], &[4, 5]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();
		std::fs::write(dir.path().join("data_batch_2.bin"), [1u8, 2, 3]).unwrap();
		let config = LoaderConfig::new().with_batch_size(2);

		let results: Vec<_> = loader.train_epoch(&config).unwrap().collect();

		assert_eq!(results.len(), 2);
		assert!(results[0].is_ok());
		assert!(matches!(results[1], Err(CifarError::TruncatedShard { .. })));
	}

	#[test]
	fn onehot_batches() {
		let dir = fixture(&[&[9, 0]], &[9]);
		let loader = Cifar10Loader::new(dir.path()).unwrap();

		let batch = loader.train_epoch(&LoaderConfig::new().with_batch_size(2)).unwrap().next().unwrap().unwrap();

		assert_eq!(batch.labels.shape, vec![2, NUM_CLASSES]);
		let labels = batch.labels.to_vec::<i64>().unwrap();
		assert_eq!(labels[9], 1);
		assert_eq!(labels[NUM_CLASSES], 1);
		assert_eq!(labels.iter().sum::<i64>(), 2);
	}

	#[test]
	fn ten_class_names() {
		assert_eq!(class_names().len(), NUM_CLASSES);
		assert_eq!(class_names()[3], "cat");
	}
}
