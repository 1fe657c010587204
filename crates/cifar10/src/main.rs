use std::path::PathBuf;
use std::time::SystemTime;
use anyhow::Context;
use burn::backend::NdArray;
use burn::config::Config;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use cifar10::{download_and_extract, Cifar10Loader, CifarDataset, ClassificationBatcher, LoaderConfig};
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(about = "Fetch CIFAR-10 and stream one training epoch")]
struct Args {
	/// Where the archive is stored and extracted. Defaults to ~/.cache/cifar10
	#[arg(long)]
	data_dir: Option<PathBuf>,

	/// JSON loader config; overrides the flags below
	#[arg(long)]
	config: Option<PathBuf>,

	#[arg(long, default_value_t = 50)]
	batch_size: usize,

	#[arg(long)]
	shuffle: bool,

	#[arg(long)]
	seed: Option<u64>,

	/// Keep integer labels instead of one-hot rows
	#[arg(long)]
	sparse_labels: bool,

	/// Keep u8 pixels instead of scaling to [0, 1]
	#[arg(long)]
	raw: bool,

	/// Also run one batch through the burn data loader
	#[arg(long)]
	tensors: bool,
}

fn loader_config(args: &Args) -> anyhow::Result<LoaderConfig> {
	let config = match &args.config {
		Some(path) => LoaderConfig::load(path).with_context(|| format!("loading {path:?}"))?,
		None => LoaderConfig::new()
			.with_batch_size(args.batch_size)
			.with_shuffle(args.shuffle)
			.with_seed(args.seed)
			.with_onehot(!args.sparse_labels)
			.with_normalize(!args.raw),
	};

	Ok(config)
}

/// Dims of the first `[images, targets]` batch the burn data loader builds from the test split.
fn first_tensor_batch(loader: &Cifar10Loader, batch_size: usize) -> anyhow::Result<Option<([usize; 4], [usize; 1])>> {
	let dataset = CifarDataset::test(loader)?;
	println!("Test dataset size: {}", dataset.len());

	let batcher = ClassificationBatcher::<NdArray>::new(Default::default());
	let dataloader = DataLoaderBuilder::new(batcher)
		.batch_size(batch_size)
		.build(dataset);

	let mut batches = dataloader.iter();
	let dims = batches
		.next()
		.map(|batch| (batch.images.dims(), batch.targets.dims()));

	Ok(dims)
}

fn main() -> anyhow::Result<()> {
	SimpleLogger::new().with_level(LevelFilter::Info).init()?;

	let args = Args::parse();
	let config = loader_config(&args)?;

	let data_dir = args.data_dir.clone().unwrap_or_else(cifar10::default_data_dir);
	let batches_dir = download_and_extract(&data_dir)?;
	let loader = Cifar10Loader::new(&batches_dir)?;

	println!("Train samples: {}", loader.num_train);
	println!("Test samples: {}", loader.num_test);

	let time = SystemTime::now();

	let mut batches = 0;
	let mut samples = 0;
	for batch in loader.train_epoch(&config)? {
		let batch = batch?;
		batches += 1;
		samples += batch.len();
	}

	println!("Streamed {batches} batches ({samples} samples) in {}s", time.elapsed()?.as_millis() as f64 / 1000.0);

	let test = loader.load_test(config.onehot, config.normalize)?;
	println!("Test images {:?}, labels {:?}", test.images.shape, test.labels.shape);

	if args.tensors {
		if let Some((images, targets)) = first_tensor_batch(&loader, config.batch_size)? {
			println!("First tensor batch: images {:?}, targets {:?}", images, targets);
		}
	}

	Ok(())
}
