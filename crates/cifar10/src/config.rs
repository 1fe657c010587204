use burn::config::Config;

#[derive(Debug, Config)]
pub struct LoaderConfig {
	#[config(default = 50)]
	pub batch_size: usize,

	#[config(default = true)]
	pub onehot: bool,

	#[config(default = false)]
	pub shuffle: bool,

	#[config(default = true)]
	pub normalize: bool,

	// entropy seeded when unset
	pub seed: Option<u64>,

	/// Skip the trailing batch of each shard when it is shorter than `batch_size`.
	#[config(default = true)]
	pub drop_last: bool,
}
