use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CifarError>;

#[derive(Debug, Error)]
pub enum CifarError {
	#[error("Std IO error: {0}")]
	StdIoError(#[from] std::io::Error),
	#[error("Shard {path:?} is {len} bytes, not a whole number of records")]
	TruncatedShard { path: PathBuf, len: u64 },
	#[error("Shard {path:?} has label {label} at record {index}")]
	InvalidLabel { path: PathBuf, index: usize, label: u8 },
	#[error("No data_batch files found in {0:?}")]
	NoTrainingShards(PathBuf),
	#[error("Batch size must be at least 1")]
	InvalidBatchSize,
	#[error("Archive {path:?} was only partially written ({written} of {expected} bytes)")]
	ShortWrite { path: PathBuf, written: usize, expected: usize },
}
