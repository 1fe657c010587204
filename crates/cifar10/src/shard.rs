//! Decoding of the CIFAR-10 binary shard files.
//!
//! Every shard (`data_batch_N.bin`, `test_batch.bin`) is a flat run of records:
//! one label byte followed by a 32x32 colour image stored as 1024 red, 1024 green
//! and 1024 blue bytes.
use crate::error::{CifarError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub const WIDTH: usize = 32;
pub const HEIGHT: usize = 32;
pub const CHANNELS: usize = 3;
pub const PIXELS_PER_IMAGE: usize = WIDTH * HEIGHT * CHANNELS;
pub const RECORD_SIZE: usize = PIXELS_PER_IMAGE + 1;
pub const NUM_CLASSES: usize = 10;

/// One decoded shard. `pixels` keeps the on-disk CHW layout, image after image.
#[derive(Debug, Clone)]
pub struct Shard {
	pub pixels: Vec<u8>,
	pub labels: Vec<u8>,
}

impl Shard {
	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	pub fn image(&self, index: usize) -> Option<&[u8]> {
		let start = index.checked_mul(PIXELS_PER_IMAGE)?;
		self.pixels.get(start..start + PIXELS_PER_IMAGE)
	}
}

pub fn read_shard<P: AsRef<Path>>(path: P) -> Result<Shard> {
	let path = path.as_ref();
	let mut reader = BufReader::new(File::open(path)?);
	let mut data = Vec::new();
	reader.read_to_end(&mut data)?;

	if data.len() % RECORD_SIZE != 0 {
		return Err(CifarError::TruncatedShard {
			path: path.to_path_buf(),
			len: data.len() as u64,
		});
	}

	let count = data.len() / RECORD_SIZE;
	let mut labels = Vec::with_capacity(count);
	let mut pixels = Vec::with_capacity(count * PIXELS_PER_IMAGE);

	for (index, record) in data.chunks_exact(RECORD_SIZE).enumerate() {
		let label = record[0];
		if label as usize >= NUM_CLASSES {
			return Err(CifarError::InvalidLabel {
				path: path.to_path_buf(),
				index,
				label,
			});
		}
		labels.push(label);
		pixels.extend_from_slice(&record[1..]);
	}

	log::debug!("Read {} records from {:?}", count, path);

	Ok(Shard { pixels, labels })
}

/// Number of samples in a shard, from its file size alone.
pub fn count_records<P: AsRef<Path>>(path: P) -> Result<usize> {
	let path = path.as_ref();
	let len = path.metadata()?.len();

	if len % RECORD_SIZE as u64 != 0 {
		return Err(CifarError::TruncatedShard { path: path.to_path_buf(), len });
	}

	Ok((len / RECORD_SIZE as u64) as usize)
}
