use crate::error::{CifarError, Result};
use burn::data::network::downloader;
use flate2::read::GzDecoder;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub const URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
pub const ARCHIVE_NAME: &str = "cifar-10-binary.tar.gz";
pub const BATCHES_DIR: &str = "cifar-10-batches-bin";

/// `~/.cache/cifar10`, or `./cifar10` when there is no home directory.
pub fn default_data_dir() -> PathBuf {
	dirs::home_dir()
		.map(|home| home.join(".cache"))
		.unwrap_or_else(|| PathBuf::from("."))
		.join("cifar10")
}

pub fn download_and_extract<P: AsRef<Path>>(target_dir: P) -> Result<PathBuf> {
	download_and_extract_from(target_dir, URL)
}

/// Fetches the archive at `url` into `target_dir` unless it is already there, then unpacks it.
///
/// Returns the directory holding the extracted shard files.
pub fn download_and_extract_from<P: AsRef<Path>>(target_dir: P, url: &str) -> Result<PathBuf> {
	let target_dir = target_dir.as_ref();
	if !target_dir.exists() {
		create_dir_all(target_dir)?;
	}

	let file_base_name = url.rsplit_once('/').map(|(_, name)| name).unwrap_or(url);
	let archive = target_dir.join(file_base_name);

	if !archive.exists() {
		let bytes = downloader::download_file_as_bytes(url, file_base_name);
		save_archive(&archive, &bytes)?;
		log::info!("Downloaded {}", file_base_name);
	} else {
		log::info!("Found existing {}", file_base_name);
	}

	let size = archive.metadata()?.len() as f64 / 1024f64.powi(2);
	log::info!("{} ({:.1} Mb)", file_base_name, size);

	extract_archive(&archive, target_dir)?;

	Ok(target_dir.join(BATCHES_DIR))
}

/// Writes `bytes` to `<archive>.part` and renames it to `archive` once complete.
/// The archive path only ever holds a whole download.
fn save_archive(archive: &Path, bytes: &[u8]) -> Result<()> {
	let mut partial = archive.as_os_str().to_owned();
	partial.push(".part");
	let partial = PathBuf::from(partial);

	let written = File::create(&partial).and_then(|mut output_file| output_file.write(bytes));
	let result = match written {
		Ok(bytes_written) if bytes_written == bytes.len() => std::fs::rename(&partial, archive).map_err(CifarError::from),
		Ok(bytes_written) => Err(CifarError::ShortWrite {
			path: archive.to_path_buf(),
			written: bytes_written,
			expected: bytes.len(),
		}),
		Err(err) => Err(err.into()),
	};

	if result.is_err() {
		std::fs::remove_file(&partial).ok();
	}

	result
}

pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, target_dir: Q) -> Result<()> {
	let archive = archive.as_ref();
	log::info!("Extracting {:?} ...", archive);

	let gz_buffer = GzDecoder::new(BufReader::new(File::open(archive)?));
	let mut archive = tar::Archive::new(gz_buffer);
	archive.unpack(target_dir)?;

	Ok(())
}
