//! Download, extract and load the CIFAR-10 binary dataset.
//!
//! ```no_run
//! use cifar10::{download_and_extract, Cifar10Loader, LoaderConfig};
//!
//! let dir = download_and_extract(cifar10::default_data_dir())?;
//! let loader = Cifar10Loader::new(dir)?;
//! let config = LoaderConfig::new().with_shuffle(true).with_seed(Some(1));
//! for batch in loader.train_epoch(&config)? {
//!     let batch = batch?;
//!     assert_eq!(batch.images.shape, vec![50, 32, 32, 3]);
//! }
//! # Ok::<(), cifar10::CifarError>(())
//! ```
pub mod config;
pub mod data;
pub mod download;
pub mod encode;
pub mod error;
pub mod loader;
pub mod shard;

pub use config::LoaderConfig;
pub use data::{ClassificationBatch, ClassificationBatcher, CifarDataset, CifarItem, Normalizer};
pub use download::{default_data_dir, download_and_extract, download_and_extract_from, extract_archive};
pub use error::{CifarError, Result};
pub use loader::{class_names, Cifar10Loader, CifarArrays, TrainEpoch};
