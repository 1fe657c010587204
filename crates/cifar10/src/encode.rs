use crate::shard::{CHANNELS, HEIGHT, NUM_CLASSES, PIXELS_PER_IMAGE, WIDTH};
use burn::tensor::TensorData;

/// Reorders `n` images from `[C, H, W]` to `[H, W, C]`.
pub fn chw_to_hwc(pixels: &[u8], n: usize) -> Vec<u8> {
	let plane = WIDTH * HEIGHT;
	let mut out = vec![0u8; n * PIXELS_PER_IMAGE];

	for (image, dst) in pixels.chunks_exact(PIXELS_PER_IMAGE).zip(out.chunks_exact_mut(PIXELS_PER_IMAGE)).take(n) {
		for p in 0..plane {
			for c in 0..CHANNELS {
				dst[p * CHANNELS + c] = image[c * plane + p];
			}
		}
	}

	out
}

pub fn scale(pixels: &[u8]) -> Vec<f32> {
	pixels.iter().map(|&p| p as f32 * (1.0 / 255.0)).collect()
}

pub fn one_hot(labels: &[u8], classes: usize) -> Vec<i64> {
	let mut out = vec![0i64; labels.len() * classes];
	for (row, &label) in labels.iter().enumerate() {
		out[row * classes + label as usize] = 1;
	}
	out
}

/// `[n, 32, 32, 3]` images, `u8` as stored or `f32` in `[0, 1]`.
pub fn encode_images(hwc: Vec<u8>, n: usize, normalize: bool) -> TensorData {
	let shape = [n, HEIGHT, WIDTH, CHANNELS];
	if normalize {
		TensorData::new(scale(&hwc), shape)
	} else {
		TensorData::new(hwc, shape)
	}
}

/// `[n]` class indices, or `[n, 10]` rows of zeros with a single one.
pub fn encode_labels(labels: &[u8], onehot: bool) -> TensorData {
	if onehot {
		TensorData::new(one_hot(labels, NUM_CLASSES), [labels.len(), NUM_CLASSES])
	} else {
		TensorData::new(labels.iter().map(|&l| l as i64).collect::<Vec<_>>(), [labels.len()])
	}
}
