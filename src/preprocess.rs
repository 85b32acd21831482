use image::imageops::FilterType;

pub const IMAGE_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// Shape of every tensor fed to the model: batch, height, width, channels.
pub const INPUT_SHAPE: [u64; 4] = [1, IMAGE_SIZE as u64, IMAGE_SIZE as u64, CHANNELS as u64];

#[derive(Debug, thiserror::Error)]
#[error("cannot identify image file: {0}")]
pub struct DecodeError(#[from] image::ImageError);

/// A single-item NHWC batch with values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    /// Uniform noise in `[0, 1)`, used to probe the model without an upload.
    pub fn random() -> Self {
        let data = (0..Self::len()).map(|_| rand::random::<f32>()).collect();
        Self { data }
    }

    pub const fn shape(&self) -> [u64; 4] {
        INPUT_SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Smallest and largest element, as `(min, max)`.
    pub fn range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    const fn len() -> usize {
        (IMAGE_SIZE as usize) * (IMAGE_SIZE as usize) * CHANNELS
    }
}

/// Decodes `image_data`, drops any alpha channel, resizes to 224x224 and
/// scales every channel into `[0, 1]`.
pub fn normalize(image_data: &[u8]) -> Result<ImageTensor, DecodeError> {
    let img = image::load_from_memory(image_data)?;

    let rgb = img.to_rgb8();
    let resized = image::imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|channel| f32::from(channel) / 255.0)
        .collect();

    let tensor = ImageTensor { data };
    let (min, max) = tensor.range();
    tracing::info!(
        "Image processed. Shape: {:?}, Range: [{:.3}, {:.3}]",
        tensor.shape(),
        min,
        max
    );

    Ok(tensor)
}
