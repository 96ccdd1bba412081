use image::imageops::FilterType;
use image::DynamicImage;

use crate::ModelError;

pub const INPUT_SIZE: u32 = 224;
pub const GRID_CELLS: u32 = 8;
pub const FEATURE_DIMS: usize = (GRID_CELLS * GRID_CELLS * 3) as usize;

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ModelError> {
    image::load_from_memory(bytes).map_err(|err| ModelError::Decode(err.to_string()))
}

/// Resizes to the model input size and average-pools each grid cell into a
/// mean RGB triple scaled to `[0, 1]`.
pub fn extract_features(image: &DynamicImage) -> Vec<f32> {
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();
    let cell = INPUT_SIZE / GRID_CELLS;
    let mut features = vec![0.0_f32; FEATURE_DIMS];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let gx = (x / cell).min(GRID_CELLS - 1);
        let gy = (y / cell).min(GRID_CELLS - 1);
        let base = ((gy * GRID_CELLS + gx) * 3) as usize;
        for (channel, value) in pixel.0.iter().enumerate() {
            features[base + channel] += f32::from(*value) / 255.0;
        }
    }

    let per_cell = (cell * cell) as f32;
    for value in &mut features {
        *value /= per_cell;
    }
    features
}
