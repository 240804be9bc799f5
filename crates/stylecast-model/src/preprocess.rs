//! Style image loading and preprocessing.
//!
//! Styles arrive as image files of arbitrary size; the encode stage expects
//! a fixed-size normalized RGB tensor, so loading is: central square crop,
//! resize, RGB conversion, [0, 1] normalization, CHW layout.

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;

use stylecast_core::{Device, Tensor};

use crate::error::ModelError;

/// Edge length style images are resized to before encoding.
pub const STYLE_EDGE: u32 = 512;

/// Loads and preprocesses one style image into a `[3, 512, 512]` tensor.
pub fn load_style_image(path: &Path) -> Result<Tensor, ModelError> {
    let img = image::open(path).map_err(|source| ModelError::StyleImage {
        path: path.to_path_buf(),
        source,
    })?;
    let img = central_square_crop(&img);
    let img = img.resize_exact(STYLE_EDGE, STYLE_EDGE, FilterType::Triangle);
    Ok(image_to_tensor(&img))
}

fn central_square_crop(img: &DynamicImage) -> DynamicImage {
    let edge = img.width().min(img.height());
    let x = (img.width() - edge) / 2;
    let y = (img.height() - edge) / 2;
    img.crop_imm(x, y, edge, edge)
}

fn image_to_tensor(img: &DynamicImage) -> Tensor {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let plane = width * height;
    let mut values = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for (channel, &value) in pixel.0.iter().enumerate() {
            values[channel * plane + offset] = value as f32 / 255.0;
        }
    }
    Tensor::from_vec(&[3, height, width], values, Device::Cpu)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgb, RgbImage};

    use super::{STYLE_EDGE, load_style_image};

    fn write_test_image(stem: &str, width: u32, height: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "stylecast-style-{}-{stem}.png",
            std::process::id()
        ));
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(&path).expect("test image saves");
        path
    }

    #[test]
    fn non_square_images_become_fixed_size_chw_tensors() {
        let path = write_test_image("landscape", 640, 360);
        let tensor = load_style_image(&path).expect("style image loads");
        assert_eq!(
            tensor.shape(),
            &[3, STYLE_EDGE as usize, STYLE_EDGE as usize]
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn values_are_normalized_to_unit_range() {
        let path = write_test_image("range", 64, 64);
        let tensor = load_style_image(&path).expect("style image loads");
        assert!(tensor.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_image_names_the_path() {
        let err = load_style_image(std::path::Path::new("styles/absent.png"))
            .expect_err("image is absent");
        assert!(err.to_string().contains("absent.png"));
    }
}
