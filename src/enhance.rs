//! Frame enhancement: horizontal stretch, unsharp mask, contrast stretch and
//! grayscale conversion.

use image::{imageops, imageops::FilterType, GrayImage, Luma, Pixel, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::instrument;

use crate::config::EnhanceConfig;

/// Output of [`enhance`].
#[derive(Debug, Clone)]
pub struct Enhanced {
    /// The stretched input frame; overlays are drawn onto this.
    pub resized: RgbImage,
    pub sharpened: RgbImage,
    /// Single channel, fed to region cropping and recognition.
    pub contrasted: GrayImage,
}

#[instrument(level = "debug", skip(frame))]
pub fn enhance(frame: &RgbImage, config: &EnhanceConfig) -> Enhanced {
    let width = (frame.width() as f32 * config.resize_factor) as u32;
    let resized = imageops::resize(frame, width.max(1), frame.height(), FilterType::Triangle);

    let blur = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(&resized, config.blur_sigma)
    } else {
        resized.clone()
    };
    let sharpened = add_weighted(
        &resized,
        config.frame_weight,
        &blur,
        config.blur_weight,
        0.0,
    );
    let contrasted = add_weighted(
        &sharpened,
        config.contrast_gain,
        &sharpened,
        0.0,
        config.contrast_bias,
    );

    Enhanced {
        contrasted: to_gray(&contrasted),
        resized,
        sharpened,
    }
}

/// Per channel `a * alpha + b * beta + gamma`, rounded and saturated to
/// `0..=255`. Both images must share dimensions.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32, gamma: f32) -> RgbImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    RgbImage::from_fn(a.width(), a.height(), |x, y| {
        let (pa, pb) = (a.get_pixel(x, y), b.get_pixel(x, y));
        pa.map2(pb, |ca, cb| saturate(ca as f32 * alpha + cb as f32 * beta + gamma))
    })
}

/// BT.601 luma, the weighting video capture devices deliver.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([saturate(
            0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32,
        )])
    })
}

fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn black_frame_is_widened_and_stays_black() {
        let frame = RgbImage::new(640, 480);
        let out = enhance(&frame, &EnhanceConfig::default());
        assert_eq!(out.resized.dimensions(), (960, 480));
        assert_eq!(out.sharpened.dimensions(), (960, 480));
        assert_eq!(out.contrasted.dimensions(), (960, 480));
        assert!(out.contrasted.pixels().all(|p| p.0 == [0]));
    }

    #[test]
    fn contrast_stretch_is_clipped_linear_map_of_sharpened() {
        for v in [0u8, 40, 90, 128, 200, 255] {
            let frame = RgbImage::from_pixel(64, 32, Rgb([v, v, v]));
            let out = enhance(&frame, &EnhanceConfig::default());

            let sharp = out.sharpened.get_pixel(0, 0).0[0];
            assert!(out.sharpened.pixels().all(|p| p.0 == [sharp; 3]));

            let expected = (4.0 * sharp as f32 - 127.0).clamp(0.0, 255.0) as u8;
            assert!(
                out.contrasted.pixels().all(|p| p.0 == [expected]),
                "input {v}: expected {expected}"
            );
        }
    }

    #[test]
    fn add_weighted_saturates() {
        let a = RgbImage::from_pixel(1, 1, Rgb([100, 10, 250]));
        let out = add_weighted(&a, 4.0, &a, 0.0, -127.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 255]);
    }

    #[test]
    fn gray_uses_bt601_weights() {
        let image = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(to_gray(&image).get_pixel(0, 0).0, [76]);
        let image = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert_eq!(to_gray(&image).get_pixel(0, 0).0, [150]);
    }
}
