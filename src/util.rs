use geo::{
    point, Area, BoundingRect, Contains, Coord, EuclideanLength, HasDimensions, LineString,
    MinimumRotatedRect, Polygon, Translate,
};
use geo_clipper::{Clipper, EndType, JoinType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use imageproc::point::Point;
use ndarray::{s, Array3, ArrayView2, Axis};
use tracing::instrument;

/// Converts `image` into a CHW tensor of `(pixel - mean) * norm`, with pixels
/// in `0.0..=1.0`.
#[instrument(level = "debug", skip(image))]
pub(crate) fn subtract_mean_normalize(
    image: &DynamicImage,
    mean_vals: &[f32; 3],
    norm_vals: &[f32; 3],
) -> Array3<f32> {
    let image = image.to_rgb32f();
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| {
            let value = image.get_pixel(x as u32, y as u32).0[ch];
            (value - mean_vals[ch]) * norm_vals[ch]
        },
    )
}

/// Renders a probability map (`0.0..=1.0`) as an 8 bit image.
pub(crate) fn to_luma_image(data: ArrayView2<f32>) -> GrayImage {
    let height = data.len_of(Axis(0));
    let width = data.len_of(Axis(1));
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let p = data[[y as usize, x as usize]];
        Luma([(p * 255.0).clamp(0.0, 255.0) as u8])
    })
}

pub(crate) fn to_geo_poly(points: &[Point<i32>]) -> Polygon<f32> {
    let points = points
        .iter()
        .map(|point| Coord {
            x: point.x as f32,
            y: point.y as f32,
        })
        .collect();
    Polygon::new(LineString::new(points), vec![])
}

pub(crate) fn max_side(rect: &Polygon<f32>) -> f32 {
    rect.exterior()
        .lines()
        .map(|it| it.euclidean_length())
        .fold(0.0, f32::max)
}

/// Mean probability inside `rect`. Parts of the rect outside the map are
/// ignored.
pub(crate) fn box_score_fast(rect: &Polygon<f32>, pred_data: ArrayView2<f32>) -> f32 {
    let Some(bounds) = rect.bounding_rect() else {
        return 0.0;
    };
    let (height, width) = pred_data.dim();
    let clamp = |v: f32, limit: usize| (v.max(0.0) as usize).min(limit);
    let (x0, x1) = (clamp(bounds.min().x, width), clamp(bounds.max().x.ceil(), width));
    let (y0, y1) = (clamp(bounds.min().y, height), clamp(bounds.max().y.ceil(), height));
    if x0 >= x1 || y0 >= y1 {
        return 0.0;
    }

    let sliced = pred_data.slice(s![y0..y1, x0..x1]);
    let local_rect = rect.translate(-(x0 as f32), -(y0 as f32));

    let (sum, count) = sliced
        .indexed_iter()
        .filter(|((y, x), _)| local_rect.contains(&point![x: *x as f32, y: *y as f32]))
        .fold((0.0f32, 0usize), |(sum, count), (_, value)| {
            (sum + *value, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Grows a detected box outwards by an amount proportional to its area over
/// its perimeter, so the box covers the whole glyph rather than its core.
pub(crate) fn unclip(rect: Polygon<f32>, unclip_ratio: f32) -> Option<Polygon<f32>> {
    let perimeter = rect.exterior().euclidean_length();
    if perimeter <= 0.0 {
        return None;
    }
    let distance = rect.unsigned_area() * unclip_ratio / perimeter;

    let grown = rect.offset(distance, JoinType::Round(0.25), EndType::ClosedPolygon, 1.0);

    if grown.is_empty() {
        None
    } else {
        grown.minimum_rotated_rect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor_x: f32,
    pub factor_y: f32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Picks the detector input size: longest side capped at `target_size`,
/// both sides floored to a multiple of 32 (minimum 32).
pub fn scale_normalized(image: &DynamicImage, target_size: u32) -> Scale {
    let (width, height) = image.dimensions();
    let aspect_ratio = width as f32 / height.max(1) as f32;
    let (target_width, target_height) = if aspect_ratio >= 1.0 {
        let w = width.min(target_size);
        (w, (w as f32 / aspect_ratio) as u32)
    } else {
        let h = height.min(target_size);
        ((h as f32 * aspect_ratio) as u32, h)
    };
    let floor32 = |side: u32| (side / 32 * 32).max(32);
    let (target_width, target_height) = (floor32(target_width), floor32(target_height));

    let factor_x = width as f32 / target_width as f32;
    let factor_y = height as f32 / target_height as f32;
    log::debug!(
        "Detector input (w: {width}, h: {height}) -> (w: {target_width}, h: {target_height}), scale ({factor_x}, {factor_y})."
    );
    Scale {
        target_width,
        target_height,
        factor_x,
        factor_y,
    }
}

/// Crops the axis aligned bounds of `b_box`, clamped to the image.
pub(crate) fn part_image(image: &DynamicImage, b_box: &Polygon<f32>) -> Option<DynamicImage> {
    let rect = b_box.bounding_rect()?;
    let x = (rect.min().x.max(0.0) as u32).min(image.width());
    let y = (rect.min().y.max(0.0) as u32).min(image.height());
    let width = (rect.width() as u32).min(image.width() - x);
    let height = (rect.height() as u32).min(image.height() - y);
    if width == 0 || height == 0 {
        return None;
    }
    log::trace!("Slicing part image at ({x}, {y}) size {width}x{height}");
    Some(image.crop_imm(x, y, width, height))
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use image::GrayImage;
    use ndarray::Array2;

    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Polygon<f32> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    #[test]
    fn scale_floors_to_multiples_of_32() {
        let image = DynamicImage::ImageLuma8(GrayImage::new(125, 150));
        let scale = scale_normalized(&image, 1024);
        assert_eq!(scale.target_width, 96);
        assert_eq!(scale.target_height, 128);
        assert!((scale.factor_x - 125.0 / 96.0).abs() < 1e-6);
    }

    #[test]
    fn tiny_images_scale_to_minimum_input() {
        let image = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let scale = scale_normalized(&image, 1024);
        assert_eq!((scale.target_width, scale.target_height), (32, 32));
    }

    #[test]
    fn box_score_ignores_out_of_range_area() {
        let pred = Array2::<f32>::from_elem((10, 10), 0.8);
        let score = box_score_fast(&square(5.0, 5.0, 20.0, 20.0), pred.view());
        assert!((score - 0.8).abs() < 1e-6);

        let outside = box_score_fast(&square(30.0, 30.0, 40.0, 40.0), pred.view());
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn unclip_grows_the_box() {
        let rect = square(10.0, 10.0, 30.0, 20.0);
        let grown = unclip(rect.clone(), 1.6).unwrap();
        assert!(grown.unsigned_area() > rect.unsigned_area());
    }

    #[test]
    fn normalize_uses_channel_first_layout() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([255])));
        let tensor = subtract_mean_normalize(&image, &[0.5; 3], &[2.0; 3]);
        assert_eq!(tensor.dim(), (3, 2, 4));
        assert!(tensor.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn part_image_is_clamped_to_bounds() {
        let image = DynamicImage::ImageLuma8(GrayImage::new(20, 20));
        let part = part_image(&image, &square(15.0, 15.0, 40.0, 40.0)).unwrap();
        assert_eq!((part.width(), part.height()), (5, 5));
        assert!(part_image(&image, &square(25.0, 25.0, 40.0, 40.0)).is_none());
    }
}
