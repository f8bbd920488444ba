//! Conversions between OpenCV matrices (BGR) and `image` buffers (RGB).

use image::{GrayImage, RgbImage};
use opencv::{
    core::{self, Mat, Scalar},
    prelude::*,
};

use crate::{Error, Result};

pub(crate) fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.typ() != core::CV_8UC3 {
        return Err(Error::UnsupportedFrame(format!(
            "expected an 8 bit, 3 channel frame, got type {}",
            mat.typ()
        )));
    }
    let (width, height) = (mat.cols() as u32, mat.rows() as u32);

    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let rgb = mat
        .data_bytes()?
        .chunks_exact(3)
        .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
        .collect::<Vec<u8>>();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::UnsupportedFrame("frame buffer is shorter than its size".into()))
}

pub(crate) fn rgb_to_mat(image: &RgbImage) -> Result<Mat> {
    let bgr = image
        .pixels()
        .flat_map(|p| {
            let [r, g, b] = p.0;
            [b, g, r]
        })
        .collect::<Vec<u8>>();
    filled_mat(image.width(), image.height(), core::CV_8UC3, &bgr)
}

pub(crate) fn gray_to_mat(image: &GrayImage) -> Result<Mat> {
    filled_mat(image.width(), image.height(), core::CV_8UC1, image.as_raw())
}

fn filled_mat(width: u32, height: u32, typ: i32, bytes: &[u8]) -> Result<Mat> {
    let mut mat =
        Mat::new_rows_cols_with_default(height as i32, width as i32, typ, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(bytes);
    Ok(mat)
}
