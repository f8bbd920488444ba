//! Fixed regions of interest and the crop that cuts them out.

use std::ops::Range;

use image::{imageops, GrayImage};

use crate::{Error, Result};

/// A named rectangle given as half-open row and column ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropRect {
    pub name: String,
    pub rows: Range<u32>,
    pub cols: Range<u32>,
}

impl CropRect {
    pub fn new(name: impl Into<String>, rows: Range<u32>, cols: Range<u32>) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
        }
    }

    pub fn width(&self) -> u32 {
        self.cols.end.saturating_sub(self.cols.start)
    }

    pub fn height(&self) -> u32 {
        self.rows.end.saturating_sub(self.rows.start)
    }

    /// Top-left corner as `(x, y)` in frame coordinates.
    pub fn origin(&self) -> (u32, u32) {
        (self.cols.start, self.rows.start)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.cols.start < self.cols.end
            && self.rows.start < self.rows.end
            && self.cols.end <= width
            && self.rows.end <= height
    }
}

/// Copies `rect` out of `image`. Rectangles that are empty or reach past the
/// image are rejected rather than truncated.
pub fn crop(image: &GrayImage, rect: &CropRect) -> Result<GrayImage> {
    if !rect.fits_within(image.width(), image.height()) {
        return Err(Error::RegionOutOfBounds {
            region: rect.name.clone(),
            width: image.width(),
            height: image.height(),
        });
    }
    let (x, y) = rect.origin();
    Ok(imageops::crop_imm(image, x, y, rect.width(), rect.height()).to_image())
}
