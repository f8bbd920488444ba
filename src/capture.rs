//! Frame sources.

use std::collections::VecDeque;

use image::RgbImage;

use crate::Result;

/// Produces frames on demand.
pub trait FrameSource {
    /// The next frame, or `None` once the stream has ended. Device failures
    /// are errors.
    fn read(&mut self) -> Result<Option<RgbImage>>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        (**self).read()
    }
}

/// Replays frames that are already in memory.
#[derive(Debug, Default, Clone)]
pub struct FrameSequence {
    frames: VecDeque<RgbImage>,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Loads every path in order.
    pub fn open<P: AsRef<std::path::Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let frames = paths
            .into_iter()
            .map(|path| Ok(image::open(path)?.to_rgb8()))
            .collect::<Result<VecDeque<_>>>()?;
        Ok(Self { frames })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameSequence {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(feature = "highgui")]
pub use camera::Camera;

#[cfg(feature = "highgui")]
mod camera {
    use image::RgbImage;
    use opencv::{core::Mat, prelude::*, videoio};
    use tracing::instrument;

    use super::FrameSource;
    use crate::{cv::mat_to_rgb, Error, Result};

    /// A capture device opened through OpenCV. Released on drop.
    pub struct Camera {
        index: i32,
        capture: videoio::VideoCapture,
    }

    impl Camera {
        #[instrument]
        pub fn open(index: i32) -> Result<Self> {
            let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(Error::CameraUnavailable(index));
            }
            log::info!("Opened capture device {index}");
            Ok(Self { index, capture })
        }
    }

    impl FrameSource for Camera {
        fn read(&mut self) -> Result<Option<RgbImage>> {
            let mut frame = Mat::default();
            if !self.capture.read(&mut frame)? || frame.empty() {
                return Ok(None);
            }
            mat_to_rgb(&frame).map(Some)
        }
    }

    impl Drop for Camera {
        fn drop(&mut self) {
            match self.capture.release() {
                Ok(()) => log::info!("Released capture device {}", self.index),
                Err(e) => log::warn!("Failed to release capture device {}: {e}", self.index),
            }
        }
    }
}
