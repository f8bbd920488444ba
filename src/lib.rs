//! Reads a digit clock (minutes and seconds) off a live video feed.
//!
//! Frames are widened, sharpened and contrast stretched ([`enhance`]), two
//! fixed regions are cut out ([`region`]), and each region goes through a
//! [`Recognizer`] restricted to digits. Results are sanitized, drawn back onto
//! the frame ([`annotate`]) and shown by the control loop in [`pipeline`].
//!
//! [`OcrEngine`] is the bundled recognizer: an onnx DB-net detector, an
//! optional angle classifier and a CRNN line recognizer.

use std::path::PathBuf;

use angle_net::AngleNet;
use crnn_net::CrnnNet;
use dbnet::DbNet;

mod angle_net;
pub mod annotate;
pub mod capture;
pub mod clock;
pub mod config;
mod crnn_net;
#[cfg(feature = "highgui")]
mod cv;
pub mod dbnet;
pub mod display;
pub mod enhance;
mod error;
pub mod pipeline;
pub mod region;
mod result;
pub mod sanitize;
mod session;
pub mod util;

use image::{DynamicImage, GrayImage};
use tracing::instrument;
use util::{part_image, scale_normalized};

pub use error::{Error, Result};
pub use ort as runtime;
pub use result::*;

/// Digits only.
pub const DIGITS: &str = "0123456789";

/// Text recognition over a single region.
pub trait Recognizer {
    /// Detections in `image`, restricted to characters in `allowlist`, in the
    /// engine's scan order.
    fn recognize(&mut self, image: &GrayImage, allowlist: &str) -> Result<Vec<Detection>>;
}

impl<R: Recognizer + ?Sized> Recognizer for &mut R {
    fn recognize(&mut self, image: &GrayImage, allowlist: &str) -> Result<Vec<Detection>> {
        (**self).recognize(image, allowlist)
    }
}

pub struct OcrEngineBuilder {
    threads: usize,
    det_path: Option<PathBuf>,
    cls_path: Option<PathBuf>,
    rec_paths: Option<(PathBuf, PathBuf)>,
    max_side_len: u32,
    most_angle: bool,
    cache_path: Option<PathBuf>,
    execution_providers: Vec<ExecutionProvider>,
    options: DetectionOptions,
}

impl OcrEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = Some(path.into());
        self
    }

    pub fn cls_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.cls_path = Some(path.into());
        self
    }

    pub fn rec_model(
        mut self,
        model_path: impl Into<PathBuf>,
        keys_path: impl Into<PathBuf>,
    ) -> Self {
        self.rec_paths = Some((model_path.into(), keys_path.into()));
        self
    }

    pub fn most_angle(mut self, most_angle: bool) -> Self {
        self.most_angle = most_angle;
        self
    }

    pub fn max_side_len(mut self, max_side_len: u32) -> Self {
        self.max_side_len = max_side_len;
        self
    }

    pub fn with_engine_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_execution_providers(
        mut self,
        providers: impl IntoIterator<Item = ExecutionProvider>,
    ) -> Self {
        self.execution_providers = providers.into_iter().collect();
        self
    }

    /// Options used by [`Recognizer::recognize`].
    pub fn with_detection_options(mut self, options: DetectionOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<OcrEngine> {
        let det_path = self
            .det_path
            .unwrap_or_else(|| "models/det.onnx".into());
        let (rec_path, keys_path) = self
            .rec_paths
            .unwrap_or_else(|| ("models/rec.onnx".into(), "models/keys.txt".into()));
        let cache_path = self.cache_path.as_deref();

        let det_model = DbNet::init(
            &det_path,
            self.threads,
            self.max_side_len,
            &self.execution_providers,
            cache_path,
        )?;
        let cls_model = self
            .cls_path
            .as_deref()
            .map(|path| AngleNet::init(path, self.threads, &self.execution_providers, cache_path))
            .transpose()?;
        let rec_model = CrnnNet::init(
            &rec_path,
            &keys_path,
            self.threads,
            &self.execution_providers,
            cache_path,
        )?;

        Ok(OcrEngine {
            det_model,
            cls_model,
            rec_model,
            max_side_len: self.max_side_len,
            most_angle: self.most_angle,
            options: self.options,
        })
    }
}

impl Default for OcrEngineBuilder {
    fn default() -> Self {
        Self {
            threads: 4,
            det_path: None,
            cls_path: None,
            rec_paths: None,
            max_side_len: 1024,
            most_angle: false,
            cache_path: None,
            execution_providers: DEFAULT_PROVIDERS.to_vec(),
            options: DetectionOptions::default(),
        }
    }
}

pub struct OcrEngine {
    det_model: DbNet,
    cls_model: Option<AngleNet>,
    rec_model: CrnnNet,
    max_side_len: u32,
    most_angle: bool,
    options: DetectionOptions,
}

impl OcrEngine {
    #[instrument(skip(self, image))]
    pub fn detect(
        &self,
        image: &DynamicImage,
        options: DetectionOptions,
        allowlist: &str,
    ) -> Result<Vec<Detection>> {
        let DetectionOptions {
            max_side_len,
            box_threshold,
            box_score_threshold,
            unclip_ratio,
        } = options;
        let max_side_len = if max_side_len != 0 {
            max_side_len
        } else {
            self.max_side_len
        };
        let scale = scale_normalized(image, max_side_len);
        let boxes = self.det_model.get_text_boxes(
            image,
            scale,
            box_score_threshold,
            box_threshold,
            unclip_ratio,
        )?;

        let (boxes, mut part_images): (Vec<_>, Vec<_>) = boxes
            .into_iter()
            .filter_map(|it| {
                let part = part_image(image, &it.rect)?;
                Some((it, part))
            })
            .unzip();

        if let Some(angle_net) = &self.cls_model {
            let angles = angle_net.get_angles(&part_images, self.most_angle)?;
            for (part, angle) in part_images.iter_mut().zip(angles) {
                if angle.index == 1 {
                    *part = part.rotate180();
                }
            }
        }

        let text_lines = self.rec_model.get_text_lines(&part_images, allowlist)?;

        Ok(boxes
            .into_iter()
            .zip(text_lines)
            .filter(|(_, line)| !line.text.is_empty())
            .filter_map(|(bounds, line)| {
                Some(Detection::new(
                    Quad::bounding(&bounds.rect)?,
                    line.text.clone(),
                    line.confidence(),
                ))
            })
            .collect())
    }
}

impl Recognizer for OcrEngine {
    fn recognize(&mut self, image: &GrayImage, allowlist: &str) -> Result<Vec<Detection>> {
        let image = DynamicImage::ImageLuma8(image.clone());
        self.detect(&image, self.options, allowlist)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    /// Longest detector input side; 0 uses the engine's setting.
    pub max_side_len: u32,
    pub box_score_threshold: f32,
    pub box_threshold: f32,
    pub unclip_ratio: f32,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_side_len: 0,
            box_score_threshold: 0.5,
            box_threshold: 0.3,
            unclip_ratio: 1.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Default,
    #[cfg(feature = "tensorrt")]
    TensorRT,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "directml")]
    DirectML,
}

const DEFAULT_PROVIDERS: &[ExecutionProvider] = &[
    #[cfg(feature = "tensorrt")]
    ExecutionProvider::TensorRT,
    #[cfg(feature = "coreml")]
    ExecutionProvider::CoreML,
    #[cfg(feature = "directml")]
    ExecutionProvider::DirectML,
    #[cfg(feature = "cuda")]
    ExecutionProvider::Cuda,
    ExecutionProvider::Default,
];
