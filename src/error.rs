use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unexpected model output shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read recognition keys from {path:?}")]
    KeysFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("region `{region}` does not fit inside a {width}x{height} image")]
    RegionOutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },
    #[error("capture device {0} could not be opened")]
    CameraUnavailable(i32),
    #[error("unsupported frame: {0}")]
    UnsupportedFrame(String),
    #[cfg(feature = "highgui")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}
