use std::path::{Path, PathBuf};

use clockocr::{
    capture::Camera, config::PipelineConfig, display::HighGui, pipeline, OcrEngineBuilder,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() -> clockocr::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cache = PathBuf::from(".cache");
    std::fs::create_dir_all(&cache)?;

    let mut builder = OcrEngineBuilder::new()
        .det_model("models/det.onnx")
        .rec_model("models/rec.onnx", "models/keys.txt")
        .with_engine_cache_path(cache);
    if Path::new("models/cls.onnx").exists() {
        builder = builder.cls_model("models/cls.onnx");
    }
    let engine = builder.build()?;

    let config = PipelineConfig::default();
    let camera = Camera::open(config.device_index)?;

    let summary = pipeline::run(
        camera,
        engine,
        HighGui::new(),
        &config,
        std::io::stdout().lock(),
    )?;
    log::info!("{summary:?}");
    Ok(())
}
