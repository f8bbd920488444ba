use std::path::{Path, PathBuf};

use ort::{ExecutionProviderDispatch, GraphOptimizationLevel, Session};
use tracing::instrument;

use crate::ExecutionProvider;

/// Input shapes an engine-building provider should optimise for, in
/// `name:NxCxHxW` form.
#[derive(Debug, Clone)]
pub(crate) struct ShapeProfile {
    pub min: String,
    pub opt: String,
    pub max: String,
}

#[cfg(feature = "tensorrt")]
fn setup_tensorrt(cache_path: PathBuf, profile: &ShapeProfile) -> ExecutionProviderDispatch {
    use ort::TensorRTExecutionProvider;

    TensorRTExecutionProvider::default()
        .with_profile_min_shapes(profile.min.clone())
        .with_profile_max_shapes(profile.max.clone())
        .with_profile_opt_shapes(profile.opt.clone())
        .with_engine_cache(true)
        .with_engine_cache_path(cache_path.to_string_lossy())
        .with_timing_cache(true)
        .with_builder_optimization_level(5)
        .build()
}

#[cfg(feature = "cuda")]
fn setup_cuda() -> ExecutionProviderDispatch {
    use ort::CUDAExecutionProvider;

    CUDAExecutionProvider::default().build()
}

#[cfg(feature = "coreml")]
fn setup_coreml() -> ExecutionProviderDispatch {
    use ort::CoreMLExecutionProvider;

    CoreMLExecutionProvider::default().build()
}

#[cfg(feature = "directml")]
fn setup_directml() -> ExecutionProviderDispatch {
    use ort::DirectMLExecutionProvider;

    DirectMLExecutionProvider::default().build()
}

/// Opens an onnx session for `path` on the first usable provider in
/// `execution_providers`, falling back to the CPU.
#[cfg_attr(not(feature = "tensorrt"), allow(unused_variables))]
#[instrument(level = "debug", skip(profile))]
pub(crate) fn build_session(
    path: &Path,
    num_threads: usize,
    execution_providers: &[ExecutionProvider],
    cache_path: Option<&Path>,
    profile: &ShapeProfile,
) -> ort::Result<Session> {
    // DirectML can't run sessions with parallel execution or memory patterns.
    #[cfg(feature = "directml")]
    let parallel = !execution_providers.contains(&ExecutionProvider::DirectML);
    #[cfg(not(feature = "directml"))]
    let parallel = true;

    let dispatch = execution_providers
        .iter()
        .filter_map(|provider| -> Option<ExecutionProviderDispatch> {
            match provider {
                ExecutionProvider::Default => None,
                #[cfg(feature = "tensorrt")]
                ExecutionProvider::TensorRT => Some(setup_tensorrt(
                    engine_cache_dir(path, cache_path),
                    profile,
                )),
                #[cfg(feature = "coreml")]
                ExecutionProvider::CoreML => Some(setup_coreml()),
                #[cfg(feature = "cuda")]
                ExecutionProvider::Cuda => Some(setup_cuda()),
                #[cfg(feature = "directml")]
                ExecutionProvider::DirectML => Some(setup_directml()),
            }
        })
        .collect::<Vec<_>>();

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_memory_pattern(parallel)?
        .with_parallel_execution(parallel)?
        .with_inter_threads(num_threads)?
        .with_intra_threads(num_threads)?
        .with_execution_providers(dispatch)?
        .commit_from_file(path)?;

    log::debug!("{path:?} inputs: {:?}", session.inputs);
    log::debug!("{path:?} outputs: {:?}", session.outputs);

    Ok(session)
}

#[cfg_attr(not(feature = "tensorrt"), allow(dead_code))]
fn engine_cache_dir(model_path: &Path, cache_path: Option<&Path>) -> PathBuf {
    match cache_path {
        Some(path) => path.to_path_buf(),
        None => model_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".cache"),
    }
}
