use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::Session;

/// Preferred ONNX execution providers for the current platform.
///
/// ONNX Runtime falls back to CPU when a listed provider is unavailable.
fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Loads an ONNX model into a session using the platform's preferred providers.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let providers = preferred_execution_providers();
    log::info!(
        "Loading {} with {} accelerated execution provider(s)",
        model_path.display(),
        providers.len()
    );
    let session = Session::builder()?
        .with_execution_providers(providers)?
        .commit_from_file(model_path)?;
    Ok(session)
}
