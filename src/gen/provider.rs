use std::path::PathBuf;

use tracing::info;

use crate::session::GenerationPlan;

/// Failure reported by the image-synthesis provider.
#[derive(Debug, Clone)]
pub struct GenerationError(pub String);

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for GenerationError {}

/// One request to the external provider: identity anchors, an optional
/// pose/lighting reference and one prompt per output frame.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub ref_paths: Vec<String>,
    pub style_path: Option<PathBuf>,
    pub prompts: Vec<String>,
}

impl From<GenerationPlan> for GenerationRequest {
    fn from(plan: GenerationPlan) -> Self {
        GenerationRequest {
            ref_paths: plan.ref_paths,
            style_path: plan.style_path,
            prompts: plan.prompts.into_iter().collect(),
        }
    }
}

/// Hands the request to the image-synthesis provider and returns up to
/// one JPEG per prompt. An empty result means no provider is configured.
///
/// No provider is wired up yet, so this logs the request and reports
/// "not configured". Callers already time-box the call and treat empty
/// and `Err` results identically.
pub async fn run_generation(
    request: &GenerationRequest,
) -> Result<Vec<Vec<u8>>, GenerationError> {
    info!(
        refs = request.ref_paths.len(),
        has_style = request.style_path.is_some(),
        prompts = request.prompts.len(),
        "Generation requested, but no provider is configured"
    );
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_provider_returns_empty_result() {
        let request = GenerationRequest {
            ref_paths: vec!["a.jpg".to_string()],
            style_path: None,
            prompts: crate::gen::prompts::build_internal_prompts(None).to_vec(),
        };
        let images = run_generation(&request).await.expect("stub never fails");
        assert!(images.is_empty());
    }
}
