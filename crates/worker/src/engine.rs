//! The render engine seam.

use async_trait::async_trait;
use cfa_comfyui::renderer::{ComfyUIRenderer, RenderError};
use cfa_comfyui::workflow::Txt2ImgParams;
use cfa_core::error::CoreError;
use cfa_core::job::Job;

/// Something that turns txt2img parameters into PNG images.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Render and return every produced image. Blocks until the engine
    /// reports completion.
    async fn render(&self, params: &Txt2ImgParams) -> Result<Vec<Vec<u8>>, RenderError>;
}

#[async_trait]
impl RenderEngine for ComfyUIRenderer {
    async fn render(&self, params: &Txt2ImgParams) -> Result<Vec<Vec<u8>>, RenderError> {
        ComfyUIRenderer::render(self, params).await
    }
}

/// Build render parameters for `job` using the resolved `checkpoint`.
pub fn txt2img_params(job: &Job, checkpoint: &str, seed: u64) -> Result<Txt2ImgParams, CoreError> {
    let resolution = job.parsed_resolution()?;
    Ok(Txt2ImgParams {
        checkpoint: checkpoint.to_string(),
        prompt: job.prompt.clone(),
        negative_prompt: job.negative_prompt.clone().unwrap_or_default(),
        width: resolution.width,
        height: resolution.height,
        batch_size: job.batch_size,
        steps: job.steps,
        cfg: job.guidance_scale,
        seed,
    })
}
