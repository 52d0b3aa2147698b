//! One-call rendering against a ComfyUI instance.

use crate::api::{ComfyUIApi, ComfyUIApiError};
use crate::client::{ComfyUIClient, ComfyUIClientError};
use crate::history::output_images;
use crate::processor::{wait_for_completion, CompletionError};
use crate::workflow::{txt2img, Txt2ImgParams};

/// Errors from a complete render round-trip.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Connect(#[from] ComfyUIClientError),

    #[error(transparent)]
    Api(#[from] ComfyUIApiError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Submits txt2img graphs and collects the resulting PNG bytes.
#[derive(Clone)]
pub struct ComfyUIRenderer {
    client: ComfyUIClient,
    api: ComfyUIApi,
}

impl ComfyUIRenderer {
    /// Renderer for a ComfyUI server at `host:port` (plain HTTP/WS).
    pub fn new(server_address: &str) -> Self {
        let address = server_address
            .trim_start_matches("http://")
            .trim_end_matches('/');
        Self {
            client: ComfyUIClient::new(format!("ws://{address}")),
            api: ComfyUIApi::new(format!("http://{address}")),
        }
    }

    /// Render one job and return every output image, in node order.
    ///
    /// The WebSocket is opened before submission so the completion
    /// frame cannot be missed. Blocks until ComfyUI reports the prompt
    /// finished; there is no timeout or cancellation.
    pub async fn render(&self, params: &Txt2ImgParams) -> Result<Vec<Vec<u8>>, RenderError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let mut conn = self.client.connect(&client_id).await?;

        let workflow = txt2img(params);
        let submitted = self.api.submit_workflow(&workflow, &conn.client_id).await?;
        tracing::info!(
            prompt_id = %submitted.prompt_id,
            queue_position = submitted.number,
            checkpoint = %params.checkpoint,
            "Prompt queued on ComfyUI",
        );

        let waited = wait_for_completion(&mut conn.ws_stream, &submitted.prompt_id).await;
        if let Err(e) = conn.ws_stream.close(None).await {
            tracing::debug!(error = %e, "Error closing ComfyUI socket");
        }
        waited?;

        let history = self.api.get_history(&submitted.prompt_id).await?;
        let images = output_images(&history, &submitted.prompt_id);

        let mut outputs = Vec::with_capacity(images.len());
        for image in &images {
            outputs.push(self.api.view_image(image).await?);
        }

        tracing::info!(
            prompt_id = %submitted.prompt_id,
            images = outputs.len(),
            "Render finished",
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_normalisation() {
        let r = ComfyUIRenderer::new("127.0.0.1:8188/");
        assert_eq!(r.client.ws_url(), "ws://127.0.0.1:8188");
        assert_eq!(r.api.api_url(), "http://127.0.0.1:8188");

        let r = ComfyUIRenderer::new("http://gpu-1:8188");
        assert_eq!(r.api.api_url(), "http://gpu-1:8188");
    }
}
