//! Reads ComfyUI WebSocket frames until one prompt finishes.

use futures::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::messages::{parse_message, ComfyUIMessage};

/// How watching a prompt ended, other than success.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// ComfyUI reported an execution error for the prompt.
    #[error("Execution failed in node {node}: {message}")]
    ExecutionFailed { node: String, message: String },

    /// The prompt was interrupted on the ComfyUI side.
    #[error("Execution interrupted")]
    Interrupted,

    /// The socket closed or errored before the prompt finished.
    #[error("Connection lost before completion: {0}")]
    ConnectionLost(String),
}

/// Consume frames until `prompt_id` completes.
///
/// There is no timeout: the caller blocks for as long as the engine
/// takes. Frames about other prompts, binary preview frames and
/// unparseable frames are skipped.
pub async fn wait_for_completion<S>(ws_stream: &mut S, prompt_id: &str) -> Result<(), CompletionError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = ws_stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                return Err(CompletionError::ConnectionLost(format!("closed: {frame:?}")));
            }
            // Previews, pings and raw frames.
            Ok(_) => continue,
            Err(e) => return Err(CompletionError::ConnectionLost(e.to_string())),
        };

        let msg = match parse_message(&text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::trace!(error = %e, "Ignoring unrecognised ComfyUI frame");
                continue;
            }
        };

        if msg.is_completion_of(prompt_id) {
            tracing::debug!(prompt_id, "Prompt execution complete");
            return Ok(());
        }

        match msg {
            ComfyUIMessage::ExecutionError(data) if data.prompt_id == prompt_id => {
                return Err(CompletionError::ExecutionFailed {
                    node: data.node_id.unwrap_or_default(),
                    message: data.exception_message,
                });
            }
            ComfyUIMessage::ExecutionInterrupted(data) if data.prompt_id == prompt_id => {
                return Err(CompletionError::Interrupted);
            }
            ComfyUIMessage::Progress(data) => {
                tracing::trace!(prompt_id, value = data.value, max = data.max, "Render progress");
            }
            ComfyUIMessage::ExecutionStart(data) if data.prompt_id == prompt_id => {
                tracing::debug!(prompt_id, "Prompt execution started");
            }
            _ => {}
        }
    }

    Err(CompletionError::ConnectionLost("stream ended".into()))
}
