//! Client for the ComfyUI render engine.
//!
//! Provides the txt2img prompt-graph builder, HTTP API wrappers
//! (submit, history, image download), WebSocket connection and typed
//! message parsing, and [`renderer::ComfyUIRenderer`] which strings them
//! together into a single blocking render call.

pub mod api;
pub mod client;
pub mod history;
pub mod messages;
pub mod processor;
pub mod renderer;
pub mod workflow;
