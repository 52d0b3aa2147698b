//! Text-to-image prompt graph.
//!
//! Builds the minimal ComfyUI API-format graph: checkpoint loader,
//! positive and negative text encoders, empty latent, KSampler, VAE
//! decode and save.

use serde_json::{json, Value};

/// Sampler used for every job.
pub const SAMPLER_NAME: &str = "euler";
/// Noise schedule used for every job.
pub const SCHEDULER: &str = "normal";
/// Prefix of files ComfyUI writes for our outputs.
pub const FILENAME_PREFIX: &str = "cfa";

/// Everything the graph needs from a resolved job.
#[derive(Debug, Clone, PartialEq)]
pub struct Txt2ImgParams {
    /// Checkpoint path relative to ComfyUI's checkpoint folder.
    pub checkpoint: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub batch_size: u32,
    pub steps: u32,
    pub cfg: f64,
    pub seed: u64,
}

// Node ids are arbitrary but must be consistent across links.
const NODE_SAMPLER: &str = "3";
const NODE_CHECKPOINT: &str = "4";
const NODE_LATENT: &str = "5";
const NODE_POSITIVE: &str = "6";
const NODE_NEGATIVE: &str = "7";
const NODE_DECODE: &str = "8";
const NODE_SAVE: &str = "9";

/// Build the API-format graph for one txt2img render.
pub fn txt2img(params: &Txt2ImgParams) -> Value {
    json!({
        NODE_SAMPLER: {
            "class_type": "KSampler",
            "inputs": {
                "cfg": params.cfg,
                "denoise": 1,
                "latent_image": [NODE_LATENT, 0],
                "model": [NODE_CHECKPOINT, 0],
                "negative": [NODE_NEGATIVE, 0],
                "positive": [NODE_POSITIVE, 0],
                "sampler_name": SAMPLER_NAME,
                "scheduler": SCHEDULER,
                "seed": params.seed,
                "steps": params.steps,
            }
        },
        NODE_CHECKPOINT: {
            "class_type": "CheckpointLoaderSimple",
            "inputs": { "ckpt_name": params.checkpoint }
        },
        NODE_LATENT: {
            "class_type": "EmptyLatentImage",
            "inputs": {
                "batch_size": params.batch_size,
                "height": params.height,
                "width": params.width,
            }
        },
        NODE_POSITIVE: {
            "class_type": "CLIPTextEncode",
            "inputs": { "clip": [NODE_CHECKPOINT, 1], "text": params.prompt }
        },
        NODE_NEGATIVE: {
            "class_type": "CLIPTextEncode",
            "inputs": { "clip": [NODE_CHECKPOINT, 1], "text": params.negative_prompt }
        },
        NODE_DECODE: {
            "class_type": "VAEDecode",
            "inputs": { "samples": [NODE_SAMPLER, 0], "vae": [NODE_CHECKPOINT, 2] }
        },
        NODE_SAVE: {
            "class_type": "SaveImage",
            "inputs": { "filename_prefix": FILENAME_PREFIX, "images": [NODE_DECODE, 0] }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Txt2ImgParams {
        Txt2ImgParams {
            checkpoint: "sdxl/base.safetensors".into(),
            prompt: "a lighthouse".into(),
            negative_prompt: "blurry".into(),
            width: 768,
            height: 512,
            batch_size: 2,
            steps: 25,
            cfg: 6.5,
            seed: 1234,
        }
    }

    #[test]
    fn job_parameters_land_in_the_right_nodes() {
        let graph = txt2img(&params());

        assert_eq!(graph["4"]["inputs"]["ckpt_name"], "sdxl/base.safetensors");
        assert_eq!(graph["6"]["inputs"]["text"], "a lighthouse");
        assert_eq!(graph["7"]["inputs"]["text"], "blurry");
        assert_eq!(graph["5"]["inputs"]["width"], 768);
        assert_eq!(graph["5"]["inputs"]["height"], 512);
        assert_eq!(graph["5"]["inputs"]["batch_size"], 2);
        assert_eq!(graph["3"]["inputs"]["steps"], 25);
        assert_eq!(graph["3"]["inputs"]["cfg"], 6.5);
        assert_eq!(graph["3"]["inputs"]["seed"], 1234);
    }

    #[test]
    fn links_reference_existing_nodes() {
        let graph = txt2img(&params());
        let nodes = graph.as_object().unwrap();
        assert_eq!(nodes.len(), 7);

        for node in nodes.values() {
            for input in node["inputs"].as_object().unwrap().values() {
                if let Some(link) = input.as_array() {
                    let target = link[0].as_str().unwrap();
                    assert!(nodes.contains_key(target), "dangling link to {target}");
                }
            }
        }
    }
}
