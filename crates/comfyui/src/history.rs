//! Extraction of output images from a `/history/{prompt_id}` response.

use serde::Deserialize;

/// Location of one output image on the ComfyUI server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_folder_type")]
    pub folder_type: String,
}

fn default_folder_type() -> String {
    "output".to_string()
}

/// Collect every image reference produced by `prompt_id`, in node-id
/// order. A prompt absent from the history yields an empty list.
pub fn output_images(history: &serde_json::Value, prompt_id: &str) -> Vec<ImageRef> {
    let Some(outputs) = history
        .get(prompt_id)
        .and_then(|entry| entry.get("outputs"))
        .and_then(|outputs| outputs.as_object())
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (node_id, node_output) in outputs {
        let Some(list) = node_output.get("images").and_then(|v| v.as_array()) else {
            continue;
        };
        for raw in list {
            match serde_json::from_value::<ImageRef>(raw.clone()) {
                Ok(image) => images.push(image),
                Err(e) => {
                    tracing::warn!(node_id = %node_id, error = %e, "Skipping malformed image entry");
                }
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_images_from_all_nodes() {
        let history = serde_json::json!({
            "p1": {
                "outputs": {
                    "9": {"images": [
                        {"filename": "ComfyUI_00001_.png", "subfolder": "", "type": "output"},
                        {"filename": "ComfyUI_00002_.png", "subfolder": "", "type": "output"}
                    ]},
                    "12": {"text": ["not an image"]}
                }
            }
        });

        let images = output_images(&history, "p1");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].filename, "ComfyUI_00001_.png");
        assert_eq!(images[1].folder_type, "output");
    }

    #[test]
    fn unknown_prompt_yields_nothing() {
        let history = serde_json::json!({"other": {"outputs": {}}});
        assert!(output_images(&history, "p1").is_empty());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let history = serde_json::json!({
            "p1": {"outputs": {"9": {"images": [{"filename": "x.png"}]}}}
        });
        let images = output_images(&history, "p1");
        assert_eq!(
            images,
            vec![ImageRef {
                filename: "x.png".into(),
                subfolder: String::new(),
                folder_type: "output".into(),
            }]
        );
    }
}
