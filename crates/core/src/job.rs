//! Image-generation job descriptor and its wire format.
//!
//! A producer drops one JSON descriptor per job into the queue
//! directory; the dispatch service hands it to a worker unchanged except
//! for `job_id` (filled from the descriptor file name when absent) and
//! `started_at` (set at dispatch).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Kind of work a job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Generate,
}

/// A single image-generation job.
///
/// Field names follow the wire schema; the Rust names are the domain
/// names where the two differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque server-side id. Numeric ids in descriptors are accepted
    /// and carried as strings.
    #[serde(rename = "job_id", default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub requested_at: Timestamp,
    /// Set once, when the job is dispatched.
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    pub request_type: RequestType,
    /// Where results are delivered (e.g. a chat channel id).
    #[serde(rename = "channel")]
    pub requester_channel: String,
    #[serde(rename = "requested_prompt")]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// SHA-256 of the checkpoint the job must be rendered with.
    #[serde(rename = "model")]
    pub model_checksum: String,
    pub steps: u32,
    #[serde(default)]
    pub image_link: Option<String>,
    /// `"WxH"`, see [`Resolution`].
    pub resolution: String,
    pub batch_size: u32,
    #[serde(rename = "config_scale")]
    pub guidance_scale: f64,
}

impl Job {
    /// Check the numeric and format constraints of a descriptor.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps == 0 {
            return Err(CoreError::Validation("steps must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(CoreError::Validation("batch_size must be positive".into()));
        }
        if !(self.guidance_scale.is_finite() && self.guidance_scale > 0.0) {
            return Err(CoreError::Validation(
                "config_scale must be a positive number".into(),
            ));
        }
        self.parsed_resolution()?;
        Ok(())
    }

    /// Parse the `resolution` field.
    pub fn parsed_resolution(&self) -> Result<Resolution, CoreError> {
        self.resolution.parse()
    }
}

/// Accept both `"17"` and `17` for `job_id`.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Output image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Validation(format!(
                "Resolution must be in the format 'WIDTHxHEIGHT', e.g. '512x512', got '{s}'"
            ))
        };

        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
