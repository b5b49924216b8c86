use std::path::{Path, PathBuf};

use eagle::{CameraIntrinsics, TagFamily, DEFAULT_TAG_SIZE};
use glam::{DQuat, DVec3};
use serde::Deserialize;
use thiserror::Error;

use crate::memory::{DetectionMemory, InvalidCapacity, DEFAULT_CAPACITY};
use crate::node::Frames;
use crate::transform::{frame_name, StaticTransforms, TransformError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Capacity(#[from] InvalidCapacity),

    #[error("invalid transform: {0}")]
    Transform(#[from] TransformError),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub detector: DetectorConfig,
    pub camera: CameraConfig,
    pub node: NodeConfig,
    pub topics: TopicConfig,
    pub transforms: Vec<LinkConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub family: TagFamily,
    /// Side of the black square, meters.
    pub tag_size: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            family: TagFamily::default(),
            tag_size: DEFAULT_TAG_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub px: Option<f64>,
    pub py: Option<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            device: 0,
            width: CameraIntrinsics::DEFAULT_WIDTH,
            height: CameraIntrinsics::DEFAULT_HEIGHT,
            fx: CameraIntrinsics::DEFAULT_FX,
            fy: CameraIntrinsics::DEFAULT_FY,
            px: None,
            py: None,
        }
    }
}

impl CameraConfig {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        let centered = CameraIntrinsics::centered(self.width, self.height);
        CameraIntrinsics {
            fx: self.fx,
            fy: self.fy,
            px: self.px.unwrap_or(centered.px),
            py: self.py.unwrap_or(centered.py),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub capacity: usize,
    pub source_frame: String,
    pub target_frame: String,
    /// Show the camera image with the detections.
    pub draw: bool,
    /// Log how long tag extraction takes.
    pub timing: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            capacity: DEFAULT_CAPACITY,
            source_frame: "base_footprint".to_string(),
            target_frame: "map".to_string(),
            draw: true,
            timing: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicConfig {
    pub located: String,
    pub marker: String,
    pub reset: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig {
            located: "WASP_planner/Explore_result".to_string(),
            marker: "visualization_marker".to_string(),
            reset: "reset_tag_detection".to_string(),
        }
    }
}

/// Pose of `child` in `parent`. Rotation is a quaternion in x, y, z, w order.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default = "identity")]
    pub rotation: [f64; 4],
}

fn identity() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        DetectionMemory::new(self.node.capacity)?;
        if !(self.detector.tag_size.is_finite() && self.detector.tag_size > 0.0) {
            return Err(invalid("detector.tag_size", "must be a positive length"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(invalid("camera.width/height", "image must not be empty"));
        }
        for (key, value) in [("camera.fx", self.camera.fx), ("camera.fy", self.camera.fy)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, "focal length must be positive"));
            }
        }
        for (key, name) in [
            ("node.source_frame", &self.node.source_frame),
            ("node.target_frame", &self.node.target_frame),
        ] {
            if name.trim_start_matches('/').is_empty() {
                return Err(invalid(key, "frame name must not be empty"));
            }
        }
        self.transforms()?;
        Ok(())
    }

    pub fn memory(&self) -> Result<DetectionMemory, ConfigError> {
        Ok(DetectionMemory::new(self.node.capacity)?)
    }

    pub fn frames(&self) -> Frames {
        Frames {
            source: self.node.source_frame.clone(),
            target: self.node.target_frame.clone(),
        }
    }

    /// Builds the transform tree. Without any configured link the source frame is placed
    /// at the origin of the target frame, unless both name the same frame.
    pub fn transforms(&self) -> Result<StaticTransforms, ConfigError> {
        let mut tf = StaticTransforms::new();
        if self.transforms.is_empty() {
            if frame_name(&self.node.source_frame) == frame_name(&self.node.target_frame) {
                return Ok(tf);
            }
            tf.insert(
                &self.node.target_frame,
                &self.node.source_frame,
                DVec3::ZERO,
                DQuat::IDENTITY,
            )?;
            return Ok(tf);
        }
        for link in &self.transforms {
            let rotation = DQuat::from_array(link.rotation);
            if !rotation.is_finite() || (rotation.length() - 1.0).abs() > 1e-3 {
                return Err(invalid("transforms.rotation", "must be a unit quaternion"));
            }
            tf.insert(
                &link.parent,
                &link.child,
                DVec3::from_array(link.translation),
                rotation.normalize(),
            )?;
        }
        Ok(tf)
    }
}
