//! Viewer configuration
//!
//! Every field has a default matching the stock viewer: two charger models
//! under `models/`, half scale, 0.01 rad of idle spin per frame, and an
//! `immersive-ar` session that requires hit testing.

use serde::Deserialize;
use std::collections::HashSet;

use crate::error::{Result, ViewerError};

/// Coordinate frame a session can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceKind {
    Viewer,
    Local,
    LocalFloor,
}

impl ReferenceSpaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSpaceKind::Viewer => "viewer",
            ReferenceSpaceKind::Local => "local",
            ReferenceSpaceKind::LocalFloor => "local-floor",
        }
    }
}

/// How placement picks among loaded templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Uniform over loaded templates
    Random,
    /// Cycle through the configured order, skipping unloaded slots
    RoundRobin,
    /// Always the first loaded slot in configured order
    First,
}

/// What happens when `max_models` is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityPolicy {
    EvictOldest,
    RejectNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderKind {
    Gltf,
    /// Ignores the asset and yields a unit cube
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub url: String,
}

impl ModelSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!("models/{}.glb", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    /// Use the page body as a DOM overlay root
    pub dom_overlay: bool,
    /// Space in which hit poses and placed models are expressed
    pub world_space: ReferenceSpaceKind,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            required_features: vec!["hit-test".to_string()],
            optional_features: vec!["dom-overlay".to_string()],
            dom_overlay: true,
            world_space: ReferenceSpaceKind::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            near: 0.01,
            far: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub models: Vec<ModelSpec>,
    pub model_scale: f32,
    /// Idle spin per frame, radians
    pub rotation_step: f32,
    pub status_duration_ms: u32,
    pub error_status_duration_ms: u32,
    pub session: SessionOptions,
    pub selection: SelectionPolicy,
    /// Fixed seed for `SelectionPolicy::Random`
    pub seed: Option<u64>,
    pub max_models: Option<usize>,
    pub capacity_policy: CapacityPolicy,
    pub decoder: DecoderKind,
    pub camera: CameraSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            models: vec![ModelSpec::new("fast-charger"), ModelSpec::new("wall-charger")],
            model_scale: 0.5,
            rotation_step: 0.01,
            status_duration_ms: 3000,
            error_status_duration_ms: 5000,
            session: SessionOptions::default(),
            selection: SelectionPolicy::Random,
            seed: None,
            max_models: None,
            capacity_policy: CapacityPolicy::EvictOldest,
            decoder: DecoderKind::Gltf,
            camera: CameraSettings::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(ViewerError::Config("at least one model is required".into()));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.is_empty() {
                return Err(ViewerError::Config("model id must not be empty".into()));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(ViewerError::Config(format!("duplicate model id: {}", model.id)));
            }
        }

        if !(self.model_scale.is_finite() && self.model_scale > 0.0) {
            return Err(ViewerError::Config(format!(
                "model_scale must be positive, got {}",
                self.model_scale
            )));
        }
        if !self.rotation_step.is_finite() {
            return Err(ViewerError::Config("rotation_step must be finite".into()));
        }
        if self.max_models == Some(0) {
            return Err(ViewerError::Config("max_models must be at least 1".into()));
        }
        if self.session.world_space == ReferenceSpaceKind::Viewer {
            return Err(ViewerError::Config(
                "world_space must be local or local-floor".into(),
            ));
        }

        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ViewerError::Config(format!(
                "camera near/far must satisfy 0 < near < far, got {}/{}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ViewerError::Config(format!(
                "camera fov must be within (0, 180), got {}",
                camera.fov_degrees
            )));
        }

        Ok(())
    }
}
