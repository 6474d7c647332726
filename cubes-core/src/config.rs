//! Scene configuration. Every field has a default, so `{}` is a valid
//! document and reproduces the three-cube demo exactly.

use serde::{Deserialize, Serialize};

use crate::color::Color;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("clip planes must satisfy 0 < near < far, got near={near} far={far}")]
    ClipPlanes { near: f32, far: f32 },
    #[error("aspect ratio must be positive, got {0}")]
    Aspect(f32),
    #[error("{0} must be finite")]
    NotFinite(&'static str),
    #[error("scene needs at least one cube")]
    NoCubes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Initial aspect, replaced on the first resize
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Distance from the origin along +Z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            aspect: 2.0,
            near: 0.1,
            far: 10.0,
            distance: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeConfig {
    pub color: Color,
    /// Horizontal offset
    pub x: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub color: Color,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.0,
            position: [-1.0, 2.0, 4.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    /// Cube i spins at `1 + i * speed_step` radians per second
    pub cubes: Vec<CubeConfig>,
    pub light: LightConfig,
    pub speed_step: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            cubes: vec![
                CubeConfig {
                    color: Color::GREEN,
                    x: -2.0,
                },
                CubeConfig {
                    color: Color::DODGER_BLUE,
                    x: 0.0,
                },
                CubeConfig {
                    color: Color::YELLOW,
                    x: 2.0,
                },
            ],
            light: LightConfig::default(),
            speed_step: 0.1,
        }
    }
}

impl SceneConfig {
    /// Parse and validate a JSON document
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        let finite = [
            ("camera.fov", camera.fov),
            ("camera.aspect", camera.aspect),
            ("camera.near", camera.near),
            ("camera.far", camera.far),
            ("camera.distance", camera.distance),
            ("light.intensity", self.light.intensity),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite(name));
            }
        }
        if !self.speed_step.is_finite() {
            return Err(ConfigError::NotFinite("speed_step"));
        }
        if self.light.position.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NotFinite("light.position"));
        }
        if self.cubes.iter().any(|cube| !cube.x.is_finite()) {
            return Err(ConfigError::NotFinite("cubes.x"));
        }

        if camera.fov <= 0.0 || camera.fov >= 180.0 {
            return Err(ConfigError::FieldOfView(camera.fov));
        }
        if camera.near <= 0.0 || camera.near >= camera.far {
            return Err(ConfigError::ClipPlanes {
                near: camera.near,
                far: camera.far,
            });
        }
        if camera.aspect <= 0.0 {
            return Err(ConfigError::Aspect(camera.aspect));
        }
        if self.cubes.is_empty() {
            return Err(ConfigError::NoCubes);
        }
        Ok(())
    }

    /// Spin rate of the cube at `index`, radians per second
    pub fn speed(&self, index: usize) -> f64 {
        1.0 + index as f64 * self.speed_step
    }
}
