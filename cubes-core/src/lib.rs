//! Cubes Core Library - host-agnostic scene and render loop
//!
//! This library provides everything the spinning-cubes demo needs apart from
//! the pixels: geometry, transforms, the perspective camera, the scene graph,
//! scene configuration, and the render loop controller with the seams a host
//! (browser canvas, terminal) plugs into.

pub mod color;
pub mod config;
pub mod geometry;
pub mod mount;
pub mod projection;
pub mod render_loop;
pub mod scene;
pub mod surface;
pub mod transform;

// Re-export commonly used types
pub use color::{Color, ColorError};
pub use config::{ConfigError, SceneConfig};
pub use geometry::{Mesh, Triangle, Vertex};
pub use mount::{Mount, MountOutcome};
pub use projection::{PerspectiveCamera, Projected};
pub use render_loop::{InitError, RenderLoop, TickReport};
pub use scene::{DirectionalLight, MeshObject, ObjectId, PhongMaterial, Scene};
pub use surface::{DisplaySurface, FrameHandle, FrameScheduler, Renderer, SurfaceSize};
pub use transform::{Rotation, Transform};
