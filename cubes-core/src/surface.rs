//! Seams between the render loop and its host: the drawable surface, the
//! renderer bound to it, and the host's frame scheduler.

use std::fmt;

use crate::projection::PerspectiveCamera;
use crate::scene::Scene;

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or `None` when either side is zero
    pub fn aspect(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Something a renderer draws into.
///
/// The presented size is what the host displays (CSS pixels, terminal
/// cells); the backing size is the resolution of the buffer the renderer
/// actually fills.
pub trait DisplaySurface {
    fn presented_size(&self) -> SurfaceSize;
    fn backing_size(&self) -> SurfaceSize;
}

/// A renderer bound to a single display surface for its whole life
pub trait Renderer {
    type Surface: DisplaySurface;
    type Error;

    fn surface(&self) -> &Self::Surface;

    /// Resize the backing buffer. Never touches the presented size and
    /// applies no device-pixel-ratio scaling.
    fn set_size(&mut self, size: SurfaceSize);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error>;
}

/// Identifies one pending frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Host facility that invokes the loop once before the next repaint
pub trait FrameScheduler {
    /// `None` when the host could not queue the frame
    fn request_frame(&mut self) -> Option<FrameHandle>;
    fn cancel_frame(&mut self, handle: FrameHandle);
}
