//! `requestAnimationFrame` as a [`FrameScheduler`]

use cubes_core::{FrameHandle, FrameScheduler};
use log::error;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

pub type FrameCallback = Closure<dyn FnMut(f64)>;

pub struct AnimationFrames {
    window: Window,
    callback: Option<FrameCallback>,
}

impl AnimationFrames {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            callback: None,
        }
    }

    /// Install the closure invoked for every frame
    pub fn set_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    /// Drop the frame closure. Must not be called from inside it.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }
}

impl FrameScheduler for AnimationFrames {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let Some(callback) = &self.callback else {
            error!("frame requested before a callback was installed");
            return None;
        };

        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => Some(FrameHandle(id)),
            Err(err) => {
                error!("requestAnimationFrame failed: {err:?}");
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(err) = self.window.cancel_animation_frame(handle.0) {
            error!("cancelAnimationFrame failed: {err:?}");
        }
    }
}
