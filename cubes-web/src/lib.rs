//! Cubes Web - WASM host for the spinning cubes render loop
//!
//! Binds a WebGL renderer to a canvas element and drives the render loop
//! from `requestAnimationFrame`.

use std::cell::RefCell;
use std::rc::Rc;

use cubes_core::{Mount, MountOutcome, RenderLoop, SceneConfig};
use log::{debug, error, info};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

pub mod frames;
pub mod webgl;

pub use frames::AnimationFrames;
pub use webgl::{CanvasSurface, WebGlError, WebGlRenderer};

/// Everything one mounted canvas owns
struct ViewState {
    controller: RenderLoop<WebGlRenderer>,
    frames: AnimationFrames,
}

type SharedView = Rc<RefCell<ViewState>>;

/// Spinning cubes view, mounted onto at most one canvas at a time
#[wasm_bindgen]
pub struct CubesView {
    config: SceneConfig,
    mount: Mount<HtmlCanvasElement, SharedView>,
}

#[wasm_bindgen]
impl CubesView {
    #[wasm_bindgen(constructor)]
    pub fn new() -> CubesView {
        Self::from_config(SceneConfig::default())
    }

    /// Create a view from a JSON scene configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<CubesView, JsValue> {
        let config =
            SceneConfig::from_json(json).map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(Self::from_config(config))
    }

    /// Start rendering into `canvas`.
    ///
    /// Returns `false` without doing anything when no canvas is given or
    /// when this canvas is already mounted. Mounting a different canvas
    /// tears the previous one down first.
    pub fn mount(&mut self, canvas: Option<HtmlCanvasElement>) -> Result<bool, JsValue> {
        let Some(canvas) = canvas else {
            debug!("no canvas to mount, skipping");
            return Ok(false);
        };

        let config = &self.config;
        match self.mount.mount_with(canvas, |canvas| start_view(canvas, config))? {
            MountOutcome::Mounted => Ok(true),
            MountOutcome::AlreadyMounted => Ok(false),
            MountOutcome::Replaced(previous) => {
                teardown(&previous);
                Ok(true)
            }
        }
    }

    /// Look the canvas up by element id and mount it
    #[wasm_bindgen(js_name = mountById)]
    pub fn mount_by_id(&mut self, id: &str) -> Result<bool, JsValue> {
        let canvas = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(id))
            .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok());
        self.mount(canvas)
    }

    /// Stop the loop and release the renderer
    pub fn unmount(&mut self) {
        if let Some(view) = self.mount.unmount() {
            teardown(&view);
        }
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.mount
            .view()
            .is_some_and(|view| view.borrow().controller.is_running())
    }

    /// Ticks rendered since mount
    pub fn ticks(&self) -> f64 {
        self.mount
            .view()
            .map_or(0.0, |view| view.borrow().controller.ticks() as f64)
    }
}

impl CubesView {
    pub fn from_config(config: SceneConfig) -> Self {
        Self {
            config,
            mount: Mount::new(),
        }
    }
}

impl Default for CubesView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CubesView {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn start_view(canvas: &HtmlCanvasElement, config: &SceneConfig) -> Result<SharedView, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let renderer = WebGlRenderer::new(canvas.clone())?;
    let controller = RenderLoop::initialize(renderer, config)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let view = Rc::new(RefCell::new(ViewState {
        controller,
        frames: AnimationFrames::new(window),
    }));

    // The callback only holds a weak reference, so dropping the view frees it
    let weak = Rc::downgrade(&view);
    let callback = Closure::wrap(Box::new(move |time_ms: f64| {
        let Some(view) = weak.upgrade() else {
            return;
        };
        let mut state = view.borrow_mut();
        let ViewState { controller, frames } = &mut *state;
        if let Err(err) = controller.on_frame(time_ms, frames) {
            error!("{err}");
        }
    }) as Box<dyn FnMut(f64)>);

    {
        let mut state = view.borrow_mut();
        let ViewState { controller, frames } = &mut *state;
        frames.set_callback(callback);
        controller.start(frames);
    }

    info!("mounted spinning cubes view");
    Ok(view)
}

fn teardown(view: &SharedView) {
    let mut state = view.borrow_mut();
    let ViewState { controller, frames } = &mut *state;
    controller.stop(frames);
    frames.clear_callback();
    debug!("unmounted spinning cubes view");
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Setup panic hook for better error messages in browser console
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    Ok(())
}
