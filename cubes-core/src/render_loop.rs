//! The render loop controller.
//!
//! Owns the camera, the scene (cubes plus one directional light) and the
//! renderer. Each tick spins the cubes from the frame timestamp, keeps the
//! renderer's backing buffer in step with the surface's presented size,
//! renders, and asks the host for the next frame.

use std::rc::Rc;

use log::{debug, error, info, warn};
use nalgebra::Point3;

use crate::config::{ConfigError, SceneConfig};
use crate::geometry::Mesh;
use crate::projection::PerspectiveCamera;
use crate::scene::{DirectionalLight, MeshObject, ObjectId, PhongMaterial, Scene};
use crate::surface::{DisplaySurface, FrameHandle, FrameScheduler, Renderer, SurfaceSize};

#[derive(Debug, thiserror::Error)]
pub enum InitError<E> {
    #[error("invalid scene config: {0}")]
    Config(#[from] ConfigError),
    #[error("initial render failed: {0}")]
    Render(E),
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// 1-based tick counter
    pub tick: u64,
    pub time_ms: f64,
    /// New backing size, if the tick resized the renderer
    pub resized: Option<SurfaceSize>,
}

pub struct RenderLoop<R: Renderer> {
    renderer: R,
    camera: PerspectiveCamera,
    scene: Scene,
    cubes: Vec<ObjectId>,
    /// Radians per second, one per cube
    speeds: Vec<f64>,
    pending: Option<FrameHandle>,
    ticks: u64,
}

impl<R: Renderer> RenderLoop<R> {
    /// Validate `config`, build the scene around an already-bound renderer
    /// and draw the first frame. Call [`RenderLoop::start`] to begin
    /// animating.
    pub fn initialize(renderer: R, config: &SceneConfig) -> Result<Self, InitError<R::Error>> {
        config.validate()?;

        let cam = &config.camera;
        let mut camera = PerspectiveCamera::new(cam.fov, cam.aspect, cam.near, cam.far);
        camera.position.z = cam.distance;

        let mut scene = Scene::new();
        let geometry = Rc::new(Mesh::cuboid(1.0, 1.0, 1.0));

        let cubes: Vec<ObjectId> = config
            .cubes
            .iter()
            .map(|cube| {
                let mut mesh =
                    MeshObject::new(Rc::clone(&geometry), PhongMaterial::new(cube.color));
                mesh.position.x = cube.x;
                scene.add_mesh(mesh)
            })
            .collect();

        // The light goes in before the first render so that frame is lit.
        let mut light = DirectionalLight::new(config.light.color, config.light.intensity);
        light.position = Point3::from(config.light.position);
        scene.add_light(light);

        let mut controller = Self {
            renderer,
            camera,
            scene,
            speeds: (0..cubes.len()).map(|index| config.speed(index)).collect(),
            cubes,
            pending: None,
            ticks: 0,
        };
        controller
            .renderer
            .render(&controller.scene, &controller.camera)
            .map_err(InitError::Render)?;

        info!(
            "render loop initialized: {} cubes, surface {}",
            controller.cubes.len(),
            controller.renderer.surface().presented_size()
        );
        Ok(controller)
    }

    /// Request the first frame. Does nothing if a frame is already pending.
    pub fn start<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if self.pending.is_none() {
            self.request_next(scheduler);
        }
    }

    /// Frame callback: run one tick, then request exactly one more frame.
    /// A render failure stops the loop.
    pub fn on_frame<S: FrameScheduler>(
        &mut self,
        time_ms: f64,
        scheduler: &mut S,
    ) -> Result<TickReport, R::Error> {
        self.pending = None;
        match self.step(time_ms) {
            Ok(report) => {
                self.request_next(scheduler);
                Ok(report)
            }
            Err(err) => {
                error!("render failed at tick {}, loop stopped", self.ticks);
                Err(err)
            }
        }
    }

    fn request_next<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        self.pending = scheduler.request_frame();
        if self.pending.is_none() {
            warn!("host refused the next frame, loop stopped at tick {}", self.ticks);
        }
    }

    /// Cancel the pending frame request, if any
    pub fn stop<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_frame(handle);
            debug!("render loop stopped after {} ticks", self.ticks);
        }
    }

    /// One tick without rescheduling
    pub fn step(&mut self, time_ms: f64) -> Result<TickReport, R::Error> {
        self.ticks += 1;
        let seconds = time_ms / 1000.0;

        for (id, speed) in self.cubes.iter().zip(&self.speeds) {
            let angle = (seconds * speed) as f32;
            if let Some(cube) = self.scene.mesh_mut(*id) {
                cube.rotation.set_uniform(angle);
            }
        }

        let resized = self.resize_to_display_size();
        self.renderer.render(&self.scene, &self.camera)?;

        Ok(TickReport {
            tick: self.ticks,
            time_ms,
            resized,
        })
    }

    /// Match the backing buffer to the presented size. Returns the new size
    /// when a resize happened.
    pub fn resize_to_display_size(&mut self) -> Option<SurfaceSize> {
        let surface = self.renderer.surface();
        let presented = surface.presented_size();
        if presented == surface.backing_size() {
            return None;
        }

        self.renderer.set_size(presented);
        // A collapsed surface keeps the previous aspect
        if let Some(aspect) = presented.aspect() {
            self.camera.aspect = aspect;
            self.camera.update_projection_matrix();
        }
        debug!("resized backing buffer to {presented}");
        Some(presented)
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Hosts use this to feed surface changes (e.g. terminal resize events)
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Cubes in construction order
    pub fn cubes(&self) -> impl Iterator<Item = &MeshObject> {
        self.cubes.iter().filter_map(|id| self.scene.mesh(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::transform::Rotation;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    struct FakeSurface {
        presented: SurfaceSize,
        backing: SurfaceSize,
    }

    impl DisplaySurface for FakeSurface {
        fn presented_size(&self) -> SurfaceSize {
            self.presented
        }

        fn backing_size(&self) -> SurfaceSize {
            self.backing
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        meshes: usize,
        lights: usize,
        rotations: Vec<Rotation>,
        aspect: f32,
    }

    #[derive(Debug, PartialEq)]
    struct ContextLost;

    struct FakeRenderer {
        surface: FakeSurface,
        frames: Vec<Frame>,
        resizes: Vec<SurfaceSize>,
        fail: bool,
    }

    impl FakeRenderer {
        fn new(presented: SurfaceSize, backing: SurfaceSize) -> Self {
            Self {
                surface: FakeSurface { presented, backing },
                frames: Vec::new(),
                resizes: Vec::new(),
                fail: false,
            }
        }
    }

    impl Renderer for FakeRenderer {
        type Surface = FakeSurface;
        type Error = ContextLost;

        fn surface(&self) -> &FakeSurface {
            &self.surface
        }

        fn set_size(&mut self, size: SurfaceSize) {
            self.surface.backing = size;
            self.resizes.push(size);
        }

        fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ContextLost> {
            if self.fail {
                return Err(ContextLost);
            }
            self.frames.push(Frame {
                meshes: scene.meshes().count(),
                lights: scene.lights().count(),
                rotations: scene.meshes().map(|m| m.rotation).collect(),
                aspect: camera.aspect,
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeScheduler {
        next: i32,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
        refuse: bool,
    }

    impl FrameScheduler for FakeScheduler {
        fn request_frame(&mut self) -> Option<FrameHandle> {
            if self.refuse {
                return None;
            }
            self.next += 1;
            let handle = FrameHandle(self.next);
            self.requested.push(handle);
            Some(handle)
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
    }

    fn controller(presented: SurfaceSize, backing: SurfaceSize) -> RenderLoop<FakeRenderer> {
        RenderLoop::initialize(FakeRenderer::new(presented, backing), &SceneConfig::default())
            .unwrap()
    }

    fn steady() -> RenderLoop<FakeRenderer> {
        let size = SurfaceSize::new(300, 150);
        controller(size, size)
    }

    #[test]
    fn test_initialization_builds_scene_and_renders_once() {
        let controller = steady();
        let scene = controller.scene();
        assert_eq!(scene.meshes().count(), 3);
        assert_eq!(scene.lights().count(), 1);
        assert_eq!(scene.len(), 4);

        let frames = &controller.renderer().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lights, 1);
        assert!(!controller.is_running());
        assert_eq!(controller.ticks(), 0);
    }

    #[test]
    fn test_camera_defaults() {
        let controller = steady();
        let camera = controller.camera();
        assert_eq!(camera.fov, 75.0);
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 10.0);
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_cube_palette_and_light() {
        let controller = steady();
        let colors: Vec<Color> = controller.cubes().map(|c| c.material.color).collect();
        assert_eq!(colors, vec![Color::GREEN, Color::DODGER_BLUE, Color::YELLOW]);

        let geometry = &controller.cubes().next().unwrap().geometry;
        assert!(controller.cubes().all(|c| Rc::ptr_eq(&c.geometry, geometry)));

        let light = controller.scene().lights().next().unwrap();
        assert_eq!(light.color, Color::WHITE);
        assert_eq!(light.intensity, 1.0);
        assert_eq!(light.position, Point3::new(-1.0, 2.0, 4.0));
    }

    #[test]
    fn test_rotation_at_known_time() {
        let mut controller = steady();
        controller.step(2500.0).unwrap();

        let angles: Vec<Rotation> = controller.cubes().map(|c| c.rotation).collect();
        for (i, expected) in [2.5_f32, 2.75, 3.0].into_iter().enumerate() {
            assert_relative_eq!(angles[i].x, expected, epsilon = 1e-5);
            assert_eq!(angles[i].x, angles[i].y);
            assert_eq!(angles[i].y, angles[i].z);
        }

        // The tick renders the updated rotations
        let last = controller.renderer().frames.last().unwrap();
        assert_eq!(last.rotations, angles);
    }

    proptest! {
        #[test]
        fn prop_rotation_is_deterministic(times in proptest::collection::vec(0.0f64..1.0e7, 1..8)) {
            let mut controller = steady();
            for &t in &times {
                controller.step(t).unwrap();
                for (i, cube) in controller.cubes().enumerate() {
                    let expected = ((t / 1000.0) * (1.0 + i as f64 * 0.1)) as f32;
                    prop_assert_eq!(cube.rotation.x, expected);
                    prop_assert_eq!(cube.rotation.x, cube.rotation.y);
                    prop_assert_eq!(cube.rotation.y, cube.rotation.z);
                }
            }
        }
    }

    #[test]
    fn test_no_resize_when_sizes_match() {
        let mut controller = steady();
        let report = controller.step(16.0).unwrap();

        assert_eq!(report.resized, None);
        assert!(controller.renderer().resizes.is_empty());
        assert_eq!(controller.camera().aspect, 2.0);
    }

    #[test]
    fn test_resize_tracks_presented_size() {
        let mut controller = controller(SurfaceSize::new(1280, 720), SurfaceSize::new(300, 150));
        let report = controller.step(16.0).unwrap();

        let presented = SurfaceSize::new(1280, 720);
        assert_eq!(report.resized, Some(presented));
        assert_eq!(controller.renderer().surface().backing_size(), presented);
        assert_eq!(controller.camera().aspect, 1280.0 / 720.0);

        let expected = PerspectiveCamera::new(75.0, 1280.0 / 720.0, 0.1, 10.0);
        assert_relative_eq!(
            *controller.camera().projection_matrix(),
            *expected.projection_matrix()
        );

        // The frame rendered on the resizing tick already uses the new aspect
        let last = controller.renderer().frames.last().unwrap();
        assert_eq!(last.aspect, 1280.0 / 720.0);

        // Second tick at the same size is a no-op
        assert_eq!(controller.step(32.0).unwrap().resized, None);
        assert_eq!(controller.renderer().resizes.len(), 1);
    }

    #[test]
    fn test_zero_height_keeps_aspect() {
        let mut controller = controller(SurfaceSize::new(640, 0), SurfaceSize::new(300, 150));
        let report = controller.step(0.0).unwrap();
        assert_eq!(report.resized, Some(SurfaceSize::new(640, 0)));
        assert_eq!(controller.camera().aspect, 2.0);
    }

    #[test]
    fn test_zero_width_keeps_aspect() {
        let mut controller = controller(SurfaceSize::new(0, 480), SurfaceSize::new(300, 150));
        let report = controller.step(16.0).unwrap();

        assert_eq!(report.resized, Some(SurfaceSize::new(0, 480)));
        assert_eq!(
            controller.renderer().surface().backing_size(),
            SurfaceSize::new(0, 480)
        );
        assert_eq!(controller.camera().aspect, 2.0);
        assert!(controller
            .camera()
            .projection_matrix()
            .iter()
            .all(|v| v.is_finite()));
    }

    #[test]
    fn test_rotation_matches_formula_over_long_run() {
        let mut controller = steady();
        for frame in 0..20_000u32 {
            let t = f64::from(frame) * 16.6667;
            controller.step(t).unwrap();
            for (i, cube) in controller.cubes().enumerate() {
                assert_eq!(
                    cube.rotation.x,
                    ((t / 1000.0) * (1.0 + i as f64 * 0.1)) as f32
                );
            }
        }
    }

    #[test]
    fn test_cube_offsets_never_change() {
        let mut controller = controller(SurfaceSize::new(800, 600), SurfaceSize::new(300, 150));
        for t in [0.0, 16.7, 1000.0, 123_456.0] {
            controller.step(t).unwrap();
            let offsets: Vec<Point3<f32>> = controller.cubes().map(|c| c.position).collect();
            assert_eq!(
                offsets,
                vec![
                    Point3::new(-2.0, 0.0, 0.0),
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(2.0, 0.0, 0.0)
                ]
            );
        }
    }

    #[test]
    fn test_scene_membership_is_stable() {
        let mut controller = steady();
        for t in 0..10 {
            controller.step(f64::from(t) * 16.0).unwrap();
        }
        assert!(controller
            .renderer()
            .frames
            .iter()
            .all(|f| f.meshes == 3 && f.lights == 1));
    }

    #[test]
    fn test_each_tick_schedules_exactly_one_frame() {
        let mut controller = steady();
        let mut scheduler = FakeScheduler::default();

        controller.start(&mut scheduler);
        controller.start(&mut scheduler);
        assert_eq!(scheduler.requested.len(), 1);

        for tick in 1..=5u32 {
            let report = controller
                .on_frame(f64::from(tick) * 16.0, &mut scheduler)
                .unwrap();
            assert_eq!(report.tick, u64::from(tick));
            assert_eq!(scheduler.requested.len(), tick as usize + 1);
            assert_eq!(controller.pending_frame(), scheduler.requested.last().copied());
        }
        assert_eq!(controller.renderer().frames.len(), 6);
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let mut controller = steady();
        let mut scheduler = FakeScheduler::default();
        controller.start(&mut scheduler);
        controller.on_frame(16.0, &mut scheduler).unwrap();

        controller.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled, vec![FrameHandle(2)]);
        assert!(!controller.is_running());

        // Stopping twice cancels nothing new
        controller.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled.len(), 1);
    }

    #[test]
    fn test_render_failure_stops_loop() {
        let mut controller = steady();
        let mut scheduler = FakeScheduler::default();
        controller.start(&mut scheduler);

        controller.renderer.fail = true;
        assert_eq!(controller.on_frame(16.0, &mut scheduler), Err(ContextLost));
        assert!(!controller.is_running());
        assert_eq!(scheduler.requested.len(), 1);
    }

    #[test]
    fn test_refused_frame_leaves_loop_idle() {
        let mut controller = steady();
        let mut scheduler = FakeScheduler::default();
        controller.start(&mut scheduler);

        scheduler.refuse = true;
        controller.on_frame(16.0, &mut scheduler).unwrap();
        assert!(!controller.is_running());
        assert_eq!(controller.pending_frame(), None);

        // Nothing to cancel
        controller.stop(&mut scheduler);
        assert!(scheduler.cancelled.is_empty());

        // A fresh start works once the host accepts frames again
        scheduler.refuse = false;
        controller.start(&mut scheduler);
        assert!(controller.is_running());
    }

    #[test]
    fn test_rejects_unvalidated_config() {
        let mut config = SceneConfig::default();
        config.camera.near = 1.0;
        config.camera.far = 1.0;
        let size = SurfaceSize::new(10, 10);
        let result = RenderLoop::initialize(FakeRenderer::new(size, size), &config);
        assert!(matches!(
            result,
            Err(InitError::Config(ConfigError::ClipPlanes { .. }))
        ));

        let mut config = SceneConfig::default();
        config.cubes.clear();
        let result = RenderLoop::initialize(FakeRenderer::new(size, size), &config);
        assert!(matches!(result, Err(InitError::Config(ConfigError::NoCubes))));
    }

    #[test]
    fn test_initial_render_failure() {
        let size = SurfaceSize::new(10, 10);
        let mut renderer = FakeRenderer::new(size, size);
        renderer.fail = true;
        let result = RenderLoop::initialize(renderer, &SceneConfig::default());
        assert!(matches!(result, Err(InitError::Render(ContextLost))));
    }

    #[test]
    fn test_custom_config() {
        let config = SceneConfig::from_json(
            r#"{ "cubes": [ { "color": "red", "x": 0.5 } ], "speed_step": 0.5 }"#,
        )
        .unwrap();
        let size = SurfaceSize::new(10, 10);
        let mut controller =
            RenderLoop::initialize(FakeRenderer::new(size, size), &config).unwrap();
        controller.step(1000.0).unwrap();

        let cube = controller.cubes().next().unwrap();
        assert_eq!(cube.position.x, 0.5);
        assert_relative_eq!(cube.rotation.x, 1.0);
    }
}
