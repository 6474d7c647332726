//! Half-block truecolor rasterizer for terminal rendering

use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use cubes_core::{
    DisplaySurface, MeshObject, PerspectiveCamera, Renderer, Scene, SurfaceSize, Triangle,
};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::{self, Write};

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: char = '\u{2580}';

const CLEAR_COLOR: [u8; 3] = [0, 0, 0];

/// The terminal window as a display surface.
///
/// Each cell shows two vertically stacked pixels, so the presented size is
/// `columns x rows * 2` and pixels stay roughly square.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    columns: u16,
    rows: u16,
    backing: SurfaceSize,
}

impl TerminalSurface {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            backing: SurfaceSize::default(),
        }
    }

    /// Record a new terminal size, e.g. from `Event::Resize`
    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
    }
}

impl DisplaySurface for TerminalSurface {
    fn presented_size(&self) -> SurfaceSize {
        SurfaceSize::new(u32::from(self.columns), u32::from(self.rows) * 2)
    }

    fn backing_size(&self) -> SurfaceSize {
        self.backing
    }
}

/// Software renderer drawing into a color/depth buffer, then into the
/// terminal through queued crossterm commands.
pub struct HalfBlockRenderer<W: Write> {
    surface: TerminalSurface,
    out: W,
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    color_buffer: Vec<[u8; 3]>,
    status: Option<String>,
}

impl<W: Write> HalfBlockRenderer<W> {
    pub fn new(surface: TerminalSurface, out: W) -> Self {
        let mut renderer = Self {
            surface,
            out,
            width: 0,
            height: 0,
            depth_buffer: Vec::new(),
            color_buffer: Vec::new(),
            status: None,
        };
        let backing = renderer.surface.backing;
        renderer.allocate(backing);
        renderer
    }

    pub fn surface_mut(&mut self) -> &mut TerminalSurface {
        &mut self.surface
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Text drawn over the first row after each frame
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Color of the pixel at (x, y), if in bounds
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        (x < self.width && y < self.height).then(|| self.color_buffer[y * self.width + x])
    }

    fn allocate(&mut self, size: SurfaceSize) {
        self.width = size.width as usize;
        self.height = size.height as usize;
        let len = self.width * self.height;
        self.depth_buffer = vec![f32::INFINITY; len];
        self.color_buffer = vec![CLEAR_COLOR; len];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.color_buffer.fill(CLEAR_COLOR);
    }

    /// Rasterize the scene into the color buffer without touching the output
    pub fn draw_scene(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        self.clear();
        for mesh in scene.meshes() {
            self.draw_mesh(mesh, scene, camera);
        }
    }

    fn draw_mesh(&mut self, mesh: &MeshObject, scene: &Scene, camera: &PerspectiveCamera) {
        let model = mesh.model_matrix();
        for triangle in &mesh.geometry.triangles {
            self.draw_triangle(triangle, &model, mesh, scene, camera);
        }
    }

    fn draw_triangle(
        &mut self,
        triangle: &Triangle,
        model: &Matrix4<f32>,
        mesh: &MeshObject,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        let mut screen = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen.iter_mut().zip(&triangle.vertices) {
            let Some(projected) = camera.project(&vertex.position, model) else {
                return; // Vertex behind the camera
            };
            let (x, y) = projected.to_screen(self.width as u32, self.height as u32);
            *slot = (x, y, projected.depth);
        }

        let normal = model
            .transform_vector(&triangle.vertices[0].normal)
            .normalize();
        let centroid = triangle
            .vertices
            .iter()
            .map(|v| model.transform_point(&v.position).coords)
            .sum::<Vector3<f32>>()
            / 3.0;
        let color = shade(mesh, scene, camera, &Point3::from(centroid), &normal);

        self.rasterize(&screen, color);
    }

    fn rasterize(&mut self, coords: &[(f32, f32, f32); 3], color: [u8; 3]) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let [v0, v1, v2] = *coords;

        // Bounding box clipped to the buffer
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.color_buffer[idx] = color;
                }
            }
        }
    }

    /// Write the color buffer to the output, two pixel rows per text row
    pub fn present(&mut self) -> io::Result<()> {
        let mut last: Option<([u8; 3], [u8; 3])> = None;
        for row in 0..self.height / 2 {
            self.out.queue(MoveTo(0, row as u16))?;
            for x in 0..self.width {
                let top = self.color_buffer[(row * 2) * self.width + x];
                let bottom = self.color_buffer[(row * 2 + 1) * self.width + x];
                if last != Some((top, bottom)) {
                    self.out
                        .queue(SetForegroundColor(rgb(top)))?
                        .queue(SetBackgroundColor(rgb(bottom)))?;
                    last = Some((top, bottom));
                }
                self.out.queue(Print(HALF_BLOCK))?;
            }
        }
        self.out.queue(ResetColor)?;

        if let Some(status) = &self.status {
            self.out
                .queue(MoveTo(0, 0))?
                .queue(SetForegroundColor(Color::Yellow))?
                .queue(Print(status))?
                .queue(ResetColor)?;
        }

        self.out.flush()
    }
}

impl<W: Write> Renderer for HalfBlockRenderer<W> {
    type Surface = TerminalSurface;
    type Error = io::Error;

    fn surface(&self) -> &TerminalSurface {
        &self.surface
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.surface.backing = size;
        self.allocate(size);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> io::Result<()> {
        self.draw_scene(scene, camera);
        self.present()
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb { r, g, b }
}

/// Blinn-Phong with no ambient term: an unlit face is black
fn shade(
    mesh: &MeshObject,
    scene: &Scene,
    camera: &PerspectiveCamera,
    point: &Point3<f32>,
    normal: &Vector3<f32>,
) -> [u8; 3] {
    let base = Vector3::from(mesh.material.color.to_rgb_f32());
    let specular = Vector3::from(mesh.material.specular.to_rgb_f32());
    let view_dir = (camera.position - point).normalize();

    let mut total = Vector3::zeros();
    for light in scene.lights() {
        let to_light = light.direction_to_light();
        let radiance = Vector3::from(light.color.to_rgb_f32()) * light.intensity;

        let diffuse = normal.dot(&to_light).max(0.0);
        let half = (to_light + view_dir).normalize();
        let highlight = normal
            .dot(&half)
            .max(0.0)
            .powf(mesh.material.shininess);

        total += (base * diffuse + specular * highlight).component_mul(&radiance);
    }

    total.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8).into()
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
