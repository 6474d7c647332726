//! WebGL1 renderer bound to a canvas element

use std::rc::Rc;

use cubes_core::{
    geometry::FLOATS_PER_VERTEX, DisplaySurface, Mesh, PerspectiveCamera, Renderer, Scene,
    SurfaceSize,
};
use log::debug;
use nalgebra::Matrix3;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader,
    WebGlUniformLocation,
};

/// Lights beyond this count are ignored by the shader
const MAX_LIGHTS: usize = 4;

const VERTEX_SHADER_SOURCE: &str = r#"
attribute vec3 a_position;
attribute vec3 a_normal;

uniform mat4 u_model;
uniform mat3 u_normal_matrix;
uniform mat4 u_view;
uniform mat4 u_projection;

varying vec3 v_world;
varying vec3 v_normal;

void main() {
    vec4 world = u_model * vec4(a_position, 1.0);
    v_world = world.xyz;
    v_normal = u_normal_matrix * a_normal;
    gl_Position = u_projection * u_view * world;
}
"#;

// Blinn-Phong without an ambient term, so a scene with no light is black.
const FRAGMENT_SHADER_SOURCE: &str = r#"
precision mediump float;

#define MAX_LIGHTS 4

varying vec3 v_world;
varying vec3 v_normal;

uniform vec3 u_color;
uniform vec3 u_specular;
uniform float u_shininess;
uniform vec3 u_camera_position;
uniform int u_light_count;
uniform vec3 u_light_direction[MAX_LIGHTS];
uniform vec3 u_light_color[MAX_LIGHTS];

void main() {
    vec3 normal = normalize(v_normal);
    vec3 view_dir = normalize(u_camera_position - v_world);
    vec3 color = vec3(0.0);

    for (int i = 0; i < MAX_LIGHTS; i++) {
        if (i >= u_light_count) {
            break;
        }
        vec3 to_light = u_light_direction[i];
        float diffuse = max(dot(normal, to_light), 0.0);
        vec3 half_dir = normalize(to_light + view_dir);
        float highlight = pow(max(dot(normal, half_dir), 0.0), u_shininess);
        color += (u_color * diffuse + u_specular * highlight) * u_light_color[i];
    }

    gl_FragColor = vec4(color, 1.0);
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum WebGlError {
    #[error("WebGL is not available on this canvas")]
    Unsupported,
    #[error("failed to compile shader: {0}")]
    Shader(String),
    #[error("failed to link program: {0}")]
    Link(String),
    #[error("failed to allocate {0}")]
    Allocation(&'static str),
    #[error("WebGL context lost")]
    ContextLost,
    #[error("JavaScript error: {0}")]
    Js(String),
}

impl From<JsValue> for WebGlError {
    fn from(value: JsValue) -> Self {
        WebGlError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<WebGlError> for JsValue {
    fn from(err: WebGlError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Canvas element as a display surface: presented size is the CSS layout
/// size, backing size is the `width`/`height` attributes.
#[derive(Debug, Clone)]
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl DisplaySurface for CanvasSurface {
    fn presented_size(&self) -> SurfaceSize {
        SurfaceSize::new(
            self.canvas.client_width().max(0) as u32,
            self.canvas.client_height().max(0) as u32,
        )
    }

    fn backing_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.canvas.width(), self.canvas.height())
    }
}

struct Uniforms {
    model: Option<WebGlUniformLocation>,
    normal_matrix: Option<WebGlUniformLocation>,
    view: Option<WebGlUniformLocation>,
    projection: Option<WebGlUniformLocation>,
    color: Option<WebGlUniformLocation>,
    specular: Option<WebGlUniformLocation>,
    shininess: Option<WebGlUniformLocation>,
    camera_position: Option<WebGlUniformLocation>,
    light_count: Option<WebGlUniformLocation>,
    light_direction: Option<WebGlUniformLocation>,
    light_color: Option<WebGlUniformLocation>,
}

impl Uniforms {
    fn locate(gl: &Gl, program: &WebGlProgram) -> Self {
        let at = |name: &str| gl.get_uniform_location(program, name);
        Self {
            model: at("u_model"),
            normal_matrix: at("u_normal_matrix"),
            view: at("u_view"),
            projection: at("u_projection"),
            color: at("u_color"),
            specular: at("u_specular"),
            shininess: at("u_shininess"),
            camera_position: at("u_camera_position"),
            light_count: at("u_light_count"),
            light_direction: at("u_light_direction[0]"),
            light_color: at("u_light_color[0]"),
        }
    }
}

/// Vertex buffer for one shared geometry
struct GeometryBuffer {
    mesh: Rc<Mesh>,
    buffer: WebGlBuffer,
    vertex_count: i32,
}

pub struct WebGlRenderer {
    surface: CanvasSurface,
    gl: Gl,
    program: WebGlProgram,
    position_attrib: u32,
    normal_attrib: u32,
    uniforms: Uniforms,
    geometries: Vec<GeometryBuffer>,
}

impl WebGlRenderer {
    /// Claim the canvas' WebGL context and build the shading program
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, WebGlError> {
        let gl = canvas
            .get_context("webgl")?
            .ok_or(WebGlError::Unsupported)?
            .dyn_into::<Gl>()
            .map_err(|_| WebGlError::Unsupported)?;

        let vertex_shader = compile_shader(&gl, Gl::VERTEX_SHADER, VERTEX_SHADER_SOURCE)?;
        let fragment_shader = compile_shader(&gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER_SOURCE)?;
        let program = link_program(&gl, &vertex_shader, &fragment_shader)?;

        let position_attrib = attrib_location(&gl, &program, "a_position")?;
        let normal_attrib = attrib_location(&gl, &program, "a_normal")?;
        let uniforms = Uniforms::locate(&gl, &program);

        gl.enable(Gl::DEPTH_TEST);
        gl.enable(Gl::CULL_FACE);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);

        Ok(Self {
            surface: CanvasSurface::new(canvas),
            gl,
            program,
            position_attrib,
            normal_attrib,
            uniforms,
            geometries: Vec::new(),
        })
    }

    /// Index of the buffer holding `mesh`, uploading it on first use
    fn geometry_buffer(&mut self, mesh: &Rc<Mesh>) -> Result<usize, WebGlError> {
        if let Some(index) = self
            .geometries
            .iter()
            .position(|entry| Rc::ptr_eq(&entry.mesh, mesh))
        {
            return Ok(index);
        }

        let buffer = self
            .gl
            .create_buffer()
            .ok_or(WebGlError::Allocation("vertex buffer"))?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        let data = js_sys::Float32Array::from(mesh.interleaved().as_slice());
        self.gl
            .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &data, Gl::STATIC_DRAW);

        debug!("uploaded geometry with {} vertices", mesh.vertex_count());
        self.geometries.push(GeometryBuffer {
            mesh: Rc::clone(mesh),
            buffer,
            vertex_count: mesh.vertex_count() as i32,
        });
        Ok(self.geometries.len() - 1)
    }

    fn set_camera_uniforms(&self, camera: &PerspectiveCamera) {
        let gl = &self.gl;
        let u = &self.uniforms;
        gl.uniform_matrix4fv_with_f32_array(u.view.as_ref(), false, camera.view_matrix().as_slice());
        gl.uniform_matrix4fv_with_f32_array(
            u.projection.as_ref(),
            false,
            camera.projection_matrix().as_slice(),
        );
        let p = camera.position;
        gl.uniform3f(u.camera_position.as_ref(), p.x, p.y, p.z);
    }

    fn set_light_uniforms(&self, scene: &Scene) {
        let mut directions = Vec::with_capacity(MAX_LIGHTS * 3);
        let mut colors = Vec::with_capacity(MAX_LIGHTS * 3);
        for light in scene.lights().take(MAX_LIGHTS) {
            directions.extend_from_slice(light.direction_to_light().as_slice());
            colors.extend(light.color.to_rgb_f32().map(|c| c * light.intensity));
        }

        let gl = &self.gl;
        let u = &self.uniforms;
        let count = directions.len() / 3;
        gl.uniform1i(u.light_count.as_ref(), count as i32);
        if count > 0 {
            gl.uniform3fv_with_f32_array(u.light_direction.as_ref(), &directions);
            gl.uniform3fv_with_f32_array(u.light_color.as_ref(), &colors);
        }
    }
}

impl Renderer for WebGlRenderer {
    type Surface = CanvasSurface;
    type Error = WebGlError;

    fn surface(&self) -> &CanvasSurface {
        &self.surface
    }

    fn set_size(&mut self, size: SurfaceSize) {
        // Attributes only: the CSS size stays in charge of layout
        let canvas = self.surface.canvas();
        canvas.set_width(size.width);
        canvas.set_height(size.height);
        self.gl.viewport(0, 0, size.width as i32, size.height as i32);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), WebGlError> {
        if self.gl.is_context_lost() {
            return Err(WebGlError::ContextLost);
        }

        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        self.gl.use_program(Some(&self.program));
        self.set_camera_uniforms(camera);
        self.set_light_uniforms(scene);

        for mesh in scene.meshes() {
            let index = self.geometry_buffer(&mesh.geometry)?;
            let gl = &self.gl;
            let u = &self.uniforms;
            let entry = &self.geometries[index];

            let model = mesh.model_matrix();
            let normal_matrix = model
                .fixed_view::<3, 3>(0, 0)
                .into_owned()
                .try_inverse()
                .map(|m| m.transpose())
                .unwrap_or_else(Matrix3::identity);
            gl.uniform_matrix4fv_with_f32_array(u.model.as_ref(), false, model.as_slice());
            gl.uniform_matrix3fv_with_f32_array(
                u.normal_matrix.as_ref(),
                false,
                normal_matrix.as_slice(),
            );

            let material = &mesh.material;
            let [r, g, b] = material.color.to_rgb_f32();
            gl.uniform3f(u.color.as_ref(), r, g, b);
            let [r, g, b] = material.specular.to_rgb_f32();
            gl.uniform3f(u.specular.as_ref(), r, g, b);
            gl.uniform1f(u.shininess.as_ref(), material.shininess);

            let stride = (FLOATS_PER_VERTEX * 4) as i32;
            gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&entry.buffer));
            gl.vertex_attrib_pointer_with_i32(self.position_attrib, 3, Gl::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(self.position_attrib);
            gl.vertex_attrib_pointer_with_i32(self.normal_attrib, 3, Gl::FLOAT, false, stride, 12);
            gl.enable_vertex_attrib_array(self.normal_attrib);

            gl.draw_arrays(Gl::TRIANGLES, 0, entry.vertex_count);
        }

        Ok(())
    }
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, WebGlError> {
    let shader = gl
        .create_shader(kind)
        .ok_or(WebGlError::Allocation("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        Err(WebGlError::Shader(
            gl.get_shader_info_log(&shader)
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

fn link_program(
    gl: &Gl,
    vertex_shader: &WebGlShader,
    fragment_shader: &WebGlShader,
) -> Result<WebGlProgram, WebGlError> {
    let program = gl
        .create_program()
        .ok_or(WebGlError::Allocation("program"))?;
    gl.attach_shader(&program, vertex_shader);
    gl.attach_shader(&program, fragment_shader);
    gl.link_program(&program);

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        Err(WebGlError::Link(
            gl.get_program_info_log(&program)
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

fn attrib_location(gl: &Gl, program: &WebGlProgram, name: &str) -> Result<u32, WebGlError> {
    let location = gl.get_attrib_location(program, name);
    u32::try_from(location).map_err(|_| WebGlError::Link(format!("missing attribute {name}")))
}
