use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Float32Array};
use log::{debug, error, info, warn};
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};
use web_sys::{
    window, HtmlCanvasElement, ImageData, WebGl2RenderingContext as GL, WebGlBuffer,
    WebGlProgram, WebGlShader, WebGlTexture, WebGlVertexArrayObject,
};

use crate::composite::upload_count;
use crate::config::{CompositorConfig, Filter};
use crate::error::{CompositorError, ShaderStage};
use crate::shader::{self, LayerCount, ShaderSources};
use crate::tile::Tile;

/// Anything that can be written into the currently bound `TEXTURE_2D` as
/// RGBA / UNSIGNED_BYTE.
pub trait TextureSource {
    fn upload(&self, gl: &GL) -> Result<(), JsValue>;
}

impl TextureSource for Tile {
    fn upload(&self, gl: &GL) -> Result<(), JsValue> {
        gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            GL::TEXTURE_2D,
            0,
            GL::RGBA as i32,
            self.width() as i32,
            self.height() as i32,
            0,
            GL::RGBA,
            GL::UNSIGNED_BYTE,
            Some(self.rgba()),
        )
    }
}

impl TextureSource for ImageData {
    fn upload(&self, gl: &GL) -> Result<(), JsValue> {
        gl.tex_image_2d_with_u32_and_u32_and_image_data(
            GL::TEXTURE_2D,
            0,
            GL::RGBA as i32,
            GL::RGBA,
            GL::UNSIGNED_BYTE,
            self,
        )
    }
}

/// One layer: a texture permanently bound to its own unit.
struct TextureSlot {
    unit: u32,
    texture: WebGlTexture,
}

/// Composites a fixed number of textured layers onto a canvas with one draw call.
#[wasm_bindgen]
pub struct LayerCompositor {
    canvas: HtmlCanvasElement,
    gl: GL,
    sources: ShaderSources,
    program: WebGlProgram,
    _shaders: [WebGlShader; 2],
    linked: bool,
    _quad: WebGlBuffer,
    vao: WebGlVertexArrayObject,
    slots: Vec<TextureSlot>,
}

fn filter_param(filter: Filter) -> i32 {
    match filter {
        Filter::Linear => GL::LINEAR as i32,
        Filter::Nearest => GL::NEAREST as i32,
    }
}

/// Compiles `source` and attaches it to `program`. A compile failure is
/// logged and the shader is still returned.
fn compile(
    gl: &GL,
    program: &WebGlProgram,
    stage: ShaderStage,
    source: &str,
) -> Result<WebGlShader, CompositorError> {
    let kind = match stage {
        ShaderStage::Vertex => GL::VERTEX_SHADER,
        ShaderStage::Fragment => GL::FRAGMENT_SHADER,
    };
    let shader = gl
        .create_shader(kind)
        .ok_or(CompositorError::Resource("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    gl.attach_shader(program, &shader);

    let compiled = gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if !compiled {
        let err = CompositorError::ShaderCompile {
            stage,
            log: gl.get_shader_info_log(&shader).unwrap_or_default(),
        };
        error!("{err}");
    }
    Ok(shader)
}

/// Links `program`, logging the driver's message on failure.
fn link(gl: &GL, program: &WebGlProgram) -> bool {
    gl.link_program(program);
    let linked = gl
        .get_program_parameter(program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if !linked {
        let err = CompositorError::ProgramLink {
            log: gl.get_program_info_log(program).unwrap_or_default(),
        };
        error!("{err}");
    }
    linked
}

fn context(canvas: &HtmlCanvasElement) -> Result<GL, CompositorError> {
    canvas
        .get_context("webgl2")
        .map_err(|e| CompositorError::Context(format!("{e:?}")))?
        .ok_or_else(|| CompositorError::Context("WebGL2 not supported".to_string()))?
        .dyn_into::<GL>()
        .map_err(|_| CompositorError::Context("not a WebGL2 context".to_string()))
}

fn canvas_by_id(id: &str) -> Result<HtmlCanvasElement, CompositorError> {
    window()
        .and_then(|w| w.document())
        .ok_or_else(|| CompositorError::Context("no document".to_string()))?
        .get_element_by_id(id)
        .ok_or_else(|| CompositorError::Context(format!("canvas '{id}' not found")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| CompositorError::Context(format!("'{id}' is not a canvas")))
}

impl LayerCompositor {
    /// Builds the program, quad and one texture unit per layer on `canvas`.
    pub fn new(
        canvas: HtmlCanvasElement,
        layers: LayerCount,
        filter: Filter,
    ) -> Result<Self, CompositorError> {
        let gl = context(&canvas)?;
        gl.viewport(0, 0, canvas.width() as i32, canvas.height() as i32);

        let available = gl
            .get_parameter(GL::MAX_TEXTURE_IMAGE_UNITS)
            .ok()
            .and_then(|v| v.as_f64())
            .map_or(0, |v| v as usize);
        if layers.get() > available {
            return Err(CompositorError::TooManyLayers {
                requested: layers.get(),
                available,
            });
        }

        let sources = ShaderSources::build(layers);
        info!("fragment shader for {layers} layers:\n{}", sources.fragment());

        let program = gl
            .create_program()
            .ok_or(CompositorError::Resource("program"))?;
        let vertex = compile(&gl, &program, ShaderStage::Vertex, sources.vertex())?;
        let fragment = compile(&gl, &program, ShaderStage::Fragment, sources.fragment())?;
        let linked = link(&gl, &program);
        gl.use_program(Some(&program));

        let vao = gl
            .create_vertex_array()
            .ok_or(CompositorError::Resource("vertex array"))?;
        gl.bind_vertex_array(Some(&vao));
        let quad = gl
            .create_buffer()
            .ok_or(CompositorError::Resource("buffer"))?;
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&quad));
        let vertices = Float32Array::from(&shader::QUAD[..]);
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &vertices, GL::STATIC_DRAW);

        let location = gl.get_attrib_location(&program, shader::ATTRIBUTE);
        if location < 0 {
            warn!("attribute '{}' not found in program", shader::ATTRIBUTE);
        } else {
            let stride = shader::QUAD_COMPONENTS * std::mem::size_of::<f32>() as i32;
            gl.enable_vertex_attrib_array(location as u32);
            gl.vertex_attrib_pointer_with_i32(
                location as u32,
                shader::QUAD_COMPONENTS,
                GL::FLOAT,
                false,
                stride,
                0,
            );
        }

        gl.pixel_storei(GL::UNPACK_ALIGNMENT, 1);
        gl.pixel_storei(GL::UNPACK_FLIP_Y_WEBGL, 1);

        let filter = filter_param(filter);
        let mut slots = Vec::with_capacity(layers.get());
        for i in layers.indices() {
            let unit = GL::TEXTURE0 + i as u32;
            let texture = gl
                .create_texture()
                .ok_or(CompositorError::Resource("texture"))?;

            let sampler = gl.get_uniform_location(&program, &shader::sampler_name(i));
            gl.uniform1i(sampler.as_ref(), i as i32);

            gl.active_texture(unit);
            gl.bind_texture(GL::TEXTURE_2D, Some(&texture));
            gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, GL::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, GL::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, filter);
            gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, filter);

            slots.push(TextureSlot { unit, texture });
        }

        info!(
            "compositor ready: {layers} layers on {}x{} canvas",
            canvas.width(),
            canvas.height()
        );

        Ok(LayerCompositor {
            canvas,
            gl,
            sources,
            program,
            _shaders: [vertex, fragment],
            linked,
            _quad: quad,
            vao,
            slots,
        })
    }

    /// Looks the canvas up by DOM id.
    pub fn from_canvas_id(
        id: &str,
        layers: LayerCount,
        filter: Filter,
    ) -> Result<Self, CompositorError> {
        Self::new(canvas_by_id(id)?, layers, filter)
    }

    pub fn layers(&self) -> LayerCount {
        self.sources.layers()
    }

    /// Whether the program linked. Drawing with an unlinked program renders nothing useful.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Re-uploads the first `min(layers, images.len())` slots in place.
    ///
    /// Textures are not reallocated and every unit keeps its own texture
    /// bound. Slots without a new image keep their previous contents.
    pub fn load_images<S: TextureSource>(&self, images: &[S]) -> Result<usize, CompositorError> {
        let count = upload_count(self.layers(), images.len());
        for (layer, (slot, image)) in self.slots.iter().zip(images).take(count).enumerate() {
            self.gl.active_texture(slot.unit);
            self.gl.bind_texture(GL::TEXTURE_2D, Some(&slot.texture));
            image.upload(&self.gl).map_err(|e| CompositorError::Upload {
                layer,
                reason: format!("{e:?}"),
            })?;
        }
        Ok(count)
    }

    /// Clears, uploads `images` and draws one frame.
    pub fn render_frame<S: TextureSource>(&self, images: &[S]) -> Result<(), CompositorError> {
        self.clear();
        self.load_images(images)?;
        self.draw();
        Ok(())
    }

    pub fn gl(&self) -> &GL {
        &self.gl
    }
}

fn image_data(images: &Array) -> Result<Vec<ImageData>, JsValue> {
    images
        .iter()
        .map(|v| v.dyn_into::<ImageData>().map_err(|_| JsValue::from_str("expected ImageData")))
        .collect()
}

#[wasm_bindgen]
impl LayerCompositor {
    #[wasm_bindgen(constructor)]
    pub fn create(canvas_id: &str, layer_count: usize) -> Result<LayerCompositor, JsValue> {
        Self::with_filter(canvas_id, layer_count, "linear")
    }

    #[wasm_bindgen(js_name = withFilter)]
    pub fn with_filter(
        canvas_id: &str,
        layer_count: usize,
        filter: &str,
    ) -> Result<LayerCompositor, JsValue> {
        let layers = LayerCount::new(layer_count)?;
        Ok(Self::from_canvas_id(canvas_id, layers, filter.parse::<Filter>()?)?)
    }

    #[wasm_bindgen(getter, js_name = layerCount)]
    pub fn layer_count(&self) -> usize {
        self.layers().get()
    }

    #[wasm_bindgen(getter, js_name = fragmentSource)]
    pub fn fragment_source(&self) -> String {
        self.sources.fragment().to_string()
    }

    /// Uploads an array of `ImageData`; returns how many slots were written.
    #[wasm_bindgen(js_name = loadImages)]
    pub fn load_image_data(&self, images: Array) -> Result<usize, JsValue> {
        Ok(self.load_images(&image_data(&images)?)?)
    }

    /// Clears the target to opaque black.
    pub fn clear(&self) {
        self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
        self.gl.clear(GL::COLOR_BUFFER_BIT);
    }

    /// One triangle-strip draw over the quad.
    pub fn draw(&self) {
        self.gl.use_program(Some(&self.program));
        self.gl.bind_vertex_array(Some(&self.vao));
        self.gl
            .draw_arrays(GL::TRIANGLE_STRIP, 0, shader::QUAD_VERTEX_COUNT);
    }

    /// Renders one frame from `images` and returns the canvas for chaining.
    pub fn render(&self, images: Array) -> Result<HtmlCanvasElement, JsValue> {
        self.render_frame(&image_data(&images)?)?;
        Ok(self.canvas.clone())
    }
}

/// Runs the demo: one compositor over generated tiles, redrawn every animation frame.
pub fn start(canvas: HtmlCanvasElement, config: &CompositorConfig) -> Result<(), JsValue> {
    let compositor = LayerCompositor::new(canvas, config.layer_count, config.filter)?;
    let tiles: Vec<Tile> = config
        .layer_count
        .indices()
        .map(|i| Tile::for_layer(i, config.tile_size))
        .collect();

    // `f` holds the animation-frame closure so that it can schedule itself
    // again; the `Option` lets the closure be created before it is stored.
    let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    let mut frames: u64 = 0;
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if let Err(err) = compositor.render_frame(&tiles) {
            error!("stopping render loop: {err}");
            return;
        }
        frames += 1;
        if frames % 600 == 0 {
            debug!("{frames} frames composited");
        }

        let scheduled = window().map(|w| {
            if let Some(cb) = f.borrow().as_ref() {
                w.request_animation_frame(cb.as_ref().unchecked_ref())
                    .map(|_| ())
            } else {
                Ok(())
            }
        });
        if !matches!(scheduled, Some(Ok(()))) {
            error!("failed to schedule next animation frame");
        }
    }) as Box<dyn FnMut()>));

    let window = window().ok_or("no window")?;
    if let Some(cb) = g.borrow().as_ref() {
        window.request_animation_frame(cb.as_ref().unchecked_ref())?;
    }
    Ok(())
}
