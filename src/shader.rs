//! GLSL generation for the layered compositor.
//!
//! The fragment shader samples one texture per layer and folds them into a
//! single colour with a fixed additive rule, so the whole stack is drawn with
//! one `drawArrays` call over a full-target quad. Nothing here touches a GPU
//! context; the sources are plain strings built once per layer count.

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::CompositorError;

/// Vertex attribute carrying the unit-square coordinate.
pub const ATTRIBUTE: &str = "a_uv";

/// Unit square as a triangle strip: top-left, bottom-left, top-right, bottom-right.
pub const QUAD: [f32; 8] = [0., 1., 0., 0., 1., 1., 1., 0.];

/// Vertices in [`QUAD`].
pub const QUAD_VERTEX_COUNT: i32 = 4;

/// Components per vertex in [`QUAD`].
pub const QUAD_COMPONENTS: i32 = 2;

/// Number of composited layers. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerCount(NonZeroUsize);

impl LayerCount {
    pub fn new(n: usize) -> Result<Self, CompositorError> {
        NonZeroUsize::new(n)
            .map(LayerCount)
            .ok_or(CompositorError::InvalidLayerCount(n))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Layer indices in the order they are declared and composited.
    pub fn indices(self) -> std::ops::Range<usize> {
        0..self.get()
    }
}

impl Default for LayerCount {
    fn default() -> Self {
        LayerCount(NonZeroUsize::MIN)
    }
}

impl fmt::Display for LayerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Name of the sampler uniform for layer `index`.
pub fn sampler_name(index: usize) -> String {
    format!("tile{index}")
}

/// Vertex stage: maps `[0,1]` to clip space `[-1,1]` and forwards the
/// coordinate as `uv`.
pub fn vertex_source() -> &'static str {
    r#"#version 300 es
in vec2 a_uv;
out vec2 uv;

void main() {
  uv = a_uv;
  vec2 full_pos = 2. * a_uv - 1.;
  gl_Position = vec4(full_pos, 0., 1.);
}
"#
}

const FRAGMENT_HEADER: &str = r#"#version 300 es
precision highp int;
precision highp float;
precision highp sampler2D;
in vec2 uv;
out vec4 fragcolor;
"#;

const COMPOSITE_FN: &str = r#"
vec3 composite(vec3 target, vec4 source) {
  target += source.rgb * source.a;
  return target;
}
"#;

/// Fragment stage for `layers` textures.
///
/// Declarations and composite calls are emitted in increasing layer order so
/// the logged source is identical from run to run. Alpha is written as 1.0.
pub fn fragment_source(layers: LayerCount) -> String {
    let samplers: String = layers
        .indices()
        .map(|i| format!("uniform sampler2D {};\n", sampler_name(i)))
        .collect();
    let calls: String = layers
        .indices()
        .map(|i| {
            format!(
                "  color = composite(color, texture({}, uv));\n",
                sampler_name(i)
            )
        })
        .collect();

    format!(
        "{FRAGMENT_HEADER}{samplers}{COMPOSITE_FN}
void main() {{
  vec3 color = vec3(0., 0., 0.);
{calls}  fragcolor = vec4(clamp(color, 0., 1.), 1.);
}}
"
    )
}

/// Both stages for one layer count, built once.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    layers: LayerCount,
    vertex: &'static str,
    fragment: String,
}

impl ShaderSources {
    pub fn build(layers: LayerCount) -> Self {
        ShaderSources {
            layers,
            vertex: vertex_source(),
            fragment: fragment_source(layers),
        }
    }

    pub fn layers(&self) -> LayerCount {
        self.layers
    }

    pub fn vertex(&self) -> &str {
        self.vertex
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

/// Host-side mirror of the vertex stage's position transform.
pub fn clip_position(uv: [f32; 2]) -> [f32; 2] {
    [2. * uv[0] - 1., 2. * uv[1] - 1.]
}
