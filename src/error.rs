//! Compositor error types.

use std::fmt;

use thiserror::Error;

/// Pipeline stage a shader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors from building or driving the compositor.
///
/// `ShaderCompile` and `ProgramLink` are reported through `log` and never
/// returned from construction: the shader text is fixed at build time, so a
/// failure points at the environment and the compositor carries on with
/// whatever program state the driver left behind.
#[derive(Error, Debug)]
pub enum CompositorError {
    /// The driver rejected one of the generated shaders.
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// The compiled shaders did not link into a program.
    #[error("program failed to link: {log}")]
    ProgramLink { log: String },

    /// A compositor needs at least one layer.
    #[error("layer count must be at least 1, got {0}")]
    InvalidLayerCount(usize),

    /// More layers than the context has fragment texture units.
    #[error("{requested} layers requested but only {available} texture units are available")]
    TooManyLayers { requested: usize, available: usize },

    /// The context returned no object from a `create*` call.
    #[error("failed to create {0}")]
    Resource(&'static str),

    /// The rendering surface or WebGL2 context could not be obtained.
    #[error("context unavailable: {0}")]
    Context(String),

    /// The context refused an image upload for one layer.
    #[error("upload to layer {layer} failed: {reason}")]
    Upload { layer: usize, reason: String },

    /// A tile's byte buffer does not match its dimensions.
    #[error("tile is {width}x{height} and needs {expected} bytes, got {actual}")]
    TileSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A configuration value could not be parsed.
    #[error("invalid value '{value}' for config key '{key}'")]
    Config { key: String, value: String },
}

#[cfg(target_arch = "wasm32")]
impl From<CompositorError> for wasm_bindgen::JsValue {
    fn from(err: CompositorError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = CompositorError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "ERROR: 0:7: 'tile3' : undeclared identifier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: ERROR: 0:7: 'tile3' : undeclared identifier"
        );

        let err = CompositorError::TooManyLayers {
            requested: 40,
            available: 16,
        };
        assert!(err.to_string().contains("40"));
        assert!(err.to_string().contains("16"));

        let err = CompositorError::Config {
            key: "layers".to_string(),
            value: "many".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value 'many' for config key 'layers'");
    }
}
