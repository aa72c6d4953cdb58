#![forbid(unsafe_code)]

pub mod composite;
pub mod config;
pub mod error;
pub mod shader;
pub mod tile;

pub use composite::{composite, upload_count, SoftwareCompositor};
pub use config::{CompositorConfig, Filter};
pub use error::{CompositorError, ShaderStage};
pub use shader::{LayerCount, ShaderSources};
pub use tile::Tile;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use log::{info, warn};
    use wasm_bindgen::prelude::*;

    use crate::config::CompositorConfig;

    pub mod logging;
    pub mod render;

    pub use render::{LayerCompositor, TextureSource};

    /// Reads the config from the page URL and, if the configured canvas is on
    /// the page, starts the demo loop. Otherwise the compositor is only
    /// available to scripts through `LayerCompositor`.
    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let query = window.location().search().unwrap_or_default();
        let parsed = CompositorConfig::from_query(&query);
        let config = match &parsed {
            Ok(config) => config.clone(),
            Err(_) => CompositorConfig::default(),
        };
        logging::init(config.log_level);
        if let Err(err) = parsed {
            warn!("{err}; using defaults");
        }

        let document = window.document().ok_or("no document")?;
        let Some(element) = document.get_element_by_id(&config.canvas_id) else {
            info!("no canvas '{}' on page, demo loop not started", config.canvas_id);
            return Ok(());
        };
        let canvas = element.dyn_into::<web_sys::HtmlCanvasElement>()?;

        render::start(canvas, &config)?;
        Ok(())
    }
}
