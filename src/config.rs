//! Compositor configuration.
//!
//! Defaults match the single-layer page layout (`<canvas id="g0">`). The demo
//! entry point overrides them from the page URL, e.g.
//! `?layers=3&filter=nearest&canvas=g1&log=debug&size=128`.

use std::str::FromStr;

use log::LevelFilter;

use crate::error::CompositorError;
use crate::shader::LayerCount;

/// Largest accepted demo tile edge, in pixels.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Texture magnification/minification filter for every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

impl FromStr for Filter {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Filter::Linear),
            "nearest" => Ok(Filter::Nearest),
            _ => Err(CompositorError::Config {
                key: "filter".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositorConfig {
    /// DOM id of the target canvas.
    pub canvas_id: String,
    pub layer_count: LayerCount,
    pub filter: Filter,
    /// Defaults to `Info`, which includes the generated fragment shader.
    pub log_level: LevelFilter,
    /// Edge length of the generated demo tiles, in pixels.
    pub tile_size: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        CompositorConfig {
            canvas_id: "g0".to_string(),
            layer_count: LayerCount::default(),
            filter: Filter::default(),
            log_level: LevelFilter::Info,
            tile_size: 256,
        }
    }
}

fn invalid(key: &str, value: &str) -> CompositorError {
    CompositorError::Config {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl CompositorConfig {
    /// Defaults overridden by `key=value` pairs from a URL query string.
    ///
    /// A leading `?` is optional. Unknown keys and pairs without `=` are ignored.
    pub fn from_query(query: &str) -> Result<Self, CompositorError> {
        let mut config = CompositorConfig::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "canvas" => {
                    if value.is_empty() {
                        return Err(invalid(key, value));
                    }
                    config.canvas_id = value.to_string();
                }
                "layers" => {
                    let n: usize = value.parse().map_err(|_| invalid(key, value))?;
                    config.layer_count = LayerCount::new(n).map_err(|_| invalid(key, value))?;
                }
                "filter" => config.filter = value.parse()?,
                "log" => {
                    config.log_level = value.parse().map_err(|_| invalid(key, value))?;
                }
                "size" => {
                    config.tile_size = match value.parse() {
                        Ok(n) if (1..=MAX_TILE_SIZE).contains(&n) => n,
                        _ => return Err(invalid(key, value)),
                    };
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_default() {
        assert_eq!(CompositorConfig::from_query("").unwrap(), CompositorConfig::default());
        assert_eq!(CompositorConfig::from_query("?").unwrap(), CompositorConfig::default());
    }

    #[test]
    fn overrides_applied() {
        let config =
            CompositorConfig::from_query("?layers=3&filter=Nearest&canvas=g2&log=debug&size=64")
                .unwrap();
        assert_eq!(config.layer_count.get(), 3);
        assert_eq!(config.filter, Filter::Nearest);
        assert_eq!(config.canvas_id, "g2");
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.tile_size, 64);
    }

    #[test]
    fn default_level_includes_info() {
        assert!(log::Level::Info <= CompositorConfig::default().log_level);
        let quiet = CompositorConfig::from_query("log=warn").unwrap();
        assert!(log::Level::Info > quiet.log_level);
    }

    #[test]
    fn largest_tile_size_accepted() {
        let config = CompositorConfig::from_query("size=4096").unwrap();
        assert_eq!(config.tile_size, MAX_TILE_SIZE);
    }

    #[test]
    fn unknown_keys_ignored() {
        let config = CompositorConfig::from_query("theme=dark&flag&layers=2").unwrap();
        assert_eq!(config.layer_count.get(), 2);
        assert_eq!(config.canvas_id, "g0");
    }

    #[test]
    fn bad_values_rejected() {
        let queries = [
            "layers=0",
            "layers=two",
            "filter=cubic",
            "log=loud",
            "size=0",
            "size=4097",
            "size=2147483648",
            "canvas=",
        ];
        for query in queries {
            let err = CompositorConfig::from_query(query).unwrap_err();
            assert!(matches!(err, CompositorError::Config { .. }), "{query}: {err}");
        }
    }
}
