//! CPU reference for the composite rule and the per-frame slot policy.
//!
//! `SoftwareCompositor` produces the frame the GPU path is expected to draw:
//! same accumulation, same clamping, same forced alpha, same handling of
//! short image lists. It samples nearest-neighbour regardless of the GPU
//! filter setting.

use log::trace;

use crate::shader::LayerCount;
use crate::tile::Tile;

/// Number of slots refreshed when `supplied` images arrive for `layers` slots.
///
/// Extra images are ignored; slots past the supplied count keep what they held.
pub fn upload_count(layers: LayerCount, supplied: usize) -> usize {
    layers.get().min(supplied)
}

/// Folds straight-alpha samples in order: `rgb += s.rgb * s.a`, then clamps.
/// The result is always opaque.
pub fn composite(samples: &[[f32; 4]]) -> [f32; 4] {
    let mut color = [0f32; 3];
    for s in samples {
        for (c, v) in color.iter_mut().zip(&s[..3]) {
            *c += v * s[3];
        }
    }
    [
        color[0].clamp(0., 1.),
        color[1].clamp(0., 1.),
        color[2].clamp(0., 1.),
        1.,
    ]
}

fn unorm(px: [u8; 4]) -> [f32; 4] {
    px.map(|c| c as f32 / 255.)
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0., 1.) * 255.).round() as u8
}

/// Texel picked by nearest sampling at `uv` with clamp-to-edge wrapping.
///
/// `uv.1 == 1` is the top of the image, matching an upload with vertical flip.
fn sample_nearest(tile: &Tile, uv: (f32, f32)) -> [u8; 4] {
    let (w, h) = (tile.width(), tile.height());
    if w == 0 || h == 0 {
        return [0; 4];
    }
    let x = ((uv.0 * w as f32).floor() as i64).clamp(0, w as i64 - 1) as u32;
    let y = (((1. - uv.1) * h as f32).floor() as i64).clamp(0, h as i64 - 1) as u32;
    tile.pixel(x, y)
}

/// Reference compositor with one owned slot per layer.
#[derive(Debug, Clone)]
pub struct SoftwareCompositor {
    layers: LayerCount,
    slots: Vec<Option<Tile>>,
    width: u32,
    height: u32,
}

impl SoftwareCompositor {
    /// Output frames are `width x height`.
    pub fn new(layers: LayerCount, width: u32, height: u32) -> Self {
        SoftwareCompositor {
            layers,
            slots: vec![None; layers.get()],
            width,
            height,
        }
    }

    pub fn layer_count(&self) -> LayerCount {
        self.layers
    }

    /// Refreshes the first `upload_count` slots; returns how many were written.
    pub fn load_images(&mut self, images: &[Tile]) -> usize {
        let count = upload_count(self.layers, images.len());
        for (slot, image) in self.slots.iter_mut().zip(images).take(count) {
            *slot = Some(image.clone());
        }
        trace!("software compositor loaded {count}/{} slots", self.slots.len());
        count
    }

    /// Contents of slot `index`, if anything was ever uploaded there.
    pub fn slot(&self, index: usize) -> Option<&Tile> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Composites every slot into an opaque frame. Empty slots add nothing.
    pub fn draw(&self) -> Tile {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for row in 0..self.height {
            let v = 1. - (row as f32 + 0.5) / self.height as f32;
            for col in 0..self.width {
                let u = (col as f32 + 0.5) / self.width as f32;
                let samples: Vec<[f32; 4]> = self
                    .slots
                    .iter()
                    .flatten()
                    .map(|tile| unorm(sample_nearest(tile, (u, v))))
                    .collect();
                let [r, g, b, a] = composite(&samples);
                rgba.extend_from_slice(&[to_byte(r), to_byte(g), to_byte(b), to_byte(a)]);
            }
        }
        Tile::from_parts(self.width, self.height, rgba)
    }
}
