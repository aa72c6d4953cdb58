//! Owned RGBA8 images used as layer sources.

use crate::error::CompositorError;

/// A decoded image: `width * height` pixels, four bytes each, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Tile {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, CompositorError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CompositorError::TileSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Tile {
            width,
            height,
            rgba,
        })
    }

    /// Caller guarantees `rgba.len() == width * height * 4`.
    pub(crate) fn from_parts(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), width as usize * height as usize * 4);
        Tile {
            width,
            height,
            rgba,
        }
    }

    /// Every pixel set to `color`.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Tile {
            width,
            height,
            rgba: color.repeat(pixels),
        }
    }

    /// Checkerboard of `cell`-sized squares alternating `a` and `b`.
    pub fn checker(width: u32, height: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let even = ((x / cell) + (y / cell)) % 2 == 0;
                rgba.extend_from_slice(if even { &a } else { &b });
            }
        }
        Tile {
            width,
            height,
            rgba,
        }
    }

    /// Demo content for layer `index`: a checker in one primary channel with
    /// partial alpha so stacked layers visibly add up.
    pub fn for_layer(index: usize, size: u32) -> Self {
        const PALETTE: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
        let mut color = PALETTE[index % PALETTE.len()];
        color[3] = 255 / ((index / PALETTE.len()).min(254) as u8 + 1);
        let cell = (size / 8)
            .max(1)
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1));
        Tile::checker(size, size, cell, color, [0, 0, 0, 0])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Pixel at column `x`, row `y` (row 0 is the top).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_rejected() {
        let err = Tile::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::TileSize {
                expected: 16,
                actual: 15,
                ..
            }
        ));
        assert!(Tile::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn checker_alternates() {
        let white = [255, 255, 255, 255];
        let black = [0, 0, 0, 255];
        let tile = Tile::checker(4, 4, 2, white, black);
        assert_eq!(tile.pixel(0, 0), white);
        assert_eq!(tile.pixel(1, 1), white);
        assert_eq!(tile.pixel(2, 0), black);
        assert_eq!(tile.pixel(0, 2), black);
        assert_eq!(tile.pixel(3, 3), white);
    }

    #[test]
    fn layer_tiles_differ() {
        let a = Tile::for_layer(0, 16);
        let b = Tile::for_layer(1, 16);
        assert_eq!(a.width(), 16);
        assert_eq!(a.rgba().len(), 16 * 16 * 4);
        assert_ne!(a, b);
        assert_eq!(Tile::for_layer(3, 16).pixel(0, 0)[3], 127);
    }

    #[test]
    fn high_layer_index_does_not_overflow_cell() {
        let tile = Tile::for_layer(usize::MAX, 16);
        assert_eq!(tile.rgba().len(), 16 * 16 * 4);
        // one cell covers the whole tile
        assert_eq!(tile.pixel(15, 15), tile.pixel(0, 0));
    }
}
