//! The encoded module grid and its placement on the output surface.

use crate::config::RoundBlockSizeMode;
use crate::error::EncodeError;

/// Square grid of dark and light modules, owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleMatrix {
    size: u32,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Builds a `size` x `size` grid; `dark(x, y)` is called once per module.
    pub fn from_fn(size: u32, mut dark: impl FnMut(u32, u32) -> bool) -> Self {
        let mut modules = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                modules.push(dark(x, y));
            }
        }
        Self { size, modules }
    }

    /// Width and height in modules.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns `true` for a dark module. Coordinates outside the grid are light.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size && self.modules[(y * self.size + x) as usize]
    }

    /// Iterates over the coordinates of the dark modules, row by row.
    pub fn dark_modules(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let size = self.size;
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(index, _)| (index as u32 % size, index as u32 / size))
    }
}

/// Block size and margins of a symbol, in output pixels (or output units).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    matrix_size: u32,
    block_size: f64,
    inner_size: f64,
    outer_size: u32,
    margin_left: f64,
}

impl Layout {
    /// Places a `matrix_size` grid into `pixel_size` pixels plus `margin` on each side.
    ///
    /// # Errors
    ///
    /// Fails when a block would be smaller than one pixel, which happens when the
    /// payload needs more modules than there are pixels.
    pub fn compute(
        matrix_size: u32,
        pixel_size: u32,
        margin: u32,
        mode: RoundBlockSizeMode,
    ) -> Result<Self, EncodeError> {
        if matrix_size == 0 {
            return Err("cannot lay out an empty matrix".into());
        }

        let exact = f64::from(pixel_size) / f64::from(matrix_size);
        let block_size = match mode {
            RoundBlockSizeMode::None => exact,
            RoundBlockSizeMode::Margin | RoundBlockSizeMode::Shrink => exact.floor(),
            RoundBlockSizeMode::Enlarge => exact.ceil(),
        };
        if block_size < 1.0 {
            return Err(format!(
                "too much data: {matrix_size} modules do not fit in {pixel_size}px; \
                 increase the pixel size or lower the error correction level"
            )
            .into());
        }

        let inner_size = block_size * f64::from(matrix_size);
        let outer_size = match mode {
            RoundBlockSizeMode::None | RoundBlockSizeMode::Margin => pixel_size + 2 * margin,
            RoundBlockSizeMode::Enlarge | RoundBlockSizeMode::Shrink => {
                inner_size.round() as u32 + 2 * margin
            }
        };
        let margin_left = ((f64::from(outer_size) - inner_size) / 2.0).floor();

        Ok(Self {
            matrix_size,
            block_size,
            inner_size,
            outer_size,
            margin_left,
        })
    }

    pub fn matrix_size(&self) -> u32 {
        self.matrix_size
    }

    pub fn block_size(&self) -> f64 {
        self.block_size
    }

    pub fn inner_size(&self) -> f64 {
        self.inner_size
    }

    /// Side length of the symbol including margins.
    pub fn outer_size(&self) -> u32 {
        self.outer_size
    }

    pub fn margin_left(&self) -> f64 {
        self.margin_left
    }

    /// Offset of module `index` from the outer edge.
    pub fn module_offset(&self, index: u32) -> f64 {
        self.margin_left + f64::from(index) * self.block_size
    }

    /// Module index covering the pixel at `pixel`, sampled at the pixel centre.
    pub fn module_at(&self, pixel: u32) -> Option<u32> {
        let offset = (f64::from(pixel) + 0.5 - self.margin_left) / self.block_size;
        if offset < 0.0 {
            return None;
        }
        let index = offset.floor() as u32;
        (index < self.matrix_size).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_mode_keeps_the_outer_size() {
        // 300 / 29 = 10.34 -> 10px blocks, 290px of symbol, 5px extra each side
        let layout = Layout::compute(29, 300, 10, RoundBlockSizeMode::Margin).unwrap();
        assert_eq!(layout.block_size(), 10.0);
        assert_eq!(layout.outer_size(), 320);
        assert_eq!(layout.margin_left(), 15.0);
        assert_eq!(layout.module_at(14), None);
        assert_eq!(layout.module_at(15), Some(0));
        assert_eq!(layout.module_at(304), Some(28));
        assert_eq!(layout.module_at(305), None);
    }

    #[test]
    fn enlarge_and_shrink_move_the_outer_size() {
        let enlarged = Layout::compute(29, 300, 10, RoundBlockSizeMode::Enlarge).unwrap();
        assert_eq!(enlarged.block_size(), 11.0);
        assert_eq!(enlarged.outer_size(), 29 * 11 + 20);

        let shrunk = Layout::compute(29, 300, 10, RoundBlockSizeMode::Shrink).unwrap();
        assert_eq!(shrunk.block_size(), 10.0);
        assert_eq!(shrunk.outer_size(), 29 * 10 + 20);
        assert_eq!(shrunk.margin_left(), 10.0);
    }

    #[test]
    fn none_mode_keeps_fractional_blocks() {
        let layout = Layout::compute(29, 300, 0, RoundBlockSizeMode::None).unwrap();
        assert!((layout.block_size() - 300.0 / 29.0).abs() < 1e-9);
        assert_eq!(layout.outer_size(), 300);
        assert_eq!(layout.module_at(299), Some(28));
    }

    #[test]
    fn tiny_images_are_rejected() {
        assert!(Layout::compute(57, 40, 10, RoundBlockSizeMode::Margin).is_err());
    }

    #[test]
    fn dark_modules_are_listed_row_by_row() {
        let matrix = ModuleMatrix::from_fn(3, |x, y| x == y);
        assert_eq!(matrix.dark_modules().collect::<Vec<_>>(), vec![(0, 0), (1, 1), (2, 2)]);
        assert!(!matrix.is_dark(5, 5));
    }
}
