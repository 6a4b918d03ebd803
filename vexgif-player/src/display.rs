//! Output surface for composited frames.

use vexgif_core::Result;

/// Something that can show an RGB image.
pub trait Display {
    /// Draw a `width`x`height` image (3 bytes per pixel, row-major) with its
    /// top-left corner at (`x`, `y`). The buffer is not kept after the call.
    fn draw_rgb(&mut self, x: i32, y: i32, width: u16, height: u16, rgb: &[u8]) -> Result<()>;
}

impl<D: Display + ?Sized> Display for &mut D {
    fn draw_rgb(&mut self, x: i32, y: i32, width: u16, height: u16, rgb: &[u8]) -> Result<()> {
        (**self).draw_rgb(x, y, width, height, rgb)
    }
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn draw_rgb(&mut self, x: i32, y: i32, width: u16, height: u16, rgb: &[u8]) -> Result<()> {
        (**self).draw_rgb(x, y, width, height, rgb)
    }
}
