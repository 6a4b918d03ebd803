//! Frame compositing.
//!
//! The canvas holds the RGB image the viewer sees before the current frame's
//! foreground is overlaid. Disposal of a frame happens when the next one is
//! requested, using the disposal method of the frame being replaced.

use tracing::debug;
use vexgif_core::{ColorTable, Error, Result, Rgb};

use crate::block::{DisposalMethod, GraphicControl, ImageDescriptor};
use crate::lzw::PixelSink;

/// Interlace passes as `(first row, row step)`.
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Map the `row`-th decoded line of an interlaced image to its scanline.
///
/// Rows at or past `height` map to an index at or past `height`.
pub fn interlaced_line_index(height: usize, row: usize) -> usize {
    let mut row = row;
    for (start, step) in INTERLACE_PASSES {
        let rows = if height > start {
            (height - start + step - 1) / step
        } else {
            0
        };
        if row < rows {
            return start + row * step;
        }
        row -= rows;
    }
    height + row
}

/// `len` copies of `value`, or `OutOfMemory` when the allocation fails.
fn filled_buffer(len: usize, value: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { bytes: len })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// One decoded image, clipped to the logical screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Descriptor as read from the file.
    pub descriptor: ImageDescriptor,
    /// Visible width after clipping.
    pub width: u16,
    /// Visible height after clipping.
    pub height: u16,
    /// Local color table, if the image declares one.
    pub local_palette: Option<ColorTable>,
    /// Graphic control in effect for this image.
    pub control: GraphicControl,
    indices: Vec<u8>,
}

impl Frame {
    /// Create a frame for `descriptor` clipped to a `screen_width`x`screen_height` screen.
    ///
    /// Every index starts as `fill`.
    pub fn new(
        descriptor: ImageDescriptor,
        screen_width: u16,
        screen_height: u16,
        local_palette: Option<ColorTable>,
        control: GraphicControl,
        fill: u8,
    ) -> Result<Self> {
        let width = descriptor
            .width
            .min(screen_width.saturating_sub(descriptor.left));
        let height = descriptor
            .height
            .min(screen_height.saturating_sub(descriptor.top));

        Ok(Self {
            descriptor,
            width,
            height,
            local_palette,
            control,
            indices: filled_buffer(width as usize * height as usize, fill)?,
        })
    }

    /// Left edge on the logical screen.
    pub fn left(&self) -> u16 {
        self.descriptor.left
    }

    /// Top edge on the logical screen.
    pub fn top(&self) -> u16 {
        self.descriptor.top
    }

    /// Whether the image data is stored interlaced.
    pub fn interlaced(&self) -> bool {
        self.descriptor.interlaced
    }

    /// Palette indices of the visible rectangle, row-major.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Index at (`x`, `y`) relative to the frame's top-left corner.
    pub fn index_at(&self, x: u16, y: u16) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// The local table if present, otherwise `global`.
    pub fn palette<'a>(&'a self, global: &'a ColorTable) -> &'a ColorTable {
        self.local_palette.as_ref().unwrap_or(global)
    }

    /// Sink that places decoded indices into this frame.
    pub fn raster(&mut self) -> FrameRaster<'_> {
        FrameRaster {
            declared_width: self.descriptor.width as usize,
            declared_height: self.descriptor.height as usize,
            visible_width: self.width as usize,
            visible_height: self.height as usize,
            interlaced: self.descriptor.interlaced,
            indices: &mut self.indices,
        }
    }
}

/// Pixel sink addressing the declared image size, keeping only the visible part.
pub struct FrameRaster<'a> {
    indices: &'a mut [u8],
    declared_width: usize,
    declared_height: usize,
    visible_width: usize,
    visible_height: usize,
    interlaced: bool,
}

impl PixelSink for FrameRaster<'_> {
    fn pixel_count(&self) -> usize {
        self.declared_width.saturating_mul(self.declared_height)
    }

    #[inline]
    fn put(&mut self, offset: usize, index: u8) {
        if self.declared_width == 0 {
            return;
        }
        let x = offset % self.declared_width;
        let mut y = offset / self.declared_width;
        if y >= self.declared_height {
            return;
        }
        if self.interlaced {
            y = interlaced_line_index(self.declared_height, y);
        }
        if x < self.visible_width && y < self.visible_height {
            self.indices[y * self.visible_width + x] = index;
        }
    }
}

/// RGB pixels of the logical screen, 3 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    rgb: Vec<u8>,
}

impl Canvas {
    /// Create a canvas filled with `color`.
    pub fn new(width: u16, height: u16, color: Rgb) -> Result<Self> {
        let mut canvas = Self {
            width,
            height,
            rgb: filled_buffer(width as usize * height as usize * 3, 0)?,
        };
        canvas.fill(color);
        Ok(canvas)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Size of an RGB buffer covering the whole canvas.
    pub fn byte_len(&self) -> usize {
        self.rgb.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgb
    }

    /// Color at (`x`, `y`).
    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 3;
        Some(Rgb::new(self.rgb[at], self.rgb[at + 1], self.rgb[at + 2]))
    }

    /// Paint every pixel.
    pub fn fill(&mut self, color: Rgb) {
        let color = color.to_array();
        for px in self.rgb.chunks_exact_mut(3) {
            px.copy_from_slice(&color);
        }
    }

    /// Paint a rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, left: u16, top: u16, width: u16, height: u16, color: Rgb) {
        let x0 = left.min(self.width) as usize;
        let x1 = left.saturating_add(width).min(self.width) as usize;
        let y0 = top.min(self.height) as usize;
        let y1 = top.saturating_add(height).min(self.height) as usize;
        let stride = self.width as usize * 3;
        let color = color.to_array();

        for y in y0..y1 {
            let row = &mut self.rgb[y * stride + x0 * 3..y * stride + x1 * 3];
            for px in row.chunks_exact_mut(3) {
                px.copy_from_slice(&color);
            }
        }
    }
}

/// Overlay `frame` onto an RGB buffer of `screen_width` pixels per row.
///
/// Pixels equal to the active transparent index leave the buffer untouched.
pub fn render_frame_rect(frame: &Frame, palette: &ColorTable, screen_width: u16, buffer: &mut [u8]) {
    let transparent = frame.control.transparent();
    let stride = screen_width as usize * 3;
    let width = frame.width as usize;
    if width == 0 {
        return;
    }

    for (j, row) in frame.indices.chunks_exact(width).enumerate() {
        let start = (frame.top() as usize + j) * stride + frame.left() as usize * 3;
        let Some(target) = buffer.get_mut(start..start + width * 3) else {
            break;
        };
        for (&index, px) in row.iter().zip(target.chunks_exact_mut(3)) {
            if transparent == Some(index) {
                continue;
            }
            px.copy_from_slice(&palette.get(index).to_array());
        }
    }
}

/// Persistent canvas plus the frame currently on display.
///
/// A disposed frame stays available as metadata until the next frame or a
/// reset, but is no longer overlaid when rendering.
#[derive(Debug, Clone)]
pub struct Compositor {
    canvas: Canvas,
    background: Rgb,
    current: Option<Frame>,
    disposed: bool,
}

impl Compositor {
    /// Create a compositor whose canvas starts as `background`.
    pub fn new(width: u16, height: u16, background: Rgb) -> Result<Self> {
        Ok(Self {
            canvas: Canvas::new(width, height, background)?,
            background,
            current: None,
            disposed: false,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Most recent frame, disposed or not.
    pub fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    /// Whether the most recent frame has already been retired to the canvas.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Retire the current frame according to its disposal method.
    ///
    /// `RestoreBackground` paints the frame's rectangle with the background
    /// color. `RestorePrevious` leaves the canvas as it was before the frame.
    /// Every other method commits the frame's opaque pixels to the canvas.
    /// Disposing twice has no further effect.
    pub fn dispose_current(&mut self, global: &ColorTable) {
        let Some(frame) = self.current.as_ref().filter(|_| !self.disposed) else {
            return;
        };
        self.disposed = true;

        debug!(disposal = ?frame.control.disposal, left = frame.left(), top = frame.top(), "Disposing frame");
        match frame.control.disposal {
            DisposalMethod::RestoreBackground => {
                self.canvas.fill_rect(
                    frame.left(),
                    frame.top(),
                    frame.width,
                    frame.height,
                    self.background,
                );
            }
            DisposalMethod::RestorePrevious => {}
            DisposalMethod::None | DisposalMethod::DoNotDispose => {
                let width = self.canvas.width;
                render_frame_rect(frame, frame.palette(global), width, &mut self.canvas.rgb);
            }
        }
    }

    /// Make `frame` the frame on display. The previous one must already be disposed.
    pub fn set_frame(&mut self, frame: Frame) {
        self.current = Some(frame);
        self.disposed = false;
    }

    /// Write the canvas with the current frame overlaid into `buffer`.
    pub fn render(&self, global: &ColorTable, buffer: &mut [u8]) -> Result<()> {
        let needed = self.canvas.byte_len();
        if buffer.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        }

        buffer[..needed].copy_from_slice(&self.canvas.rgb);
        if let Some(frame) = self.current.as_ref().filter(|_| !self.disposed) {
            render_frame_rect(frame, frame.palette(global), self.canvas.width, &mut buffer[..needed]);
        }
        Ok(())
    }

    /// Forget the current frame and repaint the canvas with the background.
    pub fn reset(&mut self) {
        self.current = None;
        self.disposed = false;
        self.canvas.fill(self.background);
    }
}
