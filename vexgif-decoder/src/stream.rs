//! Pull-based GIF frame stream.

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};
use vexgif_core::{
    ByteSource, ColorTable, DecodeError, Error, FileSource, FormatError, MemorySource, Result, Rgb,
};

use crate::block::{
    BlockReader, Extension, ExtensionHandler, GraphicControl, LogicalScreenDescriptor,
    EXTENSION_INTRODUCER, IMAGE_SEPARATOR, TRAILER,
};
use crate::compositor::{Canvas, Compositor, Frame};
use crate::config::DecoderConfig;
use crate::lzw::{CodeReader, LzwDecoder, Termination};

/// Where a stream is in its frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Positioned at the start of the animation, nothing decoded yet.
    Open,
    /// A frame has been decoded and can be rendered.
    FrameReady,
    /// The trailer or a decode error was reached; only `rewind` continues.
    Exhausted,
}

impl StreamState {
    /// Lowercase name used in state errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Open => "open",
            StreamState::FrameReady => "frame ready",
            StreamState::Exhausted => "exhausted",
        }
    }
}

/// Result of [`GifStream::next_frame`].
#[derive(Debug)]
pub enum FrameStatus {
    /// A new frame is composited and ready to render.
    Produced,
    /// The trailer was reached.
    Ended,
    /// The block sequence is malformed; the animation ends here.
    Failed(DecodeError),
}

impl FrameStatus {
    pub fn is_produced(&self) -> bool {
        matches!(self, FrameStatus::Produced)
    }
}

/// An open GIF: screen, palettes and the frame compositor over a byte source.
///
/// One caller owns the stream at a time. The RGB destination passed to
/// [`render_frame`](Self::render_frame) is never retained.
pub struct GifStream<S = FileSource> {
    source: S,
    config: DecoderConfig,
    screen: LogicalScreenDescriptor,
    global_palette: ColorTable,
    compositor: Compositor,
    pending_control: GraphicControl,
    loop_count: Option<u16>,
    animation_start: u64,
    state: StreamState,
    frame_index: usize,
    handler: Option<Box<dyn ExtensionHandler>>,
}

impl GifStream<FileSource> {
    /// Open a GIF file, reading from the file as frames are requested.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, DecoderConfig::default())
    }

    /// Open a GIF file with explicit decoder settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        let source = FileSource::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opening GIF file");
        Self::from_source(source, config)
    }
}

impl GifStream<MemorySource> {
    /// Load a whole GIF file into memory and open it.
    pub fn open_in_memory(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        Self::from_source(MemorySource::open(path)?, config)
    }

    /// Open a GIF held in memory.
    pub fn from_bytes(bytes: impl Into<std::sync::Arc<[u8]>>) -> Result<Self> {
        Self::from_source(MemorySource::new(bytes), DecoderConfig::default())
    }
}

impl<S: ByteSource> GifStream<S> {
    /// Read the header, screen descriptor and global color table from `source`.
    pub fn from_source(mut source: S, config: DecoderConfig) -> Result<Self> {
        config.validate()?;

        let mut reader = BlockReader::new(&mut source);
        reader.read_header(&config)?;
        let screen = reader.read_screen_descriptor()?;

        if screen.width == 0
            || screen.height == 0
            || screen.width > config.max_width
            || screen.height > config.max_height
        {
            return Err(FormatError::DimensionsExceeded {
                width: screen.width,
                height: screen.height,
                max_width: config.max_width,
                max_height: config.max_height,
            }
            .into());
        }

        let global_palette = ColorTable::read(&mut source, screen.global_color_table_size)?;
        let animation_start = source.position()?;
        let background = global_palette.get(screen.background_index);

        debug!(
            width = screen.width,
            height = screen.height,
            colors = global_palette.len(),
            background_index = screen.background_index,
            animation_start,
            "Opened GIF stream"
        );

        Ok(Self {
            source,
            config,
            screen,
            compositor: Compositor::new(screen.width, screen.height, background)?,
            global_palette,
            pending_control: GraphicControl::default(),
            loop_count: None,
            animation_start,
            state: StreamState::Open,
            frame_index: 0,
            handler: None,
        })
    }

    /// Install a handler for plain text, comment and application extensions.
    pub fn set_extension_handler(&mut self, handler: impl ExtensionHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Builder form of [`set_extension_handler`](Self::set_extension_handler).
    pub fn with_extension_handler(mut self, handler: impl ExtensionHandler + 'static) -> Self {
        self.set_extension_handler(handler);
        self
    }

    /// Decode the next frame.
    ///
    /// The previous frame is disposed first. Malformed input ends the
    /// animation with [`FrameStatus::Failed`]; only errors unrelated to the
    /// file contents are returned as `Err`.
    pub fn next_frame(&mut self) -> Result<FrameStatus> {
        if self.state == StreamState::Exhausted {
            return Err(Error::invalid_state("next_frame", self.state.as_str()));
        }

        self.compositor.dispose_current(&self.global_palette);

        match self.read_next_image() {
            Ok(Some(frame)) => {
                self.compositor.set_frame(frame);
                self.frame_index += 1;
                self.state = StreamState::FrameReady;
                Ok(FrameStatus::Produced)
            }
            Ok(None) => {
                debug!(frames = self.frame_index, "Reached trailer");
                self.state = StreamState::Exhausted;
                Ok(FrameStatus::Ended)
            }
            Err(err) => {
                let offset = self.source.position().unwrap_or_default();
                let err = match err {
                    Error::Decode(err) => err,
                    Error::Format(err) => DecodeError::Format(err),
                    Error::Io(err) if err.kind() == ErrorKind::UnexpectedEof => {
                        DecodeError::UnexpectedEnd { offset }
                    }
                    Error::Io(err) => DecodeError::Io(err),
                    other => return Err(other),
                };
                warn!(frame = self.frame_index, error = %err, "GIF decode failed");
                self.state = StreamState::Exhausted;
                Ok(FrameStatus::Failed(err))
            }
        }
    }

    /// Write the composited RGB image (3 bytes per pixel, row-major) into `buffer`.
    pub fn render_frame(&self, buffer: &mut [u8]) -> Result<()> {
        self.compositor.render(&self.global_palette, buffer)
    }

    /// Go back to the first frame.
    ///
    /// Allowed once a frame has been produced or the stream is exhausted.
    pub fn rewind(&mut self) -> Result<()> {
        if self.state == StreamState::Open {
            return Err(Error::invalid_state("rewind", self.state.as_str()));
        }

        self.source.seek(SeekFrom::Start(self.animation_start))?;
        self.compositor.reset();
        self.pending_control = GraphicControl::default();
        self.frame_index = 0;
        self.state = StreamState::Open;
        debug!(offset = self.animation_start, "Rewound GIF stream");
        Ok(())
    }

    /// Release the byte source.
    pub fn close(mut self) -> Result<()> {
        self.source.close()
    }

    /// Whether `color` is the background color of the active palette.
    pub fn is_background_color(&self, color: Rgb) -> bool {
        self.active_palette().get(self.screen.background_index) == color
    }

    /// Palette of the current frame, or the global palette before the first frame.
    pub fn active_palette(&self) -> &ColorTable {
        match self.compositor.current() {
            Some(frame) => frame.palette(&self.global_palette),
            None => &self.global_palette,
        }
    }

    pub fn width(&self) -> u16 {
        self.screen.width
    }

    pub fn height(&self) -> u16 {
        self.screen.height
    }

    /// Size of the RGB buffer `render_frame` fills.
    pub fn frame_buffer_len(&self) -> usize {
        self.compositor.canvas().byte_len()
    }

    /// Bits per primary color from the screen descriptor.
    pub fn color_depth(&self) -> u8 {
        self.screen.color_resolution
    }

    pub fn background_index(&self) -> u8 {
        self.screen.background_index
    }

    pub fn global_palette(&self) -> &ColorTable {
        &self.global_palette
    }

    pub fn screen_descriptor(&self) -> &LogicalScreenDescriptor {
        &self.screen
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// `NETSCAPE2.0` loop count, once its extension has been read (0 = forever).
    pub fn loop_count(&self) -> Option<u16> {
        self.loop_count
    }

    /// The most recently decoded frame.
    ///
    /// Still available after [`FrameStatus::Ended`]; cleared by `rewind`.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.compositor.current()
    }

    /// Graphic control of the current frame.
    pub fn graphic_control(&self) -> Option<&GraphicControl> {
        self.compositor.current().map(|frame| &frame.control)
    }

    /// Display time of the current frame.
    pub fn delay(&self) -> Duration {
        self.graphic_control()
            .map(GraphicControl::delay)
            .unwrap_or_default()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Frames produced since opening or the last rewind.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Offset of the first block after the global color table.
    pub fn animation_start(&self) -> u64 {
        self.animation_start
    }

    /// Canvas as it stands before the current frame is overlaid.
    pub fn canvas(&self) -> &Canvas {
        self.compositor.canvas()
    }

    /// Walk blocks up to the next image and decode it. `None` at the trailer.
    fn read_next_image(&mut self) -> Result<Option<Frame>> {
        loop {
            let offset = self.source.position()?;
            let mut introducer = [0u8; 1];
            if self.source.read(&mut introducer)? == 0 {
                return Err(DecodeError::UnexpectedEnd { offset }.into());
            }

            match introducer[0] {
                TRAILER => return Ok(None),
                IMAGE_SEPARATOR => return self.read_image().map(Some),
                EXTENSION_INTRODUCER => {
                    let extension = BlockReader::new(&mut self.source)
                        .read_extension(self.handler.as_deref_mut())?;
                    match extension {
                        Extension::GraphicControl(control) => self.pending_control = control,
                        Extension::LoopCount(count) => self.loop_count = Some(count),
                        _ => {}
                    }
                }
                byte => return Err(DecodeError::UnexpectedBlock { byte, offset }.into()),
            }
        }
    }

    fn read_image(&mut self) -> Result<Frame> {
        let descriptor = BlockReader::new(&mut self.source).read_image_descriptor()?;
        if descriptor.left >= self.screen.width || descriptor.top >= self.screen.height {
            return Err(DecodeError::FrameOutOfBounds {
                left: descriptor.left,
                top: descriptor.top,
                width: self.screen.width,
                height: self.screen.height,
            }
            .into());
        }

        let local_palette = if descriptor.has_local_color_table {
            Some(ColorTable::read(
                &mut self.source,
                descriptor.local_color_table_size,
            )?)
        } else {
            None
        };

        let control = std::mem::take(&mut self.pending_control);
        let mut frame = Frame::new(
            descriptor,
            self.screen.width,
            self.screen.height,
            local_palette,
            control,
            self.screen.background_index,
        )?;

        let min_code_size = self.source.read_u8()?;
        let mut decoder = LzwDecoder::new(min_code_size)?;
        let mut reader = CodeReader::new(&mut self.source);
        let summary = decoder.decode(&mut reader, &mut frame.raster())?;
        reader.finish()?;

        match summary.termination {
            Termination::InvalidCode(code) => {
                warn!(code, pixels = summary.pixels, "Invalid LZW code, image truncated");
            }
            Termination::EndOfData | Termination::StopCode
                if summary.pixels < usize::from(descriptor.width) * usize::from(descriptor.height) =>
            {
                warn!(pixels = summary.pixels, "Image data ended early");
            }
            _ => {}
        }

        debug!(
            index = self.frame_index,
            left = descriptor.left,
            top = descriptor.top,
            width = frame.width,
            height = frame.height,
            interlaced = descriptor.interlaced,
            local_palette = frame.local_palette.is_some(),
            delay_cs = frame.control.delay_cs,
            codes = summary.codes,
            "Decoded frame"
        );
        Ok(frame)
    }
}

impl<S> std::fmt::Debug for GifStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifStream")
            .field("width", &self.screen.width)
            .field("height", &self.screen.height)
            .field("state", &self.state)
            .field("frame_index", &self.frame_index)
            .field("loop_count", &self.loop_count)
            .finish_non_exhaustive()
    }
}
