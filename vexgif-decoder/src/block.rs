//! GIF block structure: header, descriptors, extensions and sub-block chains.

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};
use vexgif_core::{ByteSource, FormatError, Result};

use crate::config::DecoderConfig;

/// Signature at the start of every GIF file.
pub const GIF_SIGNATURE: &[u8; 3] = b"GIF";
/// GIF89a version tag.
pub const VERSION_89A: &[u8; 3] = b"89a";
/// GIF87a version tag.
pub const VERSION_87A: &[u8; 3] = b"87a";

/// Extension introducer byte (`!`).
pub const EXTENSION_INTRODUCER: u8 = 0x21;
/// Image separator byte (`,`).
pub const IMAGE_SEPARATOR: u8 = 0x2C;
/// File trailer byte (`;`).
pub const TRAILER: u8 = 0x3B;

/// Plain text extension label.
pub const PLAIN_TEXT_LABEL: u8 = 0x01;
/// Graphic control extension label.
pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
/// Comment extension label.
pub const COMMENT_LABEL: u8 = 0xFE;
/// Application extension label.
pub const APPLICATION_LABEL: u8 = 0xFF;

const NETSCAPE_ID: &[u8; 8] = b"NETSCAPE";
const NETSCAPE_AUTH: &[u8; 3] = b"2.0";

/// What happens to a frame's rectangle before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum DisposalMethod {
    /// No disposal specified; the frame stays on the canvas.
    #[default]
    None,
    /// Leave the frame in place.
    DoNotDispose,
    /// Fill the frame's rectangle with the background color.
    RestoreBackground,
    /// Put back what was on the canvas before the frame was drawn.
    RestorePrevious,
}

impl DisposalMethod {
    /// Parse the disposal method from a graphic control packed byte.
    pub fn from_flags(flags: u8) -> Self {
        match (flags >> 2) & 0x07 {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::None,
        }
    }
}

/// Per-frame rendering controls from a graphic control extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicControl {
    /// Disposal applied once the frame has been shown.
    pub disposal: DisposalMethod,
    /// The frame waits for user input.
    pub user_input: bool,
    /// `transparent_index` is in effect.
    pub has_transparency: bool,
    /// Palette index that is not drawn.
    pub transparent_index: u8,
    /// Display time in hundredths of a second.
    pub delay_cs: u16,
}

impl GraphicControl {
    /// Parse the fixed 4-byte body of a graphic control extension.
    pub fn from_body(body: &[u8; 4]) -> Self {
        let flags = body[0];
        Self {
            disposal: DisposalMethod::from_flags(flags),
            user_input: flags & 0x02 != 0,
            has_transparency: flags & 0x01 != 0,
            delay_cs: LittleEndian::read_u16(&body[1..3]),
            transparent_index: body[3],
        }
    }

    /// Transparent palette index, if transparency is active.
    pub fn transparent(&self) -> Option<u8> {
        self.has_transparency.then_some(self.transparent_index)
    }

    /// Frame delay as a duration.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay_cs) * 10)
    }
}

/// GIF logical screen descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    /// Canvas width.
    pub width: u16,
    /// Canvas height.
    pub height: u16,
    /// Has global color table.
    pub has_global_color_table: bool,
    /// Color resolution in bits per primary (1-8).
    pub color_resolution: u8,
    /// Global color table is sorted.
    pub sorted: bool,
    /// Size field of the global color table (2^(n+1) entries).
    pub global_color_table_size: u8,
    /// Background color index.
    pub background_index: u8,
    /// Pixel aspect ratio.
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    /// Decode the 7-byte descriptor.
    pub fn from_bytes(raw: &[u8; 7]) -> Self {
        let packed = raw[4];
        Self {
            width: LittleEndian::read_u16(&raw[0..2]),
            height: LittleEndian::read_u16(&raw[2..4]),
            has_global_color_table: packed & 0x80 != 0,
            color_resolution: ((packed >> 4) & 0x07) + 1,
            sorted: packed & 0x08 != 0,
            global_color_table_size: packed & 0x07,
            background_index: raw[5],
            pixel_aspect_ratio: raw[6],
        }
    }
}

/// Image descriptor that starts every image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// A local color table follows the descriptor.
    pub has_local_color_table: bool,
    /// Rows are stored in four interlace passes.
    pub interlaced: bool,
    /// Size field of the local color table.
    pub local_color_table_size: u8,
}

impl ImageDescriptor {
    /// Decode the 9 bytes following the image separator.
    pub fn from_bytes(raw: &[u8; 9]) -> Self {
        let packed = raw[8];
        Self {
            left: LittleEndian::read_u16(&raw[0..2]),
            top: LittleEndian::read_u16(&raw[2..4]),
            width: LittleEndian::read_u16(&raw[4..6]),
            height: LittleEndian::read_u16(&raw[6..8]),
            has_local_color_table: packed & 0x80 != 0,
            interlaced: packed & 0x40 != 0,
            local_color_table_size: packed & 0x07,
        }
    }
}

/// Header of a plain text extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlainText {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub cell_width: u8,
    pub cell_height: u8,
    pub foreground_index: u8,
    pub background_index: u8,
}

impl PlainText {
    fn from_bytes(raw: &[u8; 12]) -> Self {
        Self {
            left: LittleEndian::read_u16(&raw[0..2]),
            top: LittleEndian::read_u16(&raw[2..4]),
            width: LittleEndian::read_u16(&raw[4..6]),
            height: LittleEndian::read_u16(&raw[6..8]),
            cell_width: raw[8],
            cell_height: raw[9],
            foreground_index: raw[10],
            background_index: raw[11],
        }
    }
}

/// Receives the extensions the decoder itself has no use for.
///
/// Without a handler these blocks are skipped.
pub trait ExtensionHandler: Send {
    /// A plain text extension and its text.
    fn plain_text(&mut self, _header: &PlainText, _text: &[u8]) {}

    /// A comment extension.
    fn comment(&mut self, _text: &[u8]) {}

    /// An application extension other than `NETSCAPE2.0`.
    fn application(&mut self, _identifier: &[u8; 8], _auth_code: &[u8; 3], _data: &[u8]) {}
}

/// Extension block as seen by the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    GraphicControl(GraphicControl),
    /// `NETSCAPE2.0` loop count (0 = forever).
    LoopCount(u16),
    PlainText,
    Comment,
    Application,
    /// Unrecognised label; its sub-blocks were skipped.
    Unknown(u8),
}

/// Skip a chain of sub-blocks up to and including the zero-length terminator.
///
/// Running out of data ends the chain instead of failing: a stream that stops
/// making progress is treated as terminated. Returns the payload bytes skipped.
pub fn discard_sub_blocks<S: ByteSource + ?Sized>(src: &mut S) -> Result<u64> {
    let mut scratch = [0u8; 255];
    let mut skipped = 0u64;

    loop {
        let mut len = [0u8; 1];
        if src.read(&mut len)? == 0 {
            warn!(skipped, "Sub-block chain ended without terminator");
            return Ok(skipped);
        }
        let len = len[0] as usize;
        if len == 0 {
            return Ok(skipped);
        }

        let mut filled = 0;
        while filled < len {
            let n = src.read(&mut scratch[filled..len])?;
            if n == 0 {
                warn!(skipped, "Sub-block truncated");
                return Ok(skipped + filled as u64);
            }
            filled += n;
        }
        skipped += len as u64;
    }
}

/// Concatenate the payload of a chain of sub-blocks.
pub fn read_sub_blocks<S: ByteSource + ?Sized>(src: &mut S) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        let len = src.read_u8()? as usize;
        if len == 0 {
            return Ok(data);
        }
        let start = data.len();
        data.resize(start + len, 0);
        src.read_exact(&mut data[start..])?;
    }
}

/// Reads GIF structures from a byte source.
pub struct BlockReader<'a, S: ?Sized> {
    src: &'a mut S,
}

impl<'a, S: ByteSource + ?Sized> BlockReader<'a, S> {
    /// Wrap a source positioned at a block boundary.
    pub fn new(src: &'a mut S) -> Self {
        Self { src }
    }

    /// Verify the 6-byte signature and version.
    ///
    /// Only `GIF89a` is accepted unless the configuration allows `GIF87a`.
    pub fn read_header(&mut self, config: &DecoderConfig) -> Result<()> {
        let mut signature = [0u8; 3];
        self.src.read_exact(&mut signature)?;
        if &signature != GIF_SIGNATURE {
            return Err(FormatError::InvalidSignature(signature).into());
        }

        let mut version = [0u8; 3];
        self.src.read_exact(&mut version)?;
        let accepted = &version == VERSION_89A || (config.accept_gif87a && &version == VERSION_87A);
        if !accepted {
            return Err(FormatError::UnsupportedVersion(version).into());
        }
        Ok(())
    }

    /// Read the logical screen descriptor. A global color table is required.
    pub fn read_screen_descriptor(&mut self) -> Result<LogicalScreenDescriptor> {
        let mut raw = [0u8; 7];
        self.src.read_exact(&mut raw)?;
        let screen = LogicalScreenDescriptor::from_bytes(&raw);

        if !screen.has_global_color_table {
            return Err(FormatError::MissingGlobalColorTable.into());
        }
        Ok(screen)
    }

    /// Read an image descriptor; the separator has already been consumed.
    pub fn read_image_descriptor(&mut self) -> Result<ImageDescriptor> {
        let mut raw = [0u8; 9];
        self.src.read_exact(&mut raw)?;
        Ok(ImageDescriptor::from_bytes(&raw))
    }

    /// Read one extension block; the introducer has already been consumed.
    pub fn read_extension(
        &mut self,
        handler: Option<&mut (dyn ExtensionHandler + 'static)>,
    ) -> Result<Extension> {
        let label = self.src.read_u8()?;

        match label {
            PLAIN_TEXT_LABEL => self.read_plain_text(handler),
            GRAPHIC_CONTROL_LABEL => self.read_graphic_control(),
            COMMENT_LABEL => self.read_comment(handler),
            APPLICATION_LABEL => self.read_application(handler),
            other => {
                warn!(label = format_args!("0x{:02X}", other), "Unknown extension");
                discard_sub_blocks(&mut *self.src)?;
                Ok(Extension::Unknown(other))
            }
        }
    }

    fn read_graphic_control(&mut self) -> Result<Extension> {
        let size = self.src.read_u8()?;
        let mut body = [0u8; 4];
        self.src.read_exact(&mut body)?;
        if size > 4 {
            self.src.skip(u64::from(size - 4))?;
        }
        discard_sub_blocks(&mut *self.src)?;

        let control = GraphicControl::from_body(&body);
        debug!(
            disposal = ?control.disposal,
            delay_cs = control.delay_cs,
            transparent = ?control.transparent(),
            "Graphic control extension"
        );
        Ok(Extension::GraphicControl(control))
    }

    fn read_plain_text(
        &mut self,
        handler: Option<&mut (dyn ExtensionHandler + 'static)>,
    ) -> Result<Extension> {
        let size = self.src.read_u8()?;
        let mut raw = [0u8; 12];
        self.src.read_exact(&mut raw)?;
        if size > 12 {
            self.src.skip(u64::from(size - 12))?;
        }

        match handler {
            Some(handler) => {
                let text = read_sub_blocks(&mut *self.src)?;
                handler.plain_text(&PlainText::from_bytes(&raw), &text);
            }
            None => {
                discard_sub_blocks(&mut *self.src)?;
            }
        }
        Ok(Extension::PlainText)
    }

    fn read_comment(
        &mut self,
        handler: Option<&mut (dyn ExtensionHandler + 'static)>,
    ) -> Result<Extension> {
        match handler {
            Some(handler) => {
                let text = read_sub_blocks(&mut *self.src)?;
                handler.comment(&text);
            }
            None => {
                discard_sub_blocks(&mut *self.src)?;
            }
        }
        Ok(Extension::Comment)
    }

    fn read_application(
        &mut self,
        handler: Option<&mut (dyn ExtensionHandler + 'static)>,
    ) -> Result<Extension> {
        let size = self.src.read_u8()?;
        let mut identifier = [0u8; 8];
        let mut auth_code = [0u8; 3];
        self.src.read_exact(&mut identifier)?;
        self.src.read_exact(&mut auth_code)?;
        if size > 11 {
            self.src.skip(u64::from(size - 11))?;
        }

        if &identifier == NETSCAPE_ID && &auth_code == NETSCAPE_AUTH {
            let data = read_sub_blocks(&mut *self.src)?;
            if data.len() >= 3 && data[0] == 1 {
                let loop_count = LittleEndian::read_u16(&data[1..3]);
                debug!(loop_count, "NETSCAPE loop extension");
                return Ok(Extension::LoopCount(loop_count));
            }
            warn!(len = data.len(), "NETSCAPE extension without loop sub-block");
            return Ok(Extension::Application);
        }

        match handler {
            Some(handler) => {
                let data = read_sub_blocks(&mut *self.src)?;
                handler.application(&identifier, &auth_code, &data);
            }
            None => {
                discard_sub_blocks(&mut *self.src)?;
            }
        }
        Ok(Extension::Application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vexgif_core::{Error, MemorySource};

    fn reader_over(bytes: &[u8]) -> MemorySource {
        MemorySource::new(bytes.to_vec())
    }

    #[test]
    fn test_disposal_method() {
        assert_eq!(DisposalMethod::from_flags(0x00), DisposalMethod::None);
        assert_eq!(DisposalMethod::from_flags(0x04), DisposalMethod::DoNotDispose);
        assert_eq!(DisposalMethod::from_flags(0x08), DisposalMethod::RestoreBackground);
        assert_eq!(DisposalMethod::from_flags(0x0C), DisposalMethod::RestorePrevious);
        assert_eq!(DisposalMethod::from_flags(0x1C), DisposalMethod::None);
    }

    #[test]
    fn test_header_89a_only_by_default() {
        let config = DecoderConfig::default();
        let mut src = reader_over(b"GIF89a");
        assert!(BlockReader::new(&mut src).read_header(&config).is_ok());

        let mut src = reader_over(b"GIF87a");
        let err = BlockReader::new(&mut src).read_header(&config).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::UnsupportedVersion(v)) if &v == b"87a"));

        let mut src = reader_over(b"GIF87a");
        let tolerant = DecoderConfig::default().with_gif87a(true);
        assert!(BlockReader::new(&mut src).read_header(&tolerant).is_ok());
    }

    #[test]
    fn test_invalid_signature() {
        let mut src = reader_over(b"PNG89a");
        let err = BlockReader::new(&mut src)
            .read_header(&DecoderConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::InvalidSignature(_))));
    }

    #[test]
    fn test_screen_descriptor() {
        let mut src = reader_over(&[0x0A, 0x00, 0x05, 0x01, 0x91, 0x02, 0x00]);
        let screen = BlockReader::new(&mut src).read_screen_descriptor().unwrap();
        assert_eq!(screen.width, 10);
        assert_eq!(screen.height, 261);
        assert!(screen.has_global_color_table);
        assert_eq!(screen.color_resolution, 2);
        assert_eq!(screen.global_color_table_size, 1);
        assert_eq!(screen.background_index, 2);
    }

    #[test]
    fn test_screen_descriptor_requires_global_table() {
        let mut src = reader_over(&[0x0A, 0x00, 0x0A, 0x00, 0x11, 0x00, 0x00]);
        let err = BlockReader::new(&mut src).read_screen_descriptor().unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::MissingGlobalColorTable)));
    }

    #[test]
    fn test_graphic_control_extension() {
        // label, size, flags (disposal=3, transparency), delay=10, index=5, terminator
        let mut src = reader_over(&[0xF9, 4, 0x0D, 0x0A, 0x00, 0x05, 0x00, b',']);
        let ext = BlockReader::new(&mut src).read_extension(None).unwrap();
        let Extension::GraphicControl(gce) = ext else {
            panic!("expected graphic control, got {:?}", ext);
        };
        assert_eq!(gce.disposal, DisposalMethod::RestorePrevious);
        assert_eq!(gce.delay_cs, 10);
        assert_eq!(gce.delay(), Duration::from_millis(100));
        assert_eq!(gce.transparent(), Some(5));
        assert_eq!(src.read_u8().unwrap(), b',');
    }

    #[test]
    fn test_netscape_loop_count() {
        let mut bytes = vec![0xFF, 11];
        bytes.extend_from_slice(b"NETSCAPE2.0");
        bytes.extend_from_slice(&[3, 1, 0x05, 0x00, 0]);
        bytes.push(b';');
        let mut src = reader_over(&bytes);
        let ext = BlockReader::new(&mut src).read_extension(None).unwrap();
        assert_eq!(ext, Extension::LoopCount(5));
        assert_eq!(src.read_u8().unwrap(), b';');
    }

    #[derive(Default)]
    struct Recorder {
        comments: Vec<Vec<u8>>,
        apps: Vec<(Vec<u8>, Vec<u8>)>,
        texts: Vec<(PlainText, Vec<u8>)>,
    }

    impl ExtensionHandler for Recorder {
        fn plain_text(&mut self, header: &PlainText, text: &[u8]) {
            self.texts.push((*header, text.to_vec()));
        }

        fn comment(&mut self, text: &[u8]) {
            self.comments.push(text.to_vec());
        }

        fn application(&mut self, identifier: &[u8; 8], _auth_code: &[u8; 3], data: &[u8]) {
            self.apps.push((identifier.to_vec(), data.to_vec()));
        }
    }

    #[test]
    fn test_handler_receives_comment_and_application() {
        let mut bytes = vec![0xFE, 3, b'h', b'e', b'y', 2, b'!', b'!', 0];
        bytes.extend_from_slice(&[0xFF, 11]);
        bytes.extend_from_slice(b"XMP DataXMP");
        bytes.extend_from_slice(&[2, 7, 8, 0]);

        let mut src = reader_over(&bytes);
        let mut recorder = Recorder::default();
        let mut reader = BlockReader::new(&mut src);
        assert_eq!(reader.read_extension(Some(&mut recorder)).unwrap(), Extension::Comment);
        assert_eq!(
            reader.read_extension(Some(&mut recorder)).unwrap(),
            Extension::Application
        );

        assert_eq!(recorder.comments, vec![b"hey!!".to_vec()]);
        assert_eq!(recorder.apps, vec![(b"XMP Data".to_vec(), vec![7, 8])]);
    }

    #[test]
    fn test_handler_receives_plain_text() {
        let mut bytes = vec![0x01, 12, 1, 0, 2, 0, 30, 0, 8, 0, 6, 8, 1, 0];
        bytes.extend_from_slice(&[2, b'o', b'k', 0]);
        let mut src = reader_over(&bytes);
        let mut recorder = Recorder::default();
        let ext = BlockReader::new(&mut src)
            .read_extension(Some(&mut recorder))
            .unwrap();
        assert_eq!(ext, Extension::PlainText);
        let (header, text) = &recorder.texts[0];
        assert_eq!(header.left, 1);
        assert_eq!(header.width, 30);
        assert_eq!(header.cell_width, 6);
        assert_eq!(header.foreground_index, 1);
        assert_eq!(text, b"ok");
    }

    #[test]
    fn test_unknown_extension_is_skipped() {
        let mut src = reader_over(&[0x42, 2, 0xAA, 0xBB, 1, 0xCC, 0, b',']);
        let ext = BlockReader::new(&mut src).read_extension(None).unwrap();
        assert_eq!(ext, Extension::Unknown(0x42));
        assert_eq!(src.read_u8().unwrap(), b',');
    }

    #[test]
    fn test_discard_sub_blocks_stops_at_end_of_data() {
        // Declares 200 bytes but only 2 follow, and no terminator.
        let mut src = reader_over(&[3, 1, 2, 3, 200, 9, 9]);
        assert_eq!(discard_sub_blocks(&mut src).unwrap(), 5);

        let mut src = reader_over(&[]);
        assert_eq!(discard_sub_blocks(&mut src).unwrap(), 0);
    }

    #[test]
    fn test_discard_handles_repeated_block_sizes() {
        let mut bytes = Vec::new();
        for _ in 0..3 {
            bytes.push(4);
            bytes.extend_from_slice(&[0u8; 4]);
        }
        bytes.push(0);
        bytes.push(b';');
        let mut src = reader_over(&bytes);
        assert_eq!(discard_sub_blocks(&mut src).unwrap(), 12);
        assert_eq!(src.read_u8().unwrap(), b';');
    }
}
