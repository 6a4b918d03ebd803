//! GIF fixture writer shared by the integration tests and benches.

#![allow(dead_code)]

use std::collections::HashMap;

/// The 10x10 sample image from the GIF89a walkthrough: red, blue, white and black.
pub const SAMPLE_GIF: [u8; 69] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x0A, 0x00, 0x0A, 0x00, 0x91, 0x00, 0x00, 0xFF, 0xFF,
    0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x0A, 0x00, 0x00, 0x02, 0x16,
    0x8C, 0x2D, 0x99, 0x87, 0x2A, 0x1C, 0xDC, 0x33, 0xA0, 0x02, 0x75, 0xEC, 0x95, 0xFA, 0xA8,
    0xDE, 0x60, 0x8C, 0x04, 0x91, 0x4C, 0x01, 0x00, 0x3B,
];

/// Palette indices of [`SAMPLE_GIF`], one string per row.
pub const SAMPLE_ROWS: [&str; 10] = [
    "1111122222",
    "1111122222",
    "1111122222",
    "1110000222",
    "1110000222",
    "2220000111",
    "2220000111",
    "2222211111",
    "2222211111",
    "2222211111",
];

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];

/// One image block to write.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Row-major indices in display order.
    pub indices: Vec<u8>,
    pub delay_cs: u16,
    pub disposal: u8,
    pub transparent: Option<u8>,
    pub interlaced: bool,
    pub local_palette: Option<Vec<[u8; 3]>>,
    /// Skip the graphic control extension entirely.
    pub no_control: bool,
    pub min_code_size: Option<u8>,
}

impl FrameSpec {
    pub fn new(left: u16, top: u16, width: u16, height: u16, indices: Vec<u8>) -> Self {
        assert_eq!(indices.len(), width as usize * height as usize);
        Self {
            left,
            top,
            width,
            height,
            indices,
            delay_cs: 0,
            disposal: 0,
            transparent: None,
            interlaced: false,
            local_palette: None,
            no_control: false,
            min_code_size: None,
        }
    }

    pub fn solid(left: u16, top: u16, width: u16, height: u16, index: u8) -> Self {
        Self::new(left, top, width, height, vec![index; width as usize * height as usize])
    }

    pub fn delay(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    pub fn disposal(mut self, disposal: u8) -> Self {
        self.disposal = disposal;
        self
    }

    pub fn transparent(mut self, index: u8) -> Self {
        self.transparent = Some(index);
        self
    }

    pub fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub fn local_palette(mut self, palette: Vec<[u8; 3]>) -> Self {
        self.local_palette = Some(palette);
        self
    }

    pub fn without_control(mut self) -> Self {
        self.no_control = true;
        self
    }

    pub fn min_code_size(mut self, size: u8) -> Self {
        self.min_code_size = Some(size);
        self
    }
}

/// Writes a GIF file block by block, in call order.
#[derive(Debug, Clone)]
pub struct GifBuilder {
    width: u16,
    height: u16,
    palette: Vec<[u8; 3]>,
    background: u8,
    version: [u8; 3],
    global_table: bool,
    trailer: bool,
    blocks: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, palette: Vec<[u8; 3]>) -> Self {
        Self {
            width,
            height,
            palette,
            background: 0,
            version: *b"89a",
            global_table: true,
            trailer: true,
            blocks: Vec::new(),
        }
    }

    pub fn background(mut self, index: u8) -> Self {
        self.background = index;
        self
    }

    pub fn version(mut self, version: &[u8; 3]) -> Self {
        self.version = *version;
        self
    }

    pub fn without_global_table(mut self) -> Self {
        self.global_table = false;
        self
    }

    pub fn without_trailer(mut self) -> Self {
        self.trailer = false;
        self
    }

    pub fn netscape(mut self, loop_count: u16) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0xFF, 11]);
        self.blocks.extend_from_slice(b"NETSCAPE2.0");
        self.blocks.extend_from_slice(&[3, 1]);
        self.blocks.extend_from_slice(&loop_count.to_le_bytes());
        self.blocks.push(0);
        self
    }

    pub fn comment(mut self, text: &[u8]) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0xFE]);
        write_sub_blocks(&mut self.blocks, text);
        self
    }

    pub fn application(mut self, identifier: &[u8; 8], auth: &[u8; 3], data: &[u8]) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0xFF, 11]);
        self.blocks.extend_from_slice(identifier);
        self.blocks.extend_from_slice(auth);
        write_sub_blocks(&mut self.blocks, data);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn plain_text(mut self, left: u16, top: u16, width: u16, height: u16, cell: (u8, u8), fg: u8, bg: u8, text: &[u8]) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0x01, 12]);
        for value in [left, top, width, height] {
            self.blocks.extend_from_slice(&value.to_le_bytes());
        }
        self.blocks.extend_from_slice(&[cell.0, cell.1, fg, bg]);
        write_sub_blocks(&mut self.blocks, text);
        self
    }

    /// Append bytes verbatim.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.blocks.extend_from_slice(bytes);
        self
    }

    pub fn frame(mut self, frame: FrameSpec) -> Self {
        if !frame.no_control {
            let mut flags = (frame.disposal & 0x07) << 2;
            if frame.transparent.is_some() {
                flags |= 0x01;
            }
            self.blocks.extend_from_slice(&[0x21, 0xF9, 4, flags]);
            self.blocks.extend_from_slice(&frame.delay_cs.to_le_bytes());
            self.blocks.push(frame.transparent.unwrap_or(0));
            self.blocks.push(0);
        }

        self.blocks.push(0x2C);
        for value in [frame.left, frame.top, frame.width, frame.height] {
            self.blocks.extend_from_slice(&value.to_le_bytes());
        }

        let mut flags = 0u8;
        let mut palette_len = self.palette.len();
        if let Some(local) = &frame.local_palette {
            flags |= 0x80 | size_field(local.len());
            palette_len = local.len();
        }
        if frame.interlaced {
            flags |= 0x40;
        }
        self.blocks.push(flags);
        if let Some(local) = &frame.local_palette {
            write_color_table(&mut self.blocks, local);
        }

        let min_code_size = frame.min_code_size.unwrap_or_else(|| min_code_size(palette_len));
        let data = if frame.interlaced {
            interlace(&frame.indices, frame.width as usize, frame.height as usize)
        } else {
            frame.indices.clone()
        };
        self.blocks.push(min_code_size);
        write_sub_blocks(&mut self.blocks, &lzw_encode(&data, min_code_size));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"GIF");
        out.extend_from_slice(&self.version);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());

        let mut flags = 0x70;
        if self.global_table {
            flags |= 0x80 | size_field(self.palette.len());
        }
        out.push(flags);
        out.push(self.background);
        out.push(0);
        if self.global_table {
            write_color_table(&mut out, &self.palette);
        }

        out.extend_from_slice(&self.blocks);
        if self.trailer {
            out.push(0x3B);
        }
        out
    }
}

/// Color table size field for `len` colors.
pub fn size_field(len: usize) -> u8 {
    let mut field = 0u8;
    while (2usize << field) < len && field < 7 {
        field += 1;
    }
    field
}

pub fn min_code_size(palette_len: usize) -> u8 {
    let mut bits = 2u8;
    while (1usize << bits) < palette_len && bits < 8 {
        bits += 1;
    }
    bits
}

fn write_color_table(out: &mut Vec<u8>, palette: &[[u8; 3]]) {
    let len = 2usize << size_field(palette.len());
    for i in 0..len {
        out.extend_from_slice(palette.get(i).unwrap_or(&[0, 0, 0]));
    }
}

pub fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

/// Reorder rows into the four interlace passes.
pub fn interlace(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for (start, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        for y in (start..height).step_by(step) {
            out.extend_from_slice(&data[y * width..(y + 1) * width]);
        }
    }
    out
}

struct BitWriter {
    out: Vec<u8>,
    bits: u32,
    count: u32,
}

impl BitWriter {
    fn write(&mut self, code: u16, width: u8) {
        self.bits |= u32::from(code) << self.count;
        self.count += u32::from(width);
        while self.count >= 8 {
            self.out.push((self.bits & 0xFF) as u8);
            self.bits >>= 8;
            self.count -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            self.out.push((self.bits & 0xFF) as u8);
        }
        self.out
    }
}

/// GIF LZW encoder. Emits a clear code first and again whenever the table fills.
pub fn lzw_encode(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let stop = clear + 1;
    let mut width = min_code_size + 1;
    let mut table: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next_code = clear + 2;
    let mut writer = BitWriter {
        out: Vec::new(),
        bits: 0,
        count: 0,
    };

    writer.write(clear, width);

    let Some((&first, rest)) = data.split_first() else {
        writer.write(stop, width);
        return writer.finish();
    };

    let mut current = u16::from(first);
    for &byte in rest {
        if let Some(&code) = table.get(&(current, byte)) {
            current = code;
            continue;
        }

        writer.write(current, width);
        if next_code < 4096 {
            table.insert((current, byte), next_code);
            next_code += 1;
            if next_code > (1 << width) && width < 12 {
                width += 1;
            }
        } else {
            writer.write(clear, width);
            table.clear();
            next_code = clear + 2;
            width = min_code_size + 1;
        }
        current = u16::from(byte);
    }

    writer.write(current, width);
    writer.write(stop, width);
    writer.finish()
}

/// Expected RGB for a row-major index raster drawn with `palette`.
pub fn rgb_of(indices: &[u8], palette: &[[u8; 3]]) -> Vec<u8> {
    indices
        .iter()
        .flat_map(|&i| palette.get(i as usize).copied().unwrap_or([0, 0, 0]))
        .collect()
}
