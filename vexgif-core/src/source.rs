//! Random-access byte sources.
//!
//! The decoder reads through [`ByteSource`] instead of a file descriptor so the
//! same code runs against a file on the SD card, a file loaded into memory up
//! front, or bytes compiled into the binary.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// A blocking, seekable stream of bytes.
///
/// No buffering is promised beyond what the caller asks for.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, returning how many were read. Zero means end of data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Move the read offset and return the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Release the underlying resource. Later reads may fail.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Current absolute read offset.
    fn position(&mut self) -> Result<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// Fill `buf` completely or fail with `UnexpectedEof`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "byte source ended early",
                )
                .into());
            }
            filled += n;
        }
        Ok(())
    }

    /// Read a single byte.
    fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Read a little-endian 16-bit value (`byte0 + byte1 * 256`).
    fn read_u16_le(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.read_exact(&mut bytes)?;
        Ok(LittleEndian::read_u16(&bytes))
    }

    /// Advance the read offset by `n` bytes.
    fn skip(&mut self, n: u64) -> Result<u64> {
        self.seek(SeekFrom::Current(n as i64))
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// File-backed source. Every read goes to the file.
#[derive(Debug)]
pub struct FileSource {
    file: Option<File>,
}

impl FileSource {
    /// Open `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self { file: Some(file) })
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "file source is closed"))
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.file()?.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file()?.seek(pos)?)
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}

/// Source over bytes held in memory.
///
/// Seeks outside `0..=len` fail and leave the offset where it was.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
    offset: usize,
}

impl MemorySource {
    /// Wrap bytes that are already in memory.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
        }
    }

    /// Load the whole file at `path` into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), bytes = data.len(), "Loaded file into memory");
        Ok(Self::new(data))
    }

    /// Total number of bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = &self.data[self.offset.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.offset += n;
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(n) => self.offset as i128 + i128::from(n),
            SeekFrom::End(n) => self.data.len() as i128 + i128::from(n),
        };

        if target < 0 || target > self.data.len() as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {} outside 0..={}", target, self.data.len()),
            )
            .into());
        }

        self.offset = target as usize;
        Ok(self.offset as u64)
    }
}
