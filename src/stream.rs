//! Byte sources the player reads GIF data from.

use std::fs::File;
use std::io::{self, prelude::*, BufReader, Cursor, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{GifError, Result};

/// Sequential, seekable byte source.
///
/// Implemented for every `Read + Seek`, so files, buffered files and
/// in-memory cursors can all back a playback session.
pub trait ByteStream {
    /// Fill `buf` completely or fail.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Move to an absolute position.
    fn seek_to(&mut self, position: u64) -> io::Result<()>;

    /// Move `count` bytes forward.
    fn skip(&mut self, count: u64) -> io::Result<()>;

    fn position(&mut self) -> io::Result<u64>;
}

impl<T: Read + Seek> ByteStream for T {
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }

    fn seek_to(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn skip(&mut self, count: u64) -> io::Result<()> {
        let offset = i64::try_from(count).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.seek(SeekFrom::Current(offset)).map(|_| ())
    }

    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

/// How a GIF file is accessed while it is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Read from the open file on demand.
    #[default]
    Streamed,
    /// Load the whole file into memory and close it right away.
    Memory,
}

pub fn open_file<P: AsRef<Path>>(path: P, mode: LoadMode) -> Result<Box<dyn ByteStream>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => GifError::FileNotFound(path.display().to_string()),
        _ => GifError::Io(err),
    })?;

    match mode {
        LoadMode::Streamed => Ok(Box::new(BufReader::new(file))),
        LoadMode::Memory => {
            let mut data = Vec::new();
            BufReader::new(file).read_to_end(&mut data)?;
            debug!("loaded {} bytes of {} into memory", data.len(), path.display());
            Ok(Box::new(Cursor::new(data)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn cursor_reads_seeks_and_skips() {
        let mut stream = Cursor::new(vec![1u8, 2, 3, 4, 5, 6]);

        let mut buf = [0; 2];
        stream.read_into(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);

        stream.skip(2).unwrap();
        assert_eq!(ByteStream::position(&mut stream).unwrap(), 4);
        stream.read_into(&mut buf).unwrap();
        assert_eq!(buf, [5, 6]);

        stream.seek_to(1).unwrap();
        stream.read_into(&mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
    }

    #[test]
    fn short_read_fails() {
        let mut stream = Cursor::new(vec![1u8]);
        let mut buf = [0; 2];
        assert!(stream.read_into(&mut buf).is_err());
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let result = open_file("./does/not/exist.gif", LoadMode::Memory);
        assert!(matches!(result, Err(GifError::FileNotFound(_))));
    }
}
