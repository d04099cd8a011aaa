use crate::error::SheetStreamError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A unified input source for spreadsheet containers.
///
/// Covers the three ways a workbook is typically supplied: a path on disk,
/// an already-open file handle, or an owned in-memory buffer. The buffer
/// variant owns its bytes, so they are released when the source is dropped;
/// a borrowed buffer can be used instead through `Workbook::from_reader`
/// with a `Cursor<&[u8]>`.
pub enum InputSource {
    /// Buffered local file reader
    File(BufReader<File>),
    /// In-memory buffer reader
    Memory(Cursor<Vec<u8>>),
}

impl InputSource {
    /// Opens a local file by path
    pub(crate) fn from_path(path: &Path) -> Result<InputSource, SheetStreamError> {
        let file = File::open(path)?;
        Ok(InputSource::File(BufReader::new(file)))
    }

    /// Wraps an already-open file handle (must be readable and seekable)
    pub(crate) fn from_file(file: File) -> InputSource {
        InputSource::File(BufReader::new(file))
    }

    /// Wraps an owned memory buffer
    pub(crate) fn from_memory(data: Vec<u8>) -> InputSource {
        InputSource::Memory(Cursor::new(data))
    }
}

impl Read for InputSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            InputSource::File(reader) => reader.read(buf),
            InputSource::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for InputSource {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            InputSource::File(reader) => reader.seek(pos),
            InputSource::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;
    use std::io::Write;

    #[test]
    fn open_local_file() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"payload").unwrap();
        let result = InputSource::from_path(temp.path());
        assert!(result.is_ok());

        let result = InputSource::from_path(Path::new("missing_workbook.xlsx"));
        assert!(result.is_err(), "should fail to open a non-existent file");
    }

    #[test]
    fn memory_source_reads_and_seeks() {
        let mut source = InputSource::from_memory(b"0123456789".to_vec());
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"0123");
        source.seek(SeekFrom::Start(6)).unwrap();
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"6789");
    }
}
