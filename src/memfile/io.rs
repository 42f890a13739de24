//! `std::io` adapters for [`MemFile`]

use super::file::{MemFile, SeekMode};
use crate::error::Error;
use std::io;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::VmError(_) => io::ErrorKind::OutOfMemory,
            Error::InvalidFileAccess(_) => io::ErrorKind::PermissionDenied,
            Error::RangeCheck { .. } => io::ErrorKind::InvalidInput,
            Error::Compression(_) => io::ErrorKind::InvalidData,
            Error::Fatal(_) | Error::Config(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

impl io::Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = MemFile::write(self, buf);
        match self.error() {
            Some(err) if written == 0 && !buf.is_empty() => Err(err.clone().into()),
            _ => Ok(written),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let at_end = self.tell() >= self.len();
        let read = MemFile::read(self, buf);
        match self.error() {
            Some(err) if read == 0 && !buf.is_empty() && !at_end => Err(err.clone().into()),
            _ => Ok(read),
        }
    }
}

impl io::Seek for MemFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, mode) = match pos {
            io::SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| Error::RangeCheck {
                    position: i64::MAX,
                    length: self.len(),
                })?;
                (offset, SeekMode::Set)
            }
            io::SeekFrom::Current(offset) => (offset, SeekMode::Cur),
            io::SeekFrom::End(offset) => (offset, SeekMode::End),
        };
        Ok(MemFile::seek(self, offset, mode)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MemFileConfig;
    use crate::memfile::MemFile;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn test_io_traits() -> std::io::Result<()> {
        let config = MemFileConfig {
            block_size: 512,
            ..MemFileConfig::default()
        };
        let mut file = MemFile::open("w+", config)?;
        for band in 0..100 {
            writeln!(file, "band {band}: fill_rect 0 0 612 8")?;
        }
        let length = file.len();

        Seek::rewind(&mut file)?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        assert_eq!(text.len() as u64, length);
        assert!(text.starts_with("band 0:"));

        Seek::seek(&mut file, SeekFrom::End(-6))?;
        let mut tail = String::new();
        file.read_to_string(&mut tail)?;
        assert_eq!(tail, "612 8\n");

        let err = Seek::seek(&mut file, SeekFrom::Start(length + 1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn test_io_write_reports_refusal() -> std::io::Result<()> {
        let mut file = MemFile::open("w+", MemFileConfig::default())?;
        file.write_all(b"header")?;
        Seek::seek(&mut file, SeekFrom::Start(2))?;

        let err = Write::write(&mut file, b"x").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
        Ok(())
    }
}
