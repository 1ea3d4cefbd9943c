use crate::config::Direction;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Opens benchmark targets
pub trait DiskIO {
    /// Open `path` for `direction`, bypassing the page cache.
    ///
    /// The target is never created or truncated. With `allow_buffered`, a
    /// filesystem that rejects direct I/O is reopened with synchronous
    /// buffered access instead.
    fn open(
        &self,
        path: &Path,
        direction: Direction,
        allow_buffered: bool,
    ) -> io::Result<Box<dyn DirectFile>>;
}

/// Handle issuing one blocking syscall per call, closed on drop
pub trait DirectFile {
    /// Read into `buf` with a single call
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf` with a single call
    fn write_block(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Seek to position
    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Force data to stable storage
    fn sync_all(&mut self) -> io::Result<()>;

    /// Whether the page cache is bypassed
    fn is_direct(&self) -> bool;
}

/// Platform-specific disk I/O implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformDiskIO;

impl PlatformDiskIO {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const DIRECT_FLAGS: libc::c_int = libc::O_DIRECT | libc::O_LARGEFILE;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const DIRECT_FLAGS: libc::c_int = 0;

pub struct UnixDirectFile {
    file: File,
    direct: bool,
}

impl UnixDirectFile {
    fn open(path: &Path, direction: Direction, direct: bool) -> io::Result<Self> {
        let extra_flags = if direct { DIRECT_FLAGS } else { 0 };
        let mut options = OpenOptions::new();
        match direction {
            Direction::Read => options.read(true),
            Direction::Write => options.write(true),
        };
        let file = options
            .custom_flags(libc::O_SYNC | extra_flags)
            .open(path)?;

        #[cfg(target_os = "macos")]
        if direct {
            use std::os::unix::io::AsRawFd;
            if unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) } < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(Self { file, direct })
    }
}

impl DirectFile for UnixDirectFile {
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_block(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn is_direct(&self) -> bool {
        self.direct
    }
}

impl DiskIO for PlatformDiskIO {
    fn open(
        &self,
        path: &Path,
        direction: Direction,
        allow_buffered: bool,
    ) -> io::Result<Box<dyn DirectFile>> {
        match UnixDirectFile::open(path, direction, true) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if allow_buffered && err.raw_os_error() == Some(libc::EINVAL) => {
                log::warn!(
                    "{} rejected direct I/O ({}); falling back to synchronous buffered I/O",
                    path.display(),
                    err
                );
                Ok(Box::new(UnixDirectFile::open(path, direction, false)?))
            }
            Err(err) => Err(err),
        }
    }
}

/// Create a new platform-specific disk I/O instance
pub fn create_disk_io() -> impl DiskIO {
    PlatformDiskIO::new()
}
