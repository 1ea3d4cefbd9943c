//! Direct I/O benchmark engine
//!
//! Transfers a fixed volume through a single cache-bypassing handle, one
//! blocking call at a time, and times how long it takes. Every failure is
//! returned to the caller once the buffer and handle have been released;
//! nothing is retried here.

use crate::config::{BenchmarkRequest, Direction, Pattern};
use crate::io::{AlignedBuffer, DiskIO, PlatformDiskIO};
use crate::models::Measurement;
use crate::util::units::format_bytes;
use crate::{IoBenchError, Result};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::io::SeekFrom;
use std::time::{Duration, Instant};

/// Running byte count and the clock around the transfer loop
#[derive(Debug, Clone)]
pub struct TransferState {
    target: u64,
    transferred: u64,
    operations: u64,
    started: Option<Instant>,
    finished: Option<Instant>,
}

impl TransferState {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            transferred: 0,
            operations: 0,
            started: None,
            finished: None,
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.finished = None;
    }

    /// Account one completed operation of `bytes`
    pub fn record(&mut self, bytes: u64) {
        self.transferred = self.transferred.saturating_add(bytes);
        self.operations += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.transferred >= self.target
    }

    /// Stop the clock and return the elapsed time
    pub fn stop(&mut self) -> Duration {
        let now = Instant::now();
        self.finished = Some(now);
        self.elapsed()
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn operations(&self) -> u64 {
        self.operations
    }

    pub fn target(&self) -> u64 {
        self.target
    }
}

/// Operation-aligned offsets drawn uniformly from `[0, volume - op_size]`
pub struct RandomOffsets<R> {
    rng: R,
    slots: u64,
    operation_size: u64,
}

impl<R: Rng> RandomOffsets<R> {
    /// `volume` must hold at least one operation
    pub fn new(rng: R, volume: u64, operation_size: u64) -> Result<Self> {
        let slots = if operation_size == 0 {
            0
        } else {
            volume / operation_size
        };
        if slots == 0 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Volume {} holds no operation of {} bytes",
                volume, operation_size
            )));
        }
        Ok(Self {
            rng,
            slots,
            operation_size,
        })
    }

    pub fn next_offset(&mut self) -> u64 {
        self.rng.gen_range(0..self.slots) * self.operation_size
    }

    pub fn slots(&self) -> u64 {
        self.slots
    }
}

/// Runs benchmark requests against targets opened through `D`
pub struct IoEngine<D = PlatformDiskIO> {
    disk_io: D,
}

impl IoEngine<PlatformDiskIO> {
    pub fn new() -> Self {
        Self {
            disk_io: PlatformDiskIO::new(),
        }
    }
}

impl Default for IoEngine<PlatformDiskIO> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DiskIO> IoEngine<D> {
    pub fn with_disk_io(disk_io: D) -> Self {
        Self { disk_io }
    }

    /// Execute one run, seeding random offsets from the request or from entropy
    pub fn run(&self, request: &BenchmarkRequest) -> Result<Measurement> {
        let mut rng = match request.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        self.run_with_rng(request, &mut rng)
    }

    /// Execute one run drawing random offsets from `rng`
    pub fn run_with_rng<R: Rng>(
        &self,
        request: &BenchmarkRequest,
        rng: &mut R,
    ) -> Result<Measurement> {
        request.validate()?;

        let op_size = request.operation_size;
        let volume = request.config.transfer_volume;
        log::debug!(
            "{} {} on {}: {} operations, stride {}, volume {}",
            request.pattern.as_str(),
            request.direction.as_str(),
            request.path.display(),
            format_bytes(op_size as u64),
            format_bytes(request.stride),
            format_bytes(volume)
        );

        let mut file = self
            .disk_io
            .open(
                &request.path,
                request.direction,
                request.config.allow_buffered_fallback,
            )
            .map_err(|source| IoBenchError::OpenFailed {
                path: request.path.clone(),
                source,
            })?;
        log::debug!(
            "opened {} ({})",
            request.path.display(),
            if file.is_direct() { "direct" } else { "buffered" }
        );

        // Dropping `file` on this path closes the handle
        let mut buffer = AlignedBuffer::new(
            op_size,
            request.config.alignment,
            request.direction.fill_byte(),
        )?;
        log::debug!(
            "buffer of {} at {:p}",
            format_bytes(buffer.len() as u64),
            buffer.as_ptr()
        );

        let mut offsets = match request.pattern {
            Pattern::Random => Some(RandomOffsets::new(&mut *rng, volume, op_size as u64)?),
            Pattern::Sequential => None,
        };
        let stride = match request.pattern {
            Pattern::Sequential if request.stride > 0 => Some(request.stride as i64),
            _ => None,
        };

        let mut state = TransferState::new(volume);
        let mut position = 0u64;

        state.start();
        while !state.is_complete() {
            if let Some(offsets) = offsets.as_mut() {
                position = file
                    .seek_to(SeekFrom::Start(offsets.next_offset()))
                    .map_err(|source| IoBenchError::SeekFailed { source })?;
            }

            let moved = match request.direction {
                Direction::Read => file
                    .read_block(buffer.as_mut_slice())
                    .map_err(|source| IoBenchError::ReadFailed {
                        offset: position,
                        source,
                    })?,
                Direction::Write => file
                    .write_block(buffer.as_slice())
                    .map_err(|source| IoBenchError::WriteFailed {
                        offset: position,
                        source,
                    })?,
            };
            if moved < op_size {
                log::trace!(
                    "short {} at byte {}: {} of {} bytes",
                    request.direction.as_str(),
                    position,
                    moved,
                    op_size
                );
            }

            // A successful call counts as a full operation
            state.record(op_size as u64);
            position += op_size as u64;

            if let Some(stride) = stride {
                position = file
                    .seek_to(SeekFrom::Current(stride))
                    .map_err(|source| IoBenchError::SeekFailed { source })?;
            }
        }

        file.sync_all()
            .map_err(|source| IoBenchError::SyncFailed { source })?;
        let elapsed = state.stop();

        let measurement = Measurement::new(
            elapsed,
            state.transferred(),
            state.operations(),
            file.is_direct(),
        );
        log::info!("completed: {}", measurement.summary());

        drop(buffer);
        drop(file);
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;
    use crate::io::DirectFile;
    use std::cell::RefCell;
    use std::io;
    use std::path::Path;
    use std::rc::Rc;

    #[derive(Default)]
    struct MockLog {
        opens: usize,
        seeks: Vec<SeekFrom>,
        reads: usize,
        writes: Vec<(usize, u8)>,
        synced: bool,
        closed: bool,
    }

    #[derive(Clone, Default)]
    struct MockDisk {
        log: Rc<RefCell<MockLog>>,
        missing: bool,
        fail_read_after: Option<usize>,
        fail_write_after: Option<usize>,
        fail_seek: Option<usize>,
        fail_sync: bool,
    }

    struct MockFile {
        log: Rc<RefCell<MockLog>>,
        position: u64,
        fail_read_after: Option<usize>,
        fail_write_after: Option<usize>,
        fail_seek: Option<usize>,
        fail_sync: bool,
    }

    impl DiskIO for MockDisk {
        fn open(
            &self,
            _path: &Path,
            _direction: Direction,
            _allow_buffered: bool,
        ) -> io::Result<Box<dyn DirectFile>> {
            self.log.borrow_mut().opens += 1;
            if self.missing {
                return Err(io::Error::from_raw_os_error(libc::ENOENT));
            }
            Ok(Box::new(MockFile {
                log: Rc::clone(&self.log),
                position: 0,
                fail_read_after: self.fail_read_after,
                fail_write_after: self.fail_write_after,
                fail_seek: self.fail_seek,
                fail_sync: self.fail_sync,
            }))
        }
    }

    impl DirectFile for MockFile {
        fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut log = self.log.borrow_mut();
            if Some(log.reads) == self.fail_read_after {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            log.reads += 1;
            self.position += buf.len() as u64;
            Ok(buf.len())
        }

        fn write_block(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut log = self.log.borrow_mut();
            if Some(log.writes.len()) == self.fail_write_after {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            log.writes.push((buf.len(), buf[0]));
            self.position += buf.len() as u64;
            Ok(buf.len())
        }

        fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64> {
            let mut log = self.log.borrow_mut();
            if Some(log.seeks.len()) == self.fail_seek {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            log.seeks.push(pos);
            self.position = match pos {
                SeekFrom::Start(n) => n,
                SeekFrom::Current(n) => (self.position as i64 + n) as u64,
                SeekFrom::End(_) => unreachable!("engine never seeks from the end"),
            };
            Ok(self.position)
        }

        fn sync_all(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            self.log.borrow_mut().synced = true;
            Ok(())
        }

        fn is_direct(&self) -> bool {
            true
        }
    }

    impl Drop for MockFile {
        fn drop(&mut self) {
            self.log.borrow_mut().closed = true;
        }
    }

    fn request(op_size: usize, volume: u64) -> BenchmarkRequest {
        BenchmarkRequest::new("/dev/mock", op_size)
            .with_config(BenchConfig::default().with_transfer_volume(volume))
    }

    #[test]
    fn test_transfer_state() {
        let mut state = TransferState::new(10_000);
        assert_eq!(state.elapsed(), Duration::ZERO);
        state.start();
        for _ in 0..2 {
            state.record(4096);
            assert!(!state.is_complete());
        }
        state.record(4096);
        assert!(state.is_complete());
        assert_eq!(state.transferred(), 12288);
        assert_eq!(state.operations(), 3);
        assert_eq!(state.target(), 10_000);
        let elapsed = state.stop();
        assert_eq!(state.elapsed(), elapsed);
    }

    #[test]
    fn test_sequential_write_with_stride() {
        let disk = MockDisk::default();
        let engine = IoEngine::with_disk_io(disk.clone());
        let req = request(4096, 64 * 4096).with_stride(8192);

        let m = engine.run(&req).unwrap();
        assert_eq!(m.bytes_transferred, 64 * 4096);
        assert_eq!(m.operations, 64);
        assert_eq!(m.rate, 1.0 / m.elapsed_secs);

        let log = disk.log.borrow();
        assert_eq!(log.writes.len(), 64);
        assert!(log.writes.iter().all(|&(len, fill)| len == 4096 && fill == 1));
        assert_eq!(log.seeks.len(), 64);
        assert!(log.seeks.iter().all(|s| *s == SeekFrom::Current(8192)));
        assert!(log.synced);
        assert!(log.closed);
    }

    #[test]
    fn test_sequential_without_stride_never_seeks() {
        let disk = MockDisk::default();
        let req = request(4096, 16 * 4096).with_direction(Direction::Read);
        IoEngine::with_disk_io(disk.clone()).run(&req).unwrap();

        let log = disk.log.borrow();
        assert_eq!(log.reads, 16);
        assert!(log.seeks.is_empty());
    }

    #[test]
    fn test_loop_overshoots_uneven_volume() {
        let disk = MockDisk::default();
        let m = IoEngine::with_disk_io(disk.clone())
            .run(&request(4096, 10_000))
            .unwrap();
        assert_eq!(m.operations, 3);
        assert_eq!(m.bytes_transferred, 12288);
    }

    #[test]
    fn test_random_offsets_bounded_and_aligned() {
        let disk = MockDisk::default();
        let volume = 1024 * 1024u64;
        let req = request(4096, volume)
            .with_pattern(Pattern::Random)
            .with_stride(4096);
        let mut rng = SmallRng::seed_from_u64(7);
        IoEngine::with_disk_io(disk.clone())
            .run_with_rng(&req, &mut rng)
            .unwrap();

        let log = disk.log.borrow();
        assert_eq!(log.seeks.len(), 256);
        for seek in &log.seeks {
            match *seek {
                SeekFrom::Start(offset) => {
                    assert!(offset <= volume - 4096);
                    assert_eq!(offset % 4096, 0);
                }
                // stride is ignored for random access
                other => panic!("unexpected seek {:?}", other),
            }
        }
    }

    #[test]
    fn test_seeded_offsets_are_reproducible() {
        let volume = 256 * 4096u64;
        let req = request(4096, volume)
            .with_pattern(Pattern::Random)
            .with_config(BenchConfig::default().with_transfer_volume(volume).with_seed(1234));

        let first = MockDisk::default();
        let second = MockDisk::default();
        IoEngine::with_disk_io(first.clone()).run(&req).unwrap();
        IoEngine::with_disk_io(second.clone()).run(&req).unwrap();

        let mut expected = RandomOffsets::new(SmallRng::seed_from_u64(1234), volume, 4096).unwrap();
        let expected: Vec<SeekFrom> = (0..256)
            .map(|_| SeekFrom::Start(expected.next_offset()))
            .collect();
        assert_eq!(first.log.borrow().seeks, expected);
        assert_eq!(second.log.borrow().seeks, expected);
    }

    #[test]
    fn test_random_offsets_rejects_empty_range() {
        assert!(RandomOffsets::new(SmallRng::seed_from_u64(0), 4095, 4096).is_err());
        assert!(RandomOffsets::new(SmallRng::seed_from_u64(0), 4096, 0).is_err());
        let offsets = RandomOffsets::new(SmallRng::seed_from_u64(0), 32 * 1024 * 1024, 4096).unwrap();
        assert_eq!(offsets.slots(), 8192);
    }

    #[test]
    fn test_open_failure() {
        let disk = MockDisk {
            missing: true,
            ..MockDisk::default()
        };
        let err = IoEngine::with_disk_io(disk).run(&request(4096, 4096)).unwrap_err();
        match err {
            IoBenchError::OpenFailed { path, source } => {
                assert_eq!(path, Path::new("/dev/mock"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_request_never_opens() {
        let disk = MockDisk::default();
        let err = IoEngine::with_disk_io(disk.clone())
            .run(&request(0, 4096))
            .unwrap_err();
        assert!(matches!(err, IoBenchError::InvalidArgument(_)));
        assert_eq!(disk.log.borrow().opens, 0);
    }

    #[test]
    fn test_allocation_failure_closes_handle() {
        let disk = MockDisk::default();
        let err = IoEngine::with_disk_io(disk.clone())
            .run(&request(usize::MAX - 4095, 4096))
            .unwrap_err();
        assert!(matches!(err, IoBenchError::AllocationFailed { .. }));

        let log = disk.log.borrow();
        assert_eq!(log.opens, 1);
        assert!(log.closed);
        assert!(log.writes.is_empty());
        assert!(!log.synced);
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let disk = MockDisk {
            fail_write_after: Some(3),
            ..MockDisk::default()
        };
        let err = IoEngine::with_disk_io(disk.clone())
            .run(&request(4096, 64 * 4096))
            .unwrap_err();
        match err {
            IoBenchError::WriteFailed { offset, .. } => assert_eq!(offset, 3 * 4096),
            other => panic!("unexpected error: {:?}", other),
        }

        let log = disk.log.borrow();
        assert_eq!(log.writes.len(), 3);
        assert!(!log.synced);
        assert!(log.closed);
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let disk = MockDisk {
            fail_read_after: Some(2),
            ..MockDisk::default()
        };
        let req = request(4096, 16 * 4096).with_direction(Direction::Read);
        let err = IoEngine::with_disk_io(disk.clone()).run(&req).unwrap_err();
        match err {
            IoBenchError::ReadFailed { offset, source } => {
                assert_eq!(offset, 2 * 4096);
                assert_eq!(source.raw_os_error(), Some(libc::EIO));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let log = disk.log.borrow();
        assert_eq!(log.reads, 2);
        assert!(!log.synced);
        assert!(log.closed);
    }

    #[test]
    fn test_stride_seek_failure_is_fatal() {
        let disk = MockDisk {
            fail_seek: Some(1),
            ..MockDisk::default()
        };
        let req = request(4096, 16 * 4096).with_stride(4096);
        let err = IoEngine::with_disk_io(disk.clone()).run(&req).unwrap_err();
        assert!(matches!(err, IoBenchError::SeekFailed { .. }));

        let log = disk.log.borrow();
        // write, stride, write, failed stride
        assert_eq!(log.writes.len(), 2);
        assert_eq!(log.seeks, vec![SeekFrom::Current(4096)]);
        assert!(!log.synced);
        assert!(log.closed);
    }

    #[test]
    fn test_random_seek_failure_is_fatal() {
        let disk = MockDisk {
            fail_seek: Some(0),
            ..MockDisk::default()
        };
        let req = request(4096, 16 * 4096)
            .with_direction(Direction::Read)
            .with_pattern(Pattern::Random);
        let mut rng = SmallRng::seed_from_u64(3);
        let err = IoEngine::with_disk_io(disk.clone())
            .run_with_rng(&req, &mut rng)
            .unwrap_err();
        match err {
            IoBenchError::SeekFailed { source } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput)
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let log = disk.log.borrow();
        assert_eq!(log.reads, 0);
        assert!(log.seeks.is_empty());
        assert!(!log.synced);
        assert!(log.closed);
    }

    #[test]
    fn test_sync_failure_is_fatal() {
        let disk = MockDisk {
            fail_sync: true,
            ..MockDisk::default()
        };
        let err = IoEngine::with_disk_io(disk.clone())
            .run(&request(4096, 8 * 4096))
            .unwrap_err();
        assert!(matches!(err, IoBenchError::SyncFailed { .. }));

        let log = disk.log.borrow();
        assert_eq!(log.writes.len(), 8);
        assert!(!log.synced);
        assert!(log.closed);
    }
}
