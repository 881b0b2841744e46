// SPDX-License-Identifier: MIT

use flatfs::prelude::*;
use flatio::prelude::*;
use tempfile::tempdir;

/// Memory device that starts failing after a number of writes.
struct FlakyDevice<'a> {
    inner: MemBlockDevice<'a>,
    writes_left: Option<usize>,
    fail_reads: bool,
}

impl<'a> FlakyDevice<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            inner: MemBlockDevice::new(buf),
            writes_left: None,
            fail_reads: false,
        }
    }
}

impl BlockDevice for FlakyDevice<'_> {
    fn block_count(&self) -> u64 {
        self.inner.block_count()
    }

    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult {
        if self.fail_reads {
            return Err(BlockIOError::Other("injected read failure"));
        }
        self.inner.read_block(index, buf)
    }

    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult {
        match self.writes_left {
            Some(0) => Err(BlockIOError::Other("injected write failure")),
            Some(ref mut n) => {
                *n -= 1;
                self.inner.write_block(index, buf)
            }
            None => self.inner.write_block(index, buf),
        }
    }

    fn flush(&mut self) -> BlockIOResult {
        self.inner.flush()
    }

    fn close(&mut self) -> BlockIOResult {
        self.inner.close()
    }
}

fn format_mem(data_blocks: u16) -> Vec<u8> {
    let meta = VolumeMeta::new(data_blocks).unwrap();
    let mut buf = vec![0u8; meta.size_bytes() as usize];
    let mut dev = MemBlockDevice::new(&mut buf);
    Formatter::new(&mut dev, &meta).format(true).unwrap();
    buf
}

#[test]
fn test_file_backed_volume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disk.img");
    let meta = VolumeMeta::new(32).unwrap();

    {
        let mut dev = FileBlockDevice::create(&path, meta.total_blocks as u64).unwrap();
        Formatter::new(&mut dev, &meta).format(false).unwrap();
    }

    let payload: Vec<u8> = (0..3 * BLOCK_SIZE - 3).map(|i| (i % 253) as u8).collect();
    {
        let mut vol = Volume::new();
        vol.mount_path(&path).unwrap();
        vol.create("hello.txt").unwrap();
        let h = vol.open("hello.txt").unwrap();
        assert_eq!(vol.write(h, &payload).unwrap(), payload.len());
        vol.close(h).unwrap();
        vol.unmount().unwrap();
    }

    let mut vol = Volume::new();
    vol.mount_path(&path).unwrap();
    let listing = vol.list().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(
        listing[0].to_string(),
        format!("file: hello.txt, size: {}, data_blk: 1", payload.len())
    );

    let h = vol.open("hello.txt").unwrap();
    let mut back = vec![0u8; payload.len()];
    assert_eq!(vol.read(h, &mut back).unwrap(), payload.len());
    assert_eq!(back, payload);
    vol.close(h).unwrap();
    vol.unmount().unwrap();
}

#[test]
fn test_mount_missing_image() {
    let dir = tempdir().unwrap();
    let mut vol = Volume::new();
    assert!(matches!(
        vol.mount_path(dir.path().join("absent.img")),
        Err(FsError::Device(_))
    ));
    assert!(!vol.is_mounted());
}

#[test]
fn test_mount_read_failure() {
    let mut buf = format_mem(8);
    let mut dev = FlakyDevice::new(&mut buf);
    dev.fail_reads = true;
    let mut vol = Volume::new();
    assert!(matches!(vol.mount(dev), Err(FsError::Device(_))));
    assert!(!vol.is_mounted());
}

#[test]
fn test_write_failure_is_reported() {
    let mut buf = format_mem(8);
    let mut dev = FlakyDevice::new(&mut buf);
    dev.writes_left = Some(1);
    let mut vol = Volume::with_device(dev).unwrap();
    vol.create("f").unwrap();
    let h = vol.open("f").unwrap();

    assert!(matches!(
        vol.write(h, &[1u8; 2 * BLOCK_SIZE]),
        Err(FsError::Device(_))
    ));
}

#[test]
fn test_unmount_failure_keeps_volume_mounted() {
    let mut buf = format_mem(8);
    let mut vol = Volume::with_device(FlakyDevice::new(&mut buf)).unwrap();
    vol.create("f").unwrap();

    vol.device_mut().unwrap().writes_left = Some(0);
    assert!(matches!(vol.unmount(), Err(FsError::Device(_))));
    assert!(vol.is_mounted());
    assert_eq!(vol.list().unwrap().len(), 1);

    vol.device_mut().unwrap().writes_left = None;
    vol.unmount().unwrap();
}

#[test]
fn test_scratch_buffer_io_counts() {
    let mut buf = format_mem(16);
    let mut dev = MemBlockDevice::new(&mut buf);
    let mut vol = Volume::with_device(IOCounter::new(&mut dev)).unwrap();
    vol.create("f").unwrap();
    let h = vol.open("f").unwrap();
    vol.device_mut().unwrap().stats.reset();

    // Full blocks are written without reading them first
    vol.write(h, &[0xAB; 2 * BLOCK_SIZE]).unwrap();
    let s = vol.device().unwrap().snapshot();
    assert_eq!((s.reads, s.writes), (0, 2));

    // Partial write into an existing block is a read-modify-write
    vol.device_mut().unwrap().stats.reset();
    vol.seek(h, 10).unwrap();
    vol.write(h, b"patch").unwrap();
    let s = vol.device().unwrap().snapshot();
    assert_eq!((s.reads, s.writes), (1, 1));

    // Appending into a fresh block skips the read
    vol.device_mut().unwrap().stats.reset();
    vol.seek(h, 2 * BLOCK_SIZE as u32).unwrap();
    vol.write(h, b"tail").unwrap();
    let s = vol.device().unwrap().snapshot();
    assert_eq!((s.reads, s.writes), (0, 1));

    // Whole-block reads go straight to the caller buffer, the tail bounces
    vol.device_mut().unwrap().stats.reset();
    vol.seek(h, 0).unwrap();
    let mut out = vec![0u8; 3 * BLOCK_SIZE];
    assert_eq!(vol.read(h, &mut out).unwrap(), 2 * BLOCK_SIZE + 4);
    let s = vol.device().unwrap().snapshot();
    assert_eq!((s.reads, s.writes), (3, 0));
    assert_eq!(s.sequential_reads, 2);
    assert_eq!(&out[10..15], b"patch");
    assert_eq!(&out[2 * BLOCK_SIZE..2 * BLOCK_SIZE + 4], b"tail");

    vol.close(h).unwrap();
    let counter = vol.unmount().unwrap();
    assert!(counter.snapshot().flushes >= 1);
}

#[test]
fn test_check_device_after_unmount() {
    let mut buf = format_mem(16);
    {
        let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
        vol.create("a").unwrap();
        let h = vol.open("a").unwrap();
        vol.write(h, &[3u8; 5000]).unwrap();
        vol.close(h).unwrap();
        vol.unmount().unwrap();
    }
    let mut dev = MemBlockDevice::new(&mut buf);
    let rep = check_device(&mut dev, &CheckOptions::default()).unwrap();
    assert!(rep.ok(), "{rep}");
}
