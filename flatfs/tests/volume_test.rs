// SPDX-License-Identifier: MIT

use flatfs::prelude::*;
use flatio::prelude::*;

fn formatted(data_blocks: u16) -> Vec<u8> {
    let meta = VolumeMeta::new(data_blocks).expect("geometry");
    let mut buf = vec![0u8; meta.size_bytes() as usize];
    let mut dev = MemBlockDevice::new(&mut buf);
    Formatter::new(&mut dev, &meta)
        .format(false)
        .expect("format failed");
    buf
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

fn assert_clean<D: BlockDevice>(vol: &Volume<D>) {
    let rep = vol.check(&CheckOptions::default()).expect("check");
    assert!(rep.ok(), "{rep}");
    assert_eq!(rep.count(Severity::Warn), 0, "{rep}");
}

#[test]
fn test_roundtrip_sizes() {
    for n in [7, BLOCK_SIZE, BLOCK_SIZE + 1, 3 * BLOCK_SIZE - 3] {
        let mut buf = formatted(16);
        let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
        vol.create("data.bin").unwrap();
        let h = vol.open("data.bin").unwrap();

        let input = pattern(n);
        assert_eq!(vol.write(h, &input).unwrap(), n);
        assert_eq!(vol.size(h).unwrap(), n as u32);

        vol.seek(h, 0).unwrap();
        let mut output = vec![0u8; n];
        assert_eq!(vol.read(h, &mut output).unwrap(), n);
        assert_eq!(output, input, "mismatch for {n} bytes");

        vol.close(h).unwrap();
        assert_clean(&vol);
        vol.unmount().unwrap();
    }
}

#[test]
fn test_roundtrip_survives_remount() {
    let mut buf = formatted(16);
    let input = pattern(3 * BLOCK_SIZE - 3);
    {
        let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
        vol.create("keep").unwrap();
        let h = vol.open("keep").unwrap();
        vol.write(h, &input).unwrap();
        vol.close(h).unwrap();
        vol.unmount().unwrap();
    }

    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    let h = vol.open("keep").unwrap();
    assert_eq!(vol.size(h).unwrap(), input.len() as u32);
    let mut output = vec![0u8; input.len()];
    assert_eq!(vol.read(h, &mut output).unwrap(), input.len());
    assert_eq!(output, input);
}

#[test]
fn test_create_then_size_and_delete() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("a").unwrap();
    let h = vol.open("a").unwrap();
    assert_eq!(vol.size(h).unwrap(), 0);
    vol.close(h).unwrap();

    vol.delete("a").unwrap();
    assert!(matches!(vol.open("a"), Err(FsError::NotFound(_))));
}

#[test]
fn test_directory_capacity() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    for i in 0..FLAT_MAX_FILES {
        vol.create(&format!("file{i}")).unwrap();
    }
    assert!(matches!(
        vol.create("overflow"),
        Err(FsError::ResourceExhausted(_))
    ));

    let list = vol.list().unwrap();
    assert_eq!(list.len(), FLAT_MAX_FILES);
    assert_eq!(list[0].name, "file0");
    assert_eq!(list[FLAT_MAX_FILES - 1].name, format!("file{}", FLAT_MAX_FILES - 1));
    assert_eq!(vol.info().unwrap().free_dir_slots, 0);
    vol.unmount().unwrap();
}

#[test]
fn test_open_file_capacity() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("shared").unwrap();

    let handles: Vec<FileHandle> = (0..FLAT_MAX_OPEN_FILES)
        .map(|_| vol.open("shared").unwrap())
        .collect();
    assert!(matches!(
        vol.open("shared"),
        Err(FsError::ResourceExhausted(_))
    ));

    // Existing handles keep independent cursors
    vol.write(handles[0], b"abcdef").unwrap();
    vol.seek(handles[1], 2).unwrap();
    let mut out = [0u8; 3];
    assert_eq!(vol.read(handles[1], &mut out).unwrap(), 3);
    assert_eq!(&out, b"cde");
    assert_eq!(vol.tell(handles[0]).unwrap(), 6);
    assert_eq!(vol.size(handles[31]).unwrap(), 6);

    for h in handles {
        vol.close(h).unwrap();
    }
    vol.unmount().unwrap();
}

#[test]
fn test_delete_open_file_then_reuse_blocks() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("big").unwrap();
    let h = vol.open("big").unwrap();
    vol.write(h, &pattern(3 * BLOCK_SIZE)).unwrap();
    assert_eq!(vol.info().unwrap().free_data_blocks, 4);

    assert!(matches!(vol.delete("big"), Err(FsError::State(_))));
    vol.close(h).unwrap();
    vol.delete("big").unwrap();
    assert_eq!(vol.info().unwrap().free_data_blocks, 7);

    vol.create("next").unwrap();
    let h = vol.open("next").unwrap();
    vol.write(h, &pattern(2 * BLOCK_SIZE)).unwrap();
    assert_eq!(vol.stat("next").unwrap().first_block, Some(1));
    vol.close(h).unwrap();
    assert_clean(&vol);
}

#[test]
fn test_seek_bounds() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("s").unwrap();
    let h = vol.open("s").unwrap();
    vol.write(h, &pattern(100)).unwrap();

    assert!(matches!(vol.seek(h, 101), Err(FsError::State(_))));
    vol.seek(h, 100).unwrap();
    let mut out = [0u8; 10];
    assert_eq!(vol.read(h, &mut out).unwrap(), 0);
    assert_eq!(vol.tell(h).unwrap(), 100);
}

#[test]
fn test_unmount_with_open_handle() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("a").unwrap();
    vol.create("b").unwrap();
    let ha = vol.open("a").unwrap();
    let hb = vol.open("b").unwrap();

    assert!(matches!(vol.unmount(), Err(FsError::State(_))));
    assert!(vol.is_mounted());
    vol.close(ha).unwrap();
    assert!(matches!(vol.unmount(), Err(FsError::State(_))));
    vol.close(hb).unwrap();
    vol.unmount().unwrap();
    assert!(!vol.is_mounted());
}

#[test]
fn test_short_write_when_full() {
    // Four usable data blocks, entry 0 is reserved
    let mut buf = formatted(5);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("fill").unwrap();
    let h = vol.open("fill").unwrap();

    let input = pattern(6 * BLOCK_SIZE + 17);
    let written = vol.write(h, &input).unwrap();
    assert_eq!(written, 4 * BLOCK_SIZE);
    assert_eq!(vol.size(h).unwrap(), written as u32);
    assert_eq!(vol.tell(h).unwrap(), written as u32);
    assert_eq!(vol.info().unwrap().free_data_blocks, 0);

    // Nothing left at all
    assert_eq!(vol.write(h, b"more").unwrap(), 0);
    vol.create("other").unwrap();
    let h2 = vol.open("other").unwrap();
    assert_eq!(vol.write(h2, b"x").unwrap(), 0);
    assert_eq!(vol.stat("other").unwrap().first_block, None);

    vol.seek(h, 0).unwrap();
    let mut out = vec![0u8; input.len()];
    assert_eq!(vol.read(h, &mut out).unwrap(), written);
    assert_eq!(&out[..written], &input[..written]);

    let rep = vol.check(&CheckOptions::default()).unwrap();
    assert!(rep.ok(), "{rep}");
    assert!(!rep.has_code("LOST_BLOCKS"));

    vol.close(h).unwrap();
    vol.close(h2).unwrap();
    vol.delete("fill").unwrap();
    assert_eq!(vol.info().unwrap().free_data_blocks, 4);
}

#[test]
fn test_partial_short_write_mid_block() {
    let mut buf = formatted(3);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    vol.create("f").unwrap();
    let h = vol.open("f").unwrap();

    vol.write(h, &pattern(BLOCK_SIZE + 10)).unwrap();
    // Remaining room is the tail of the second block
    let n = vol.write(h, &pattern(BLOCK_SIZE)).unwrap();
    assert_eq!(n, BLOCK_SIZE - 10);
    assert_eq!(vol.size(h).unwrap(), 2 * BLOCK_SIZE as u32);
    assert_clean(&vol);
}

#[test]
fn test_remount_metadata_is_identical() {
    let mut buf = formatted(64);
    {
        let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
        for (i, name) in ["one", "two", "three"].iter().enumerate() {
            vol.create(name).unwrap();
            let h = vol.open(name).unwrap();
            vol.write(h, &pattern((i + 1) * 3000)).unwrap();
            vol.close(h).unwrap();
        }
        vol.delete("two").unwrap();
        vol.unmount().unwrap();
    }

    let meta_len = VolumeMeta::new(64).unwrap().data_start as usize * BLOCK_SIZE;
    let before = buf[..meta_len].to_vec();

    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    assert_eq!(vol.list().unwrap().len(), 2);
    vol.unmount().unwrap();
    assert_eq!(&buf[..meta_len], &before[..]);
}

#[test]
fn test_name_arguments() {
    let mut buf = formatted(8);
    let mut vol = Volume::with_device(MemBlockDevice::new(&mut buf)).unwrap();
    assert!(matches!(vol.create(""), Err(FsError::InvalidArgument(_))));
    assert!(matches!(
        vol.create("a-name-that-is-too-long"),
        Err(FsError::InvalidArgument(_))
    ));
    vol.create("dup").unwrap();
    assert!(matches!(vol.create("dup"), Err(FsError::InvalidArgument(_))));
    assert!(matches!(vol.delete("ghost"), Err(FsError::NotFound(_))));
    assert!(matches!(vol.open("ghost"), Err(FsError::NotFound(_))));
}
