use criterion::{Criterion, criterion_group, criterion_main};

use flatfs::prelude::*;
use flatio::prelude::*;

criterion_group!(benches, volume_component_bench, volume_scaling_bench);
criterion_main!(benches);

const DATA_BLOCKS: u16 = 8192;
const FILE_BYTES: usize = 8 * 1024 * 1024;

pub fn volume_component_bench(c: &mut Criterion) {
    let meta = VolumeMeta::new(DATA_BLOCKS).expect("geometry");
    let mut buf = vec![0u8; meta.size_bytes() as usize];
    let payload: Vec<u8> = (0..FILE_BYTES).map(|i| (i % 251) as u8).collect();

    c.bench_function("flat_format", |b| {
        b.iter(|| {
            let mut dev = MemBlockDevice::new(&mut buf);
            Formatter::new(&mut dev, &meta)
                .format(false)
                .expect("format failed");
        });
    });

    c.bench_function("flat_write_8M_mem", |b| {
        b.iter(|| {
            let mut dev = MemBlockDevice::new(&mut buf);
            Formatter::new(&mut dev, &meta)
                .format(false)
                .expect("format failed");
            let mut vol = Volume::with_device(dev).expect("mount failed");
            vol.create("bench.bin").expect("create failed");
            let h = vol.open("bench.bin").expect("open failed");
            vol.write(h, &payload).expect("write failed");
            vol.close(h).expect("close failed");
            vol.unmount().expect("unmount failed");
        });
    });

    {
        let mut dev = MemBlockDevice::new(&mut buf);
        Formatter::new(&mut dev, &meta)
            .format(false)
            .expect("format failed");
        let mut vol = Volume::with_device(dev).expect("mount failed");
        vol.create("bench.bin").expect("create failed");
        let h = vol.open("bench.bin").expect("open failed");
        vol.write(h, &payload).expect("write failed");
        vol.close(h).expect("close failed");
        vol.unmount().expect("unmount failed");
    }
    let mut out = vec![0u8; FILE_BYTES];

    c.bench_function("flat_read_8M_mem", |b| {
        b.iter(|| {
            let mut vol =
                Volume::with_device(MemBlockDevice::new(&mut buf)).expect("mount failed");
            let h = vol.open("bench.bin").expect("open failed");
            let n = vol.read(h, &mut out).expect("read failed");
            assert_eq!(n, FILE_BYTES);
            vol.close(h).expect("close failed");
            vol.unmount().expect("unmount failed");
        });
    });

    // Unaligned chunks force every block through the scratch buffer
    c.bench_function("flat_read_8M_unaligned_chunks", |b| {
        b.iter(|| {
            let mut vol =
                Volume::with_device(MemBlockDevice::new(&mut buf)).expect("mount failed");
            let h = vol.open("bench.bin").expect("open failed");
            let mut chunk = [0u8; 1000];
            while vol.read(h, &mut chunk).expect("read failed") > 0 {}
            vol.close(h).expect("close failed");
            vol.unmount().expect("unmount failed");
        });
    });

    c.bench_function("flat_check", |b| {
        b.iter(|| {
            let mut dev = MemBlockDevice::new(&mut buf);
            let rep = check_device(&mut dev, &CheckOptions::default()).expect("check failed");
            assert!(rep.ok());
        });
    });
}

pub fn volume_scaling_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_file_count_scaling");

    for &files in &[8usize, 32, 128] {
        group.bench_with_input(format!("create_write_{files}_files"), &files, |b, &n| {
            let meta = VolumeMeta::new(DATA_BLOCKS).expect("geometry");
            let mut buf = vec![0u8; meta.size_bytes() as usize];
            let chunk = vec![0x5Au8; 3 * BLOCK_SIZE + 100];
            b.iter(|| {
                let mut dev = MemBlockDevice::new(&mut buf);
                Formatter::new(&mut dev, &meta)
                    .format(false)
                    .expect("format failed");
                let mut vol = Volume::with_device(dev).expect("mount failed");
                for i in 0..n {
                    let name = format!("f{i}");
                    vol.create(&name).expect("create failed");
                    let h = vol.open(&name).expect("open failed");
                    vol.write(h, &chunk).expect("write failed");
                    vol.close(h).expect("close failed");
                }
                vol.unmount().expect("unmount failed");
            })
        });
    }
    group.finish();
}
