mod common;

use block_dev::{BlockDevice, MemDisk, BLOCK_SIZE};
use minifat::volume::Superblock;
use minifat::{Error, Volume};

use self::common::{fresh_volume, pattern, FaultyDisk};

#[test]
fn format_and_info() {
    let volume = fresh_volume(100);
    let info = volume.info();
    assert_eq!(100, info.total_blocks);
    assert_eq!(1, info.fat_blocks);
    assert_eq!(2, info.root_dir_block);
    assert_eq!(3, info.data_start);
    assert_eq!(97, info.data_blocks);
    // 0号数据块保留
    assert_eq!(96, info.free_data_blocks);
    assert_eq!(128, info.free_dir_entries);

    let report = info.to_string();
    assert!(report.starts_with("FS Info:\ntotal_blk_count=100\n"));
    assert!(report.contains("fat_free_ratio=96/97"));
    assert!(report.ends_with("rdir_free_ratio=128/128"));
}

#[test]
fn persists_across_mounts() {
    let mut volume = fresh_volume(64);
    let data = pattern(10_000, 7);
    volume.create("kept").unwrap();
    volume.create("empty").unwrap();
    let fd = volume.open("kept").unwrap();
    assert_eq!(data.len(), volume.write(fd, &data).unwrap());
    volume.close(fd).unwrap();
    let free = volume.info().free_data_blocks;

    let dev = volume.unmount().unwrap();
    let mut volume = Volume::mount(dev).unwrap();
    assert_eq!(free, volume.info().free_data_blocks);

    let listed: Vec<_> = volume
        .list()
        .map(|entry| (entry.name().to_owned(), entry.size()))
        .collect();
    assert_eq!(
        vec![("kept".to_owned(), 10_000), ("empty".to_owned(), 0)],
        listed
    );

    let fd = volume.open("kept").unwrap();
    let mut buf = vec![0; data.len()];
    assert_eq!(data.len(), volume.read(fd, &mut buf).unwrap());
    assert_eq!(data, buf);
    volume.close(fd).unwrap();
    volume.unmount().unwrap();
}

#[test]
fn metadata_written_on_unmount_only() {
    let mut volume = fresh_volume(16);
    let metadata = |dev: &MemDisk| dev.snapshot()[..3 * BLOCK_SIZE].to_vec();
    let before = metadata(volume.device());

    volume.create("a.txt").unwrap();
    let fd = volume.open("a.txt").unwrap();
    volume.write(fd, b"hello").unwrap();
    volume.close(fd).unwrap();
    assert_eq!(before, metadata(volume.device()));

    let dev = volume.unmount().unwrap();
    assert_ne!(before, metadata(&dev));
}

#[test]
fn rejects_foreign_devices() {
    assert!(matches!(
        Volume::mount(MemDisk::new(16)),
        Err(Error::InvalidFormat(_))
    ));

    let dev = MemDisk::new(16);
    Superblock::new(32).unwrap().store(&dev).unwrap();
    assert!(matches!(Volume::mount(dev), Err(Error::InvalidFormat(_))));

    assert!(matches!(
        Volume::format(MemDisk::new(3)),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn unmount_with_open_files() {
    let mut volume = fresh_volume(16);
    volume.create("a").unwrap();
    let fd = volume.open("a").unwrap();

    let err = volume.unmount().unwrap_err();
    assert!(matches!(err.error(), Error::FilesStillOpen));
    assert_eq!("cannot unmount", err.to_string());
    let cause = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(Some(Error::FilesStillOpen.to_string()), cause);
    let mut volume = err.into_volume();
    volume.close(fd).unwrap();
    volume.unmount().unwrap();
}

#[test]
fn device_errors_propagate() {
    let mut volume = Volume::format(FaultyDisk::new(16)).unwrap();
    volume.create("a").unwrap();
    let fd = volume.open("a").unwrap();
    volume.write(fd, &pattern(100, 1)).unwrap();
    volume.seek(fd, 0).unwrap();

    volume.device().fail_reads(true);
    let mut buf = [0; 100];
    assert!(matches!(volume.read(fd, &mut buf), Err(Error::Io(_))));
    assert_eq!(0, volume.tell(fd).unwrap());
    volume.device().fail_reads(false);
    volume.close(fd).unwrap();

    volume.device().fail_writes(true);
    let (volume, error) = volume.unmount().unwrap_err().into_parts();
    assert!(matches!(error, Error::Io(_)));
    volume.device().fail_writes(false);
    let dev = volume.unmount().unwrap();

    dev.fail_reads(true);
    assert!(matches!(Volume::mount(dev), Err(Error::Io(_))));
}

#[test]
fn failed_write_returns_new_blocks() {
    let mut volume = Volume::format(FaultyDisk::new(16)).unwrap();
    volume.create("empty").unwrap();
    volume.create("short").unwrap();
    let empty = volume.open("empty").unwrap();
    let short = volume.open("short").unwrap();
    volume.write(short, &pattern(100, 2)).unwrap();
    let free = volume.info().free_data_blocks;

    volume.device().fail_writes(true);
    assert!(matches!(volume.write(empty, &pattern(10, 1)), Err(Error::Io(_))));
    assert!(matches!(
        volume.write(short, &pattern(3 * BLOCK_SIZE, 3)),
        Err(Error::Io(_))
    ));
    volume.device().fail_writes(false);

    assert_eq!(free, volume.info().free_data_blocks);
    let entry = volume.lookup("empty").unwrap();
    assert_eq!(0, entry.size());
    assert!(entry.first_block().is_eoc());
    assert_eq!(100, volume.stat(short).unwrap());
    assert_eq!(100, volume.tell(short).unwrap());

    // 回退后的簇链仍然可以正常增长
    volume.seek(short, 0).unwrap();
    let data = pattern(2 * BLOCK_SIZE, 4);
    assert_eq!(data.len(), volume.write(short, &data).unwrap());
    assert_eq!(free - 1, volume.info().free_data_blocks);

    volume.close(empty).unwrap();
    volume.close(short).unwrap();
    let dev = volume.unmount().unwrap();
    let volume = Volume::mount(dev).unwrap();
    assert!(volume.lookup("empty").unwrap().first_block().is_eoc());
}

#[test]
fn rejects_inconsistent_geometry() {
    // 超级块：签名8字节，其后依次为总块数、根目录、数据区起点、数据块数、FAT块数
    fn mount_with(edit: impl FnOnce(&mut [u8])) -> &'static str {
        let dev = fresh_volume(16).unmount().unwrap();
        let mut block = [0; BLOCK_SIZE];
        dev.read_block(0, &mut block).unwrap();
        edit(&mut block);
        dev.write_block(0, &block).unwrap();
        match Volume::mount(dev) {
            Err(Error::InvalidFormat(reason)) => reason,
            other => panic!("mounted a broken volume: {other:?}"),
        }
    }

    assert_eq!(
        "bad data block count",
        mount_with(|sb| sb[14..16].copy_from_slice(&0u16.to_le_bytes()))
    );
    assert_eq!(
        "FAT cannot hold every data block",
        mount_with(|sb| sb[16] = 0)
    );
    assert_eq!(
        "root directory does not follow the FAT",
        mount_with(|sb| sb[10..12].copy_from_slice(&3u16.to_le_bytes()))
    );
    assert_eq!(
        "data region does not follow the root directory",
        mount_with(|sb| sb[12..14].copy_from_slice(&4u16.to_le_bytes()))
    );
    assert_eq!(
        "data region does not end at the last block",
        mount_with(|sb| sb[14..16].copy_from_slice(&12u16.to_le_bytes()))
    );
}

#[test]
fn rejects_corrupted_metadata() {
    let (fat_block, root_block) = (1, 2);

    // 13个数据块，13号已越界
    let dev = fresh_volume(16).unmount().unwrap();
    let mut fat = [0; BLOCK_SIZE];
    dev.read_block(fat_block, &mut fat).unwrap();
    fat[2..4].copy_from_slice(&13u16.to_le_bytes());
    dev.write_block(fat_block, &fat).unwrap();
    assert!(matches!(
        Volume::mount(dev),
        Err(Error::InvalidFormat("FAT entry out of range"))
    ));

    let dev = fresh_volume(16).unmount().unwrap();
    let mut root = [0; BLOCK_SIZE];
    root[..3].copy_from_slice(&[b'a', 0xFF, 0xFE]);
    root[20..22].copy_from_slice(&u16::MAX.to_le_bytes());
    dev.write_block(root_block, &root).unwrap();
    assert!(matches!(
        Volume::mount(dev),
        Err(Error::InvalidFormat("malformed filename in root directory"))
    ));
}

#[test]
fn cyclic_chain_is_reported() {
    let mut volume = fresh_volume(16);
    volume.create("loop").unwrap();
    let fd = volume.open("loop").unwrap();
    volume.write(fd, &pattern(3 * BLOCK_SIZE, 3)).unwrap();
    volume.close(fd).unwrap();
    let dev = volume.unmount().unwrap();

    // 让1号块指向自己
    let mut fat = [0; BLOCK_SIZE];
    dev.read_block(1, &mut fat).unwrap();
    fat[2..4].copy_from_slice(&1u16.to_le_bytes());
    dev.write_block(1, &fat).unwrap();

    let mut volume = Volume::mount(dev).unwrap();
    let fd = volume.open("loop").unwrap();
    let mut buf = vec![0; 3 * BLOCK_SIZE];
    assert!(matches!(
        volume.read(fd, &mut buf),
        Err(Error::InvalidFormat(_))
    ));
    volume.close(fd).unwrap();
    assert!(matches!(volume.delete("loop"), Err(Error::InvalidFormat(_))));
}
