mod common;

use inode_fs::{DIRECT_COUNT, SECTOR_SIZE};

use common::{mount, pattern};

#[test]
fn five_hundred_bytes() {
    let fs = mount(64);
    let sector = fs.create(500);
    let inode = fs.table.open(sector).unwrap();
    assert_eq!(500, inode.len());

    let bytes = pattern(500, 7);
    assert_eq!(500, inode.write_at(0, &bytes));
    assert_eq!(500, inode.len());

    let mut buf = vec![0; 500];
    assert_eq!(500, inode.read_at(0, &mut buf));
    assert_eq!(bytes, buf);
    assert_eq!(500, inode.len());
    fs.table.close(inode);
}

#[test]
fn new_file_reads_zeros() {
    let fs = mount(64);
    let sector = fs.create(2 * SECTOR_SIZE);
    let inode = fs.table.open(sector).unwrap();

    let mut buf = vec![0xFF; 2 * SECTOR_SIZE];
    assert_eq!(2 * SECTOR_SIZE, inode.read_at(0, &mut buf));
    assert!(buf.iter().all(|&b| b == 0));
    fs.table.close(inode);
}

#[test]
fn round_trip_across_tiers() {
    let fs = mount(512);
    let length = 300 * SECTOR_SIZE + 77;
    let sector = fs.create(length);
    let inode = fs.table.open(sector).unwrap();

    // 跨越直接索引与间接索引的边界，首尾都不对齐
    let offset = (DIRECT_COUNT - 2) * SECTOR_SIZE + 13;
    let bytes = pattern(5 * SECTOR_SIZE + 100, 1);
    assert_eq!(bytes.len(), inode.write_at(offset, &bytes));

    let mut buf = vec![0; bytes.len()];
    assert_eq!(bytes.len(), inode.read_at(offset, &mut buf));
    assert_eq!(bytes, buf);

    // 整个文件写满再读回
    let whole = pattern(length, 9);
    assert_eq!(length, inode.write_at(0, &whole));
    let mut buf = vec![0; length];
    assert_eq!(length, inode.read_at(0, &mut buf));
    assert_eq!(whole, buf);
    fs.table.close(inode);
}

#[test]
fn partial_write_keeps_neighbours() {
    let fs = mount(64);
    let sector = fs.create(SECTOR_SIZE);
    let inode = fs.table.open(sector).unwrap();

    let base = pattern(SECTOR_SIZE, 4);
    assert_eq!(SECTOR_SIZE, inode.write_at(0, &base));
    assert_eq!(4, inode.write_at(100, b"abcd"));

    let mut buf = vec![0; SECTOR_SIZE];
    assert_eq!(SECTOR_SIZE, inode.read_at(0, &mut buf));
    assert_eq!(&base[..100], &buf[..100]);
    assert_eq!(b"abcd", &buf[100..104]);
    assert_eq!(&base[104..], &buf[104..]);
    fs.table.close(inode);
}

#[test]
fn whole_sectors_skip_the_bounce_buffer() {
    let fs = mount(64);
    let sector = fs.create(4 * SECTOR_SIZE);
    let inode = fs.table.open(sector).unwrap();
    let bytes = pattern(4 * SECTOR_SIZE, 2);

    let (reads, writes) = (fs.disk.reads(), fs.disk.writes());
    assert_eq!(bytes.len(), inode.write_at(0, &bytes));
    assert_eq!(reads, fs.disk.reads());
    assert_eq!(writes + 4, fs.disk.writes());

    // 不对齐的写要先读出原扇区
    let (reads, writes) = (fs.disk.reads(), fs.disk.writes());
    assert_eq!(10, inode.write_at(SECTOR_SIZE + 5, &[0; 10]));
    assert_eq!(reads + 1, fs.disk.reads());
    assert_eq!(writes + 1, fs.disk.writes());
    fs.table.close(inode);
}

#[test]
fn transfers_stop_at_end_of_file() {
    let fs = mount(64);
    let sector = fs.create(1000);
    let inode = fs.table.open(sector).unwrap();

    let mut buf = vec![0; 100];
    assert_eq!(0, inode.read_at(1000, &mut buf));
    assert_eq!(0, inode.write_at(1000, &buf));
    assert_eq!(0, inode.read_at(5000, &mut buf));
    assert_eq!(0, inode.write_at(5000, &buf));

    // 跨过末尾的请求被截短
    assert_eq!(50, inode.write_at(950, &pattern(100, 5)));
    assert_eq!(50, inode.read_at(950, &mut buf));
    assert_eq!(&pattern(50, 5)[..], &buf[..50]);

    assert_eq!(0, inode.read_at(0, &mut []));
    assert_eq!(1000, inode.len());
    fs.table.close(inode);
}

#[test]
fn deny_write_blocks_all_writes() {
    let fs = mount(64);
    let sector = fs.create(SECTOR_SIZE);
    let inode = fs.table.open(sector).unwrap();
    let other = fs.table.open(sector).unwrap();

    inode.deny_write();
    other.deny_write();
    let writes = fs.disk.writes();
    assert_eq!(0, inode.write_at(0, b"blocked"));
    assert_eq!(0, other.write_at(0, &[1; SECTOR_SIZE]));
    assert_eq!(writes, fs.disk.writes());

    // 读不受影响
    let mut buf = [0xFF; 7];
    assert_eq!(7, inode.read_at(0, &mut buf));
    assert_eq!([0; 7], buf);

    inode.allow_write();
    assert_eq!(0, inode.write_at(0, b"blocked"));
    other.allow_write();
    assert_eq!(7, inode.write_at(0, b"allowed"));
    assert!(!inode.is_write_denied());

    fs.table.close(other);
    fs.table.close(inode);
}

#[test]
#[should_panic]
fn deny_more_than_openers() {
    let fs = mount(16);
    let sector = fs.create(10);
    let inode = fs.table.open(sector).unwrap();
    inode.deny_write();
    inode.deny_write();
}

#[test]
#[should_panic]
fn allow_without_deny() {
    let fs = mount(16);
    let sector = fs.create(10);
    let inode = fs.table.open(sector).unwrap();
    inode.allow_write();
}
