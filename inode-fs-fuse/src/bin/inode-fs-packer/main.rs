mod cli;

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use cli::{Cli, Command};
use inode_fs::{Bitmap, InodeTable, SECTOR_SIZE, SectorId};
use inode_fs_fuse::BlockFile;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Pack {
            source,
            image,
            sectors,
            reserved,
        } => pack(&source, &image, sectors, reserved),
        Command::Cat { image, sector } => cat(&image, SectorId::new(sector)),
        Command::Stat { image, sector } => stat(&image, SectorId::new(sector)),
    }
}

fn pack(source: &Path, image: &Path, sectors: usize, reserved: usize) -> io::Result<()> {
    println!("source={source:?}\nimage={image:?}");

    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(image)?;
    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(fd, sectors)?);

    let mut bitmap = Bitmap::new(sectors);
    bitmap.reserve(0..reserved);
    let table = InodeTable::new(block_file, bitmap);

    let mut apps = fs::read_dir(source)?
        .filter_map(|entry| {
            entry
                .and_then(|entry| Ok(entry.file_type()?.is_file().then(|| entry.path())))
                .transpose()
        })
        .collect::<Result<Vec<_>, _>>()?;
    apps.sort();

    for app in apps {
        let data = fs::read(&app)?;
        let sector = table
            .alloc_sector()
            .ok_or_else(|| io::Error::other("image is full"))?;

        if let Err(err) = table.create(sector, data.len()) {
            table.dealloc_sector(sector);
            return Err(fs_error(err));
        }

        let inode = table.open(sector).map_err(fs_error)?;
        let written = inode.write_at(0, &data);
        table.close(inode);
        if written != data.len() {
            return Err(io::Error::other(format!(
                "{app:?}: wrote {written} of {} bytes",
                data.len()
            )));
        }

        log::info!("app={app:?} length={}", data.len());
        println!("{} -> {sector}", app.display());
    }

    println!("{} sectors left", table.unused());
    Ok(())
}

fn cat(image: &Path, sector: SectorId) -> io::Result<()> {
    let table = mount(image)?;
    let inode = table.open(sector).map_err(fs_error)?;

    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; 8 * SECTOR_SIZE];
    let mut offset = 0;
    loop {
        let len = inode.read_at(offset, &mut buf);
        if len == 0 {
            break;
        }
        stdout.write_all(&buf[..len])?;
        offset += len;
    }

    table.close(inode);
    Ok(())
}

fn stat(image: &Path, sector: SectorId) -> io::Result<()> {
    let table = mount(image)?;
    let inode = table.open(sector).map_err(fs_error)?;

    let stat = inode.stat();
    println!("inode:   {}", stat.inode);
    println!("kind:    {:?}", stat.kind);
    println!("size:    {}", stat.size);
    println!("sectors: {}", stat.sectors);

    table.close(inode);
    Ok(())
}

/// 只读挂载，镜像以只读方式打开
fn mount(image: &Path) -> io::Result<InodeTable> {
    let fd = OpenOptions::new().read(true).open(image)?;
    let block_file = BlockFile::new(fd)?;
    let bitmap = Bitmap::new(block_file.num_blocks());
    Ok(InodeTable::new(Arc::new(block_file), bitmap))
}

fn fs_error(err: inode_fs::Error) -> io::Error {
    io::Error::other(err.to_string())
}
