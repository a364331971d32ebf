mod block_file;
mod cli;

use std::error::Error;
use std::fs;
use std::io::{self, Write};

use block_dev::BlockDevice;
use clap::Parser;
use minifat::config::FAT_ENTRIES_PER_BLOCK;
use minifat::{Fd, Volume};

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command},
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("image={:?}", cli.image);

    if let Command::Mkfs { data_blocks } = cli.command {
        // 超级块 + FAT + 根目录 + 数据区
        let total = 1 + data_blocks.div_ceil(FAT_ENTRIES_PER_BLOCK) + 1 + data_blocks;
        let volume = Volume::format(BlockFile::create(&cli.image, total)?)?;
        println!("{}", volume.info());
        volume.unmount()?;
        return Ok(());
    }

    let mut volume = Volume::mount(BlockFile::open(&cli.image)?)?;
    let result = run(&mut volume, cli.command);
    volume.unmount()?;
    result
}

fn run<D: BlockDevice>(volume: &mut Volume<D>, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Mkfs { .. } => return Err("cannot format a mounted volume".into()),
        Command::Info => println!("{}", volume.info()),
        Command::Ls => {
            println!("FS Ls:");
            for entry in volume.list() {
                println!("{entry}");
            }
        }
        Command::Add { host_file, name } => {
            let name = match name {
                Some(name) => name,
                None => host_file
                    .file_name()
                    .and_then(|fname| fname.to_str())
                    .ok_or("host file name is not valid UTF-8")?
                    .to_owned(),
            };
            let data = fs::read(&host_file)?;

            volume.create(&name)?;
            let written = with_file(volume, &name, |volume, fd| volume.write(fd, &data))?;
            if written < data.len() {
                log::warn!("Volume is full, only {written} of {} bytes stored", data.len());
            }
            println!("Wrote file '{name}' ({written}/{} bytes)", data.len());
        }
        Command::Rm { name } => {
            volume.delete(&name)?;
            println!("Removed file '{name}'");
        }
        Command::Cat { name } => {
            let data = with_file(volume, &name, |volume, fd| {
                let mut buf = vec![0; volume.stat(fd)?];
                let read = volume.read(fd, &mut buf)?;
                buf.truncate(read);
                Ok(buf)
            })?;
            io::stdout().write_all(&data)?;
        }
        Command::Stat { name } => {
            let size = with_file(volume, &name, |volume, fd| volume.stat(fd))?;
            println!("Size of file '{name}' is {size} bytes");
        }
    }

    Ok(())
}

/// 打开文件执行`f`，无论成败都关闭描述符。
fn with_file<D: BlockDevice, T>(
    volume: &mut Volume<D>,
    name: &str,
    f: impl FnOnce(&mut Volume<D>, Fd) -> minifat::Result<T>,
) -> minifat::Result<T> {
    let fd = volume.open(name)?;
    let result = f(volume, fd);
    volume.close(fd)?;
    result
}
