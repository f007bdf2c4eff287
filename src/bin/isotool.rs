use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use log::{Level, info};

use isokit::descriptor::DescriptorBody;
use isokit::{IsoImage, VolumeDescriptor};

#[derive(Debug, Parser)]
#[clap(version, about = "Inspect and extract ISO 9660 images")]
struct Cli {
    #[clap(subcommand)]
    cmd: Command,
    /// Enables verbose logging
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the volume descriptors of an image
    Info {
        /// Path to the image
        image: PathBuf,
    },
    /// List every file and directory in an image
    List {
        /// Path to the image
        image: PathBuf,
    },
    /// Extract the whole tree of an image
    Extract {
        /// Path to the image
        image: PathBuf,
        /// Directory to extract into; created if missing
        dest: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(err) = run(cli.cmd) {
        eprintln!("ERROR: {err:#}");
        process::exit(3);
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter(None, level.to_level_filter())
        .format_timestamp(None)
        .init();
}

fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Info { image } => info_cmd(&image),
        Command::List { image } => {
            let mut iso = open(&image)?;
            for (path, rec) in iso.entries()? {
                println!("{:>12}  {path}", rec.data_length);
            }
            Ok(())
        }
        Command::Extract { image, dest } => {
            let mut iso = open(&image)?;
            std::fs::create_dir_all(&dest)
                .with_context(|| format!("creating {}", dest.display()))?;
            let files = iso.extract_all(&dest)?;
            info!("extracted {files} files to {}", dest.display());
            Ok(())
        }
    }
}

fn open(path: &Path) -> anyhow::Result<IsoImage<std::io::BufReader<std::fs::File>>> {
    IsoImage::open(path).with_context(|| format!("reading {}", path.display()))
}

fn info_cmd(path: &Path) -> anyhow::Result<()> {
    let mut iso = open(path)?;
    println!("{} descriptors", iso.descriptors().len());
    for d in iso.descriptors() {
        println!("{} ({} v{})", d.name(), d.standard_identifier, d.version);
        match &d.body {
            DescriptorBody::Volume(v) => print_volume(v),
            DescriptorBody::Boot(b) => {
                println!("  boot system id: {}", b.boot_system_id);
                println!("  boot id:        {}", b.boot_id);
                println!("  catalog:        {}", b.catalog_location);
            }
            DescriptorBody::Partition(p) => {
                println!("  system id:      {}", p.system_id);
                println!("  partition id:   {}", p.partition_id);
                println!("  location:       {}", p.location);
                println!("  size:           {}", p.size);
            }
            DescriptorBody::Terminator | DescriptorBody::Udf => {}
        }
    }

    let entries = iso.entries()?;
    if !entries.is_empty() {
        println!("files:");
        for (path, rec) in entries {
            println!("  {:>12}  {path}", rec.data_length);
        }
    }
    Ok(())
}

fn print_volume(v: &VolumeDescriptor) {
    println!("  system id:      {}", v.system_id);
    println!("  volume id:      {}", v.volume_id);
    println!("  publisher:      {}", v.publisher_id);
    println!("  preparer:       {}", v.preparer_id);
    println!("  application:    {}", v.application_id);
    println!("  blocks:         {} x {}", v.volume_space_size, v.block_size);
    println!("  path table:     {} bytes", v.path_table_size);
    if v.joliet_level > 0 {
        println!("  joliet level:   {}", v.joliet_level);
    }
    if let Some(created) = v.created_at {
        println!("  created:        {}", created.to_rfc3339());
    }
    if let Some(modified) = v.modified_at {
        println!("  modified:       {}", modified.to_rfc3339());
    }
}
