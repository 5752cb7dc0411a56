//! mrcheader: print the main header of an MRC file.

use clap::Parser;
use std::path::PathBuf;

use mrc_io::read_mrc_header;

#[derive(Parser)]
#[command(name = "mrcheader", version, about = "Print the main header of an MRC file")]
struct Cli {
    /// Input MRC file
    input: PathBuf,

    /// Print the header as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let header = read_mrc_header(&cli.input)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&header)?);
        return Ok(());
    }

    let voxel = header.voxel_size();
    println!("File:        {}", cli.input.display());
    println!("Dimensions:  {} x {} x {}", header.nx, header.ny, header.nz);
    println!("Mode:        {}", header.mode);
    println!("Byte order:  {:?}", header.endian);
    println!(
        "Voxel size:  {:.3} x {:.3} x {:.3}",
        voxel.x, voxel.y, voxel.z
    );
    println!(
        "Min/max/mean: {} / {} / {}",
        header.dmin, header.dmax, header.dmean
    );
    println!("Ext. header: {} bytes {}", header.nsymbt, header.exttyp);
    println!("Version:     {}", header.nversion);
    for (i, label) in header.labels.iter().enumerate() {
        println!("Label {:>2}:    {}", i, label);
    }
    Ok(())
}
