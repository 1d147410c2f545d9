//! Command line front end: convert a NIFTI diffusion volume into a detached
//! NRRD header that references the original file.

use clap::Parser;
use std::path::PathBuf;
use std::process::exit;

use nii2nhdr::nii_to_nhdr;

/// NIFTI to NHDR conversion tool setting byteskip = -1
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// nifti file (.nii or .nii.gz)
    #[arg(long)]
    nifti: PathBuf,

    /// bval file
    #[arg(long)]
    bval: PathBuf,

    /// bvec file
    #[arg(long)]
    bvec: PathBuf,

    /// output nhdr file (".nhdr" is appended if missing)
    #[arg(long)]
    nhdr: PathBuf,
}

fn main() {
    let args = Args::parse();

    match nii_to_nhdr(&args.nifti, &args.bval, &args.bvec, &args.nhdr) {
        Ok(written) => println!("Wrote detached header to {}.", written.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    }
}
