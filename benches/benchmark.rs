use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nii2nhdr::{nii_to_nhdr, read_nifti_header};

use std::fs;
use std::path::{Path, PathBuf};

/// Write a minimal 5-volume diffusion fixture (raw, little endian) to bench against.
fn write_dwi_fixture(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let mut buf = vec![0u8; 348];
    buf[0..4].copy_from_slice(&348i32.to_le_bytes());
    let dim: [i16; 8] = [4, 96, 96, 60, 5, 1, 1, 1];
    for (i, v) in dim.iter().enumerate() {
        buf[40 + i * 2..42 + i * 2].copy_from_slice(&v.to_le_bytes());
    }
    buf[70..72].copy_from_slice(&16i16.to_le_bytes());
    buf[72..74].copy_from_slice(&32i16.to_le_bytes());
    let pixdim: [f32; 8] = [1., 2., 2., 2., 1., 0., 0., 0.];
    for (i, v) in pixdim.iter().enumerate() {
        buf[76 + i * 4..80 + i * 4].copy_from_slice(&v.to_le_bytes());
    }
    buf[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    buf[344..348].copy_from_slice(b"n+1\0");

    let nifti = dir.join("dwi.nii");
    fs::write(&nifti, &buf).unwrap();

    let bval = dir.join("dwi.bval");
    fs::write(&bval, "0 1000 1000 1000 1000\n").unwrap();

    let bvec = dir.join("dwi.bvec");
    fs::write(&bvec, "0 1 0 0 1\n0 0 1 0 0\n0 0 0 1 0\n").unwrap();

    (nifti, bval, bvec)
}

fn bench_convert(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let (nifti, bval, bvec) = write_dwi_fixture(dir.path());
    let out = dir.path().join("dwi.nhdr");

    c.bench_function("read_nifti_header", |b| {
        b.iter(|| read_nifti_header(black_box(&nifti)).unwrap())
    });
    c.bench_function("nii_to_nhdr", |b| {
        b.iter(|| nii_to_nhdr(black_box(&nifti), &bval, &bvec, &out).unwrap())
    });
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
