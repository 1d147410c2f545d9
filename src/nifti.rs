//! Functions for reading the header of NIFTI-1 files containing brain volumes.
//!
//! Only the fixed 348-byte header is parsed, the voxel payload is never touched:
//! a detached NRRD header needs the raster metadata, not the raster itself.

use byteordered::{ByteOrdered, Endianness};
use flate2::bufread::GzDecoder;
use ndarray::{array, Array2};

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Nii2NhdrError, Result};
use crate::util::{is_gz_file, skip_bytes};

pub const NIFTI1_HEADER_SIZE: i32 = 348;

/// Magic bytes of a single-file NIFTI-1 volume (header and voxel data in one file).
pub const NIFTI1_MAGIC_SINGLE: &[u8; 4] = b"n+1\0";
/// Magic bytes of a two-file NIFTI-1 volume (separate .hdr/.img pair).
pub const NIFTI1_MAGIC_PAIR: &[u8; 4] = b"ni1\0";

/// The kind of a raster element, disregarding its byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Signed,
    Unsigned,
    Float,
}

/// Models the header of a NIFTI-1 file containing a brain volume.
///
/// Only the fields relevant for describing the raster are kept; padding and
/// display-related fields are skipped during parsing. The byte order the file
/// was written in is recorded in `endianness`.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub sizeof_hdr: i32,
    pub dim: [i16; 8],
    pub datatype: i16,
    pub bitpix: i16,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub qform_code: i16,
    pub sform_code: i16,
    pub quatern_b: f32,
    pub quatern_c: f32,
    pub quatern_d: f32,
    pub qoffset_x: f32,
    pub qoffset_y: f32,
    pub qoffset_z: f32,
    pub srow_x: [f32; 4],
    pub srow_y: [f32; 4],
    pub srow_z: [f32; 4],
    pub magic: [u8; 4],
    pub endianness: Endianness,
}

impl Default for NiftiHeader {
    fn default() -> NiftiHeader {
        NiftiHeader {
            sizeof_hdr: NIFTI1_HEADER_SIZE,
            dim: [3, 1, 1, 1, 0, 0, 0, 0],
            datatype: 16,
            bitpix: 32,
            pixdim: [1.; 8],
            vox_offset: 352.,
            scl_slope: 1.,
            scl_inter: 0.,
            qform_code: 0,
            sform_code: 0,
            quatern_b: 0.,
            quatern_c: 0.,
            quatern_d: 0.,
            qoffset_x: 0.,
            qoffset_y: 0.,
            qoffset_z: 0.,
            srow_x: [0.; 4],
            srow_y: [0.; 4],
            srow_z: [0.; 4],
            magic: *NIFTI1_MAGIC_SINGLE,
            endianness: Endianness::Little,
        }
    }
}

impl NiftiHeader {
    /// Read a NIFTI-1 header from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            NiftiHeader::from_reader(GzDecoder::new(file))
        } else {
            NiftiHeader::from_reader(file)
        }
    }

    /// Read a NIFTI-1 header from the given byte stream.
    /// It is assumed that the input is currently at the start of the header.
    pub fn from_reader<S>(input: S) -> Result<NiftiHeader>
    where
        S: Read,
    {
        let mut hdr = NiftiHeader::default();

        // sizeof_hdr doubles as the byte order sentinel: it must read as 348.
        let mut input = ByteOrdered::le(input);
        let sizeof_hdr = input.read_i32()?;
        let endianness = if sizeof_hdr == NIFTI1_HEADER_SIZE {
            Endianness::Little
        } else {
            Endianness::Big
        };
        let mut input = ByteOrdered::runtime(input.into_inner(), endianness);

        hdr.sizeof_hdr = if endianness == Endianness::Big {
            sizeof_hdr.swap_bytes()
        } else {
            sizeof_hdr
        };
        if hdr.sizeof_hdr != NIFTI1_HEADER_SIZE {
            return Err(Nii2NhdrError::InvalidNiftiFormat);
        }
        hdr.endianness = endianness;

        skip_bytes(&mut input, 36)?; // data_type, db_name, extents, session_error, regular, dim_info

        for v in &mut hdr.dim {
            *v = input.read_i16()?;
        }
        skip_bytes(&mut input, 14)?; // intent_p1 .. intent_p3, intent_code
        hdr.datatype = input.read_i16()?;
        hdr.bitpix = input.read_i16()?;
        skip_bytes(&mut input, 2)?; // slice_start
        for v in &mut hdr.pixdim {
            *v = input.read_f32()?;
        }
        hdr.vox_offset = input.read_f32()?;
        hdr.scl_slope = input.read_f32()?;
        hdr.scl_inter = input.read_f32()?;
        skip_bytes(&mut input, 28)?; // slice_end .. toffset, glmax, glmin
        skip_bytes(&mut input, 104)?; // descrip, aux_file
        hdr.qform_code = input.read_i16()?;
        hdr.sform_code = input.read_i16()?;
        hdr.quatern_b = input.read_f32()?;
        hdr.quatern_c = input.read_f32()?;
        hdr.quatern_d = input.read_f32()?;
        hdr.qoffset_x = input.read_f32()?;
        hdr.qoffset_y = input.read_f32()?;
        hdr.qoffset_z = input.read_f32()?;
        for v in &mut hdr.srow_x {
            *v = input.read_f32()?;
        }
        for v in &mut hdr.srow_y {
            *v = input.read_f32()?;
        }
        for v in &mut hdr.srow_z {
            *v = input.read_f32()?;
        }
        skip_bytes(&mut input, 16)?; // intent_name
        for v in &mut hdr.magic {
            *v = input.read_u8()?;
        }

        if &hdr.magic != NIFTI1_MAGIC_SINGLE && &hdr.magic != NIFTI1_MAGIC_PAIR {
            return Err(Nii2NhdrError::InvalidNiftiFormat);
        }
        Ok(hdr)
    }

    /// The dimensionality of the raster, as recorded in `dim[0]`.
    pub fn ndim(&self) -> usize {
        self.dim[0] as usize
    }

    /// The per-axis sizes, one entry per used dimension.
    pub fn sizes(&self) -> Vec<i16> {
        self.dim[1..=self.ndim()].to_vec()
    }

    /// The byte width and kind of a single raster element, derived from the
    /// NIFTI datatype code.
    pub fn element_type(&self) -> Result<(usize, ElementKind)> {
        match self.datatype {
            2 => Ok((1, ElementKind::Unsigned)),
            4 => Ok((2, ElementKind::Signed)),
            8 => Ok((4, ElementKind::Signed)),
            16 => Ok((4, ElementKind::Float)),
            64 => Ok((8, ElementKind::Float)),
            256 => Ok((1, ElementKind::Signed)),
            512 => Ok((2, ElementKind::Unsigned)),
            768 => Ok((4, ElementKind::Unsigned)),
            1024 => Ok((8, ElementKind::Signed)),
            1280 => Ok((8, ElementKind::Unsigned)),
            other => Err(Nii2NhdrError::UnsupportedNiftiDataType(other)),
        }
    }

    /// The rotation part of the qform, computed from the unit quaternion
    /// stored in the header. The first quaternion component is implicit:
    /// a = sqrt(1 - b*b - c*c - d*d), clamped at zero against rounding.
    pub fn qform_rotation(&self) -> Array2<f64> {
        let b = self.quatern_b as f64;
        let c = self.quatern_c as f64;
        let d = self.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

        array![
            [
                a * a + b * b - c * c - d * d,
                2.0 * b * c - 2.0 * a * d,
                2.0 * b * d + 2.0 * a * c
            ],
            [
                2.0 * b * c + 2.0 * a * d,
                a * a + c * c - b * b - d * d,
                2.0 * c * d - 2.0 * a * b
            ],
            [
                2.0 * b * d - 2.0 * a * c,
                2.0 * c * d + 2.0 * a * b,
                a * a + d * d - c * c - b * b
            ]
        ]
    }

    /// The 4x4 qform transform mapping voxel indices to physical (scanner)
    /// coordinates: rotation columns scaled by the voxel spacing, with the
    /// third column flipped by qfac (`pixdim[0]`, where 0 counts as +1), and
    /// the qoffset fields as translation.
    pub fn qform(&self) -> Array2<f64> {
        let r = self.qform_rotation();
        let qfac = if self.pixdim[0] == 0.0 {
            1.0
        } else {
            self.pixdim[0] as f64
        };

        let mut m = Array2::<f64>::eye(4);
        for i in 0..3 {
            m[[i, 0]] = r[[i, 0]] * self.pixdim[1] as f64;
            m[[i, 1]] = r[[i, 1]] * self.pixdim[2] as f64;
            m[[i, 2]] = r[[i, 2]] * self.pixdim[3] as f64 * qfac;
        }
        m[[0, 3]] = self.qoffset_x as f64;
        m[[1, 3]] = self.qoffset_y as f64;
        m[[2, 3]] = self.qoffset_z as f64;
        m
    }
}

/// Read the header of a NIFTI-1 file, plain or GZip-compressed.
pub fn read_nifti_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    NiftiHeader::from_file(path)
}
