//! Functions for building and writing detached NRRD headers (NHDR files) that
//! describe an existing NIFTI raster without duplicating its voxel payload.
//!
//! The header is first assembled as an ordered list of text lines, then written
//! out in one pass. Keeping the line building free of side effects makes the
//! format logic testable without touching the filesystem.

use byteordered::Endianness;
use ndarray::{s, Array1, Array2};

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Nii2NhdrError, Result};
use crate::gradients::{bvec_scaling, GradientTable};
use crate::nifti::{read_nifti_header, ElementKind, NiftiHeader};

/// The payload encodings a detached header can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    Gzip,
}

impl Encoding {
    /// Classify a raster file by its name: ".gz" means a GZip payload, a bare
    /// ".nii" a raw one. Anything else is not a usable raster reference.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Encoding> {
        let name = path.as_ref().to_string_lossy();
        if name.ends_with(".gz") {
            Ok(Encoding::Gzip)
        } else if name.ends_with(".nii") {
            Ok(Encoding::Raw)
        } else {
            Err(Nii2NhdrError::InvalidNiftiExtension(name.into_owned()))
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Encoding::Raw => write!(f, "raw"),
            Encoding::Gzip => write!(f, "gzip"),
        }
    }
}

/// Map a raster element's byte width and kind to its one-word NRRD type name.
/// Covers the full vocabulary: int8, uchar, short, ushort, int, uint,
/// longlong, ulonglong, float and double.
pub fn nrrd_type_name(nbytes: usize, kind: ElementKind) -> Result<&'static str> {
    match (nbytes, kind) {
        (1, ElementKind::Signed) => Ok("int8"),
        (1, ElementKind::Unsigned) => Ok("uchar"),
        (2, ElementKind::Signed) => Ok("short"),
        (2, ElementKind::Unsigned) => Ok("ushort"),
        (4, ElementKind::Signed) => Ok("int"),
        (4, ElementKind::Unsigned) => Ok("uint"),
        (4, ElementKind::Float) => Ok("float"),
        (8, ElementKind::Signed) => Ok("longlong"),
        (8, ElementKind::Unsigned) => Ok("ulonglong"),
        (8, ElementKind::Float) => Ok("double"),
        (nbytes, kind) => Err(Nii2NhdrError::UnsupportedElementType(nbytes, kind)),
    }
}

/// The diffusion-specific key-value block of a 4-D header.
#[derive(Debug, Clone, PartialEq)]
pub struct DwiGradients {
    pub b_max: f64,
    pub directions: Vec<String>,
}

/// Models a detached NRRD header referencing an existing raster file.
#[derive(Debug, Clone, PartialEq)]
pub struct NhdrHeader {
    pub type_name: &'static str,
    pub dimension: usize,
    pub sizes: Vec<i16>,
    pub endian: Endianness,
    pub encoding: Encoding,
    pub space_directions: Array2<f64>,
    pub space_origin: Array1<f64>,
    pub data_file: String,
    pub measurement_frame: Option<Array2<f64>>,
    pub gradients: Option<DwiGradients>,
}

impl NhdrHeader {
    /// Derive all output fields from a parsed NIFTI header.
    ///
    /// The spatial directions are the transposed 3x3 block of the qform. For a
    /// 4-D raster a gradient table is required, and the measurement frame is
    /// the direction matrix with the voxel spacing divided out; for any other
    /// dimensionality the table is ignored.
    pub fn from_nifti(
        hdr: &NiftiHeader,
        table: Option<&GradientTable>,
        data_file: &str,
    ) -> Result<NhdrHeader> {
        let encoding = Encoding::from_path(data_file)?;
        let (nbytes, kind) = hdr.element_type()?;
        let type_name = nrrd_type_name(nbytes, kind)?;
        let dimension = hdr.ndim();

        let qform = hdr.qform();
        let space_directions = qform.slice(s![0..3, 0..3]).t().to_owned();
        let space_origin = qform.slice(s![0..3, 3]).to_owned();

        let (measurement_frame, gradients) = if dimension == 4 {
            let table = table.ok_or(Nii2NhdrError::MissingGradientTable)?;

            let mut frame = space_directions.clone();
            for j in 0..3 {
                let spacing = hdr.pixdim[j + 1] as f64;
                frame.column_mut(j).mapv_inplace(|v| v / spacing);
            }

            let b_max = table.b_max()?;
            let directions = table
                .bvals
                .iter()
                .zip(table.bvecs.genrows())
                .map(|(bval, bvec)| bvec_scaling(*bval, bvec, b_max))
                .collect();

            (Some(frame), Some(DwiGradients { b_max, directions }))
        } else {
            (None, None)
        };

        Ok(NhdrHeader {
            type_name,
            dimension,
            sizes: hdr.sizes(),
            endian: hdr.endianness,
            encoding,
            space_directions,
            space_origin,
            data_file: String::from(data_file),
            measurement_frame,
            gradients,
        })
    }

    /// Build the ordered header lines. The result is a pure function of the
    /// struct fields; no I/O happens here.
    pub fn lines(&self) -> Vec<String> {
        let sizes = self
            .sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        let endian = match self.endian {
            Endianness::Little => "little",
            Endianness::Big => "big",
        };

        let mut lines = vec![
            String::from("NRRD0005"),
            String::from("# Detached header generated by nii2nhdr"),
            String::from("# Complete NRRD file format specification at:"),
            String::from("# http://teem.sourceforge.net/nrrd/format.html"),
            format!("type: {}", self.type_name),
            format!("dimension: {}", self.dimension),
            String::from("space: right-anterior-superior"),
            format!("sizes: {}", sizes),
            // byteskip -1 makes readers locate the payload from the end of the
            // data file, stepping over the NIFTI header without knowing its length
            String::from("byteskip: -1"),
            format!("endian: {}", endian),
            format!("encoding: {}", self.encoding),
            String::from("space units: \"mm\" \"mm\" \"mm\""),
            format!("space origin: {}", vector_string(&self.space_origin)),
            format!("data file: {}", self.data_file),
        ];

        if self.dimension == 4 {
            lines.push(format!(
                "space directions: {} none",
                matrix_string(&self.space_directions)
            ));
            lines.push(String::from("centerings: cell cell cell ???"));
            lines.push(String::from("kinds: space space space list"));
            if let Some(frame) = &self.measurement_frame {
                lines.push(format!("measurement frame: {}", matrix_string(frame)));
            }
            if let Some(dwi) = &self.gradients {
                lines.push(String::from("modality:=DWMRI"));
                lines.push(format!("DWMRI_b-value:={}", dwi.b_max));
                for (idx, direction) in dwi.directions.iter().enumerate() {
                    lines.push(format!("DWMRI_gradient_{:04}:={}", idx, direction));
                }
            }
        } else {
            lines.push(format!(
                "space directions: {}",
                matrix_string(&self.space_directions)
            ));
            lines.push(String::from("centerings: cell cell cell"));
            lines.push(String::from("kinds: space space space"));
        }

        lines
    }

    /// Write the header lines to the given writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for line in self.lines() {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

impl fmt::Display for NhdrHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Format a 3-vector as `(x,y,z)`.
fn vector_string(v: &Array1<f64>) -> String {
    let components: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("({})", components.join(","))
}

/// Format a 3x3 matrix as a parenthesized row-vector list: `(a,b,c) (d,e,f) (g,h,i)`.
fn matrix_string(m: &Array2<f64>) -> String {
    m.genrows()
        .into_iter()
        .map(|row| {
            let components: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            format!("({})", components.join(","))
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Convert a NIFTI file into a detached NHDR header next to its gradient files.
///
/// The raster extension is validated up front; gradient files are only opened
/// for 4-D rasters. A ".nhdr" suffix is appended to the output path when
/// missing. Returns the path the header was written to.
pub fn nii_to_nhdr(nifti: &Path, bval: &Path, bvec: &Path, out: &Path) -> Result<PathBuf> {
    // reject unusable raster references before opening any file
    Encoding::from_path(nifti)?;

    let hdr = read_nifti_header(nifti)?;

    let table = if hdr.ndim() == 4 {
        Some(GradientTable::from_files(bval, bvec)?)
    } else {
        None
    };

    let nhdr = NhdrHeader::from_nifti(&hdr, table.as_ref(), &nifti.to_string_lossy())?;

    let out = if out.to_string_lossy().ends_with(".nhdr") {
        out.to_path_buf()
    } else {
        PathBuf::from(format!("{}.nhdr", out.to_string_lossy()))
    };

    let mut writer = BufWriter::new(File::create(&out)?);
    nhdr.write_to(&mut writer)?;
    writer.flush()?;
    Ok(out)
}
