//! Conversion of diffusion MRI volumes from NIFTI-1 to detached NRRD headers.
//!
//! The written NHDR file describes the raster of an existing `.nii` or
//! `.nii.gz` file and points back at it with `byteskip: -1`, so the voxel
//! payload is never copied. For 4-D diffusion series the b-value and b-vector
//! text files are folded into the header as DWMRI key-value pairs.

pub mod error;
pub mod gradients;
pub mod nhdr;
pub mod nifti;
pub mod util;

pub use error::{Nii2NhdrError, Result};
pub use gradients::{read_bvals, read_bvecs, GradientTable};
pub use nhdr::{nii_to_nhdr, Encoding, NhdrHeader};
pub use nifti::{read_nifti_header, ElementKind, NiftiHeader};
