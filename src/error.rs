use crate::nifti::ElementKind;
use quick_error::quick_error;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum Nii2NhdrError {
        /// Invalid NIFTI-1 file: wrong header size or magic number.
        InvalidNiftiFormat {
            display("Invalid NIFTI-1 file")
        }

        /// The raster file name ends in neither ".nii" nor ".gz".
        InvalidNiftiExtension(path: String) {
            display("Unrecognized raster file extension: '{}'", path)
        }

        /// The NIFTI datatype code does not map to a raster element type.
        UnsupportedNiftiDataType(code: i16) {
            display("Unsupported NIFTI datatype code {}", code)
        }

        /// The element byte width and kind have no NRRD type name.
        UnsupportedElementType(nbytes: usize, kind: ElementKind) {
            display("No NRRD element type for {}-byte {:?} elements", nbytes, kind)
        }

        InvalidBvalFormat {
            display("Invalid b-value file")
        }

        InvalidBvecFormat {
            display("Invalid b-vector file")
        }

        /// The b-value and b-vector files disagree on the number of volumes.
        GradientCountMismatch(num_bvals: usize, num_bvecs: usize) {
            display("Gradient table mismatch: {} b-values but {} b-vectors", num_bvals, num_bvecs)
        }

        /// The gradient table is empty or its maximum b-value is undefined.
        UndefinedMaxBvalue {
            display("Gradient table has no well-defined maximum b-value")
        }

        /// A 4-D raster was given without an accompanying gradient table.
        MissingGradientTable {
            display("A 4-D volume requires a gradient table")
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, Nii2NhdrError>;
