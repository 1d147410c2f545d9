//! Functions for reading diffusion gradient tables from b-value and b-vector
//! text files.
//!
//! Both files are whitespace-delimited text with one entry per acquired volume.
//! B-vector files come in two layouts: one `x y z` triple per line, or the FSL
//! layout with three rows holding the x, y and z components of all volumes.

use ndarray::{Array1, Array2, ArrayView1};
use ndarray_stats::QuantileExt;

use std::fs;
use std::path::Path;

use crate::error::{Nii2NhdrError, Result};

/// A diffusion gradient table: one b-value and one direction vector per
/// acquired volume along the 4th raster dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTable {
    pub bvals: Array1<f64>,
    pub bvecs: Array2<f64>,
}

impl GradientTable {
    /// Read a gradient table from a pair of aligned b-value and b-vector files.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        bval_path: P,
        bvec_path: Q,
    ) -> Result<GradientTable> {
        let bvals = read_bvals(bval_path)?;
        let bvecs = read_bvecs(bvec_path)?;
        if bvals.len() != bvecs.nrows() {
            return Err(Nii2NhdrError::GradientCountMismatch(
                bvals.len(),
                bvecs.nrows(),
            ));
        }
        Ok(GradientTable { bvals, bvecs })
    }

    /// The number of acquired volumes covered by the table.
    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }

    /// The maximum b-value across the table.
    pub fn b_max(&self) -> Result<f64> {
        let b_max = self
            .bvals
            .max()
            .map_err(|_| Nii2NhdrError::UndefinedMaxBvalue)?;
        Ok(*b_max)
    }
}

/// Read b-values from a whitespace-delimited text file. Line breaks and plain
/// spaces are both accepted as separators.
pub fn read_bvals<P: AsRef<Path>>(path: P) -> Result<Array1<f64>> {
    let raw = fs::read_to_string(path)?;
    let bvals = raw
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| Nii2NhdrError::InvalidBvalFormat)
        })
        .collect::<Result<Vec<f64>>>()?;
    if bvals.is_empty() {
        return Err(Nii2NhdrError::InvalidBvalFormat);
    }
    Ok(Array1::from(bvals))
}

/// Read b-vectors from a whitespace-delimited text file into an N x 3 array.
///
/// A file in FSL layout (3 rows, one column per volume) is transposed on read.
/// A 3 x 3 file is ambiguous and taken as one vector per line.
pub fn read_bvecs<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let raw = fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| Nii2NhdrError::InvalidBvecFormat)
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Nii2NhdrError::InvalidBvecFormat);
    }

    let width = rows[0].len();
    if rows.iter().any(|r| r.len() != width) {
        return Err(Nii2NhdrError::InvalidBvecFormat);
    }

    if rows.len() == 3 && width != 3 {
        rows = (0..width)
            .map(|col| (0..3).map(|row| rows[row][col]).collect())
            .collect();
    }
    if rows.iter().any(|r| r.len() != 3) {
        return Err(Nii2NhdrError::InvalidBvecFormat);
    }

    let num_vectors = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((num_vectors, 3), flat).map_err(|_| Nii2NhdrError::InvalidBvecFormat)
}

/// Build the output string for one gradient direction.
///
/// For a nonzero b-value the direction is rescaled by sqrt(b / b_max), so
/// that the vector norm encodes the per-volume diffusion weighting relative
/// to the strongest one. Scaling is skipped when the vector norm already
/// equals that factor exactly. The components are joined with three spaces.
pub fn bvec_scaling(bval: f64, bvec: ArrayView1<'_, f64>, b_max: f64) -> String {
    let mut bvec = bvec.to_owned();
    if bval != 0.0 {
        let factor = (bval / b_max).sqrt();
        let norm = bvec.dot(&bvec).sqrt();
        if norm != factor {
            bvec *= factor;
        }
    }

    let components: Vec<String> = bvec.iter().map(|x| x.to_string()).collect();
    components.join("   ")
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;
    use std::path::PathBuf;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn bvals_are_read_from_a_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bval", "0 1000 1000 1000 250\n");
        let bvals = read_bvals(&path).unwrap();
        assert_eq!(array![0., 1000., 1000., 1000., 250.], bvals);
    }

    #[test]
    fn bvals_are_read_across_line_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bval", "0\n1000\n2000\n");
        let bvals = read_bvals(&path).unwrap();
        assert_eq!(array![0., 1000., 2000.], bvals);
    }

    #[test]
    fn an_empty_bval_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bval", "\n");
        assert!(matches!(
            read_bvals(&path),
            Err(Nii2NhdrError::InvalidBvalFormat)
        ));
    }

    #[test]
    fn fsl_layout_bvec_files_are_transposed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bvec", "0 1 0 0 1\n0 0 1 0 0\n0 0 0 1 0\n");
        let bvecs = read_bvecs(&path).unwrap();

        assert_eq!((5, 3), (bvecs.nrows(), bvecs.ncols()));
        assert_eq!(array![1., 0., 0.], bvecs.row(1));
        assert_eq!(array![0., 0., 1.], bvecs.row(3));
    }

    #[test]
    fn per_line_bvec_files_are_taken_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bvec", "0 0 0\n1 0 0\n0 1 0\n0 0 1\n");
        let bvecs = read_bvecs(&path).unwrap();

        assert_eq!((4, 3), (bvecs.nrows(), bvecs.ncols()));
        assert_eq!(array![0., 1., 0.], bvecs.row(2));
    }

    #[test]
    fn ragged_bvec_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bvec", "0 0 0\n1 0\n");
        assert!(matches!(
            read_bvecs(&path),
            Err(Nii2NhdrError::InvalidBvecFormat)
        ));
    }

    #[test]
    fn bvec_files_with_the_wrong_width_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dwi.bvec", "0 0 0 0\n1 0 0 0\n");
        assert!(matches!(
            read_bvecs(&path),
            Err(Nii2NhdrError::InvalidBvecFormat)
        ));
    }

    #[test]
    fn mismatched_table_lengths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bval = write_tmp(&dir, "dwi.bval", "0 1000 1000 1000\n");
        let bvec = write_tmp(&dir, "dwi.bvec", "0 1 0 0 1\n0 0 1 0 0\n0 0 0 1 0\n");
        assert!(matches!(
            GradientTable::from_files(&bval, &bvec),
            Err(Nii2NhdrError::GradientCountMismatch(4, 5))
        ));
    }

    #[test]
    fn the_maximum_bvalue_spans_the_whole_table() {
        let table = GradientTable {
            bvals: array![0., 1000., 2995., 1000.],
            bvecs: Array2::zeros((4, 3)),
        };
        assert_eq!(2995., table.b_max().unwrap());
        assert_eq!(4, table.len());
        assert!(!table.is_empty());
    }

    #[test]
    fn an_undefined_maximum_bvalue_is_an_error() {
        let table = GradientTable {
            bvals: array![0., f64::NAN],
            bvecs: Array2::zeros((2, 3)),
        };
        assert!(matches!(
            table.b_max(),
            Err(Nii2NhdrError::UndefinedMaxBvalue)
        ));
    }

    #[test]
    fn b0_vectors_are_emitted_unscaled() {
        let bvec = array![0., 1., 0.];
        assert_eq!("0   1   0", bvec_scaling(0.0, bvec.view(), 1000.0));
    }

    #[test]
    fn vectors_whose_norm_equals_the_factor_are_left_alone() {
        // factor is sqrt(250 / 1000) = 0.5, exactly the norm of the input
        let bvec = array![0.5, 0., 0.];
        assert_eq!("0.5   0   0", bvec_scaling(250.0, bvec.view(), 1000.0));
    }

    #[test]
    fn unit_vectors_are_scaled_by_the_weighting_factor() {
        let bvec = array![0., 1., 0.];
        assert_eq!("0   0.5   0", bvec_scaling(250.0, bvec.view(), 1000.0));
    }

    #[test]
    fn full_weighting_keeps_unit_vectors_unchanged() {
        let bvec = array![1., 0., 0.];
        assert_eq!("1   0   0", bvec_scaling(1000.0, bvec.view(), 1000.0));
    }
}
