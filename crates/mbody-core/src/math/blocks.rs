//! Sub-matrix insertion helpers for global assembly
//!
//! All global quantities are dense; element contributions are written into
//! them block by block at row/column offsets.

use nalgebra::storage::RawStorage;
use nalgebra::{DMatrix, DVector, Dim, Matrix, Matrix3, U1};

/// Overwrite `target[row.., col..]` with `block`
pub fn insert_block<R, C, S>(target: &mut DMatrix<f64>, row: usize, col: usize, block: &Matrix<f64, R, C, S>)
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    for j in 0..block.ncols() {
        for i in 0..block.nrows() {
            target[(row + i, col + j)] = block[(i, j)];
        }
    }
}

/// Accumulate `block` into `target[row.., col..]`
pub fn add_block<R, C, S>(target: &mut DMatrix<f64>, row: usize, col: usize, block: &Matrix<f64, R, C, S>)
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    for j in 0..block.ncols() {
        for i in 0..block.nrows() {
            target[(row + i, col + j)] += block[(i, j)];
        }
    }
}

/// Overwrite the diagonal block starting at `(index, index)`
pub fn insert_diagonal_block<R, C, S>(target: &mut DMatrix<f64>, index: usize, block: &Matrix<f64, R, C, S>)
where
    R: Dim,
    C: Dim,
    S: RawStorage<f64, R, C>,
{
    insert_block(target, index, index, block);
}

/// Overwrite `target[index..]` with `segment`
pub fn insert_segment<R, S>(target: &mut DVector<f64>, index: usize, segment: &Matrix<f64, R, U1, S>)
where
    R: Dim,
    S: RawStorage<f64, R, U1>,
{
    for i in 0..segment.nrows() {
        target[index + i] = segment[i];
    }
}

/// Accumulate `segment` into `target[index..]`
pub fn add_segment<R, S>(target: &mut DVector<f64>, index: usize, segment: &Matrix<f64, R, U1, S>)
where
    R: Dim,
    S: RawStorage<f64, R, U1>,
{
    for i in 0..segment.nrows() {
        target[index + i] += segment[i];
    }
}

/// Expand a scalar selection matrix into its 3×3 identity-block form
///
/// Every entry `k` of `keep` becomes the block `k·I₃`, i.e. `keep ⊗ I₃`.
pub fn identity_blocks(keep: &DMatrix<f64>) -> DMatrix<f64> {
    keep.kronecker(&Matrix3::<f64>::identity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2, Vector2};

    #[test]
    fn test_insert_and_add_block() {
        let mut m = DMatrix::zeros(4, 4);
        let block = Matrix2::new(1.0, 2.0, 3.0, 4.0);

        insert_block(&mut m, 1, 2, &block);
        assert_eq!(m[(1, 2)], 1.0);
        assert_eq!(m[(1, 3)], 2.0);
        assert_eq!(m[(2, 2)], 3.0);
        assert_eq!(m[(2, 3)], 4.0);

        add_block(&mut m, 1, 2, &block);
        assert_eq!(m[(2, 3)], 8.0);
        assert_eq!(m.sum(), 20.0);
    }

    #[test]
    fn test_diagonal_block_and_segments() {
        let mut m = DMatrix::zeros(3, 3);
        insert_diagonal_block(&mut m, 1, &Matrix2::identity());
        assert_eq!(m.trace(), 2.0);
        assert_eq!(m[(0, 0)], 0.0);

        let mut v = DVector::zeros(4);
        insert_segment(&mut v, 2, &Vector2::new(5.0, 6.0));
        add_segment(&mut v, 1, &Vector2::new(1.0, 1.0));
        assert_eq!(v.as_slice(), &[0.0, 1.0, 6.0, 6.0]);
    }

    #[test]
    fn test_identity_blocks() {
        let mut keep = DMatrix::zeros(2, 1);
        keep[(1, 0)] = 1.0;

        let expanded = identity_blocks(&keep);
        assert_eq!(expanded.shape(), (6, 3));
        assert_eq!(expanded[(3, 0)], 1.0);
        assert_eq!(expanded[(4, 1)], 1.0);
        assert_eq!(expanded[(5, 2)], 1.0);
        assert_eq!(expanded.sum(), 3.0);
    }
}
