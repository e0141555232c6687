//! Forward 8x8 DCT kernels and their application over whole planes.
//!
//! Three interchangeable kernels produce the same orthonormal
//! coefficients: `direct` evaluates the defining double sum, `matrix`
//! multiplies by the DCT basis matrix, `arai` runs the
//! Arai-Agui-Nakajima factorization (the default; about a fifth of
//! the multiplications).

use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};

use crate::channel::Channel;
use crate::image::Sample;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DctKernel {
    Direct,
    Matrix,
    #[default]
    Arai,
}

impl DctKernel {
    pub fn transform(self, input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
        match self {
            Self::Direct => fdct_direct(input, output),
            Self::Matrix => fdct_matrix(input, output),
            Self::Arai => fdct_arai(input, output),
        }
    }
}

/// The defining sum, O(N^2) per coefficient.
pub fn fdct_direct(input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
    let n = BLOCK_SIZE as Sample;
    for u in 0..BLOCK_SIZE {
        let cu = if u == 0 { FRAC_1_SQRT_2 } else { 1.0 };
        for v in 0..BLOCK_SIZE {
            let cv = if v == 0 { FRAC_1_SQRT_2 } else { 1.0 };
            let mut sum = 0.0;
            for y in 0..BLOCK_SIZE {
                let cos_y = (((2 * y + 1) * u) as Sample * PI / (2.0 * n)).cos();
                for x in 0..BLOCK_SIZE {
                    let cos_x = (((2 * x + 1) * v) as Sample * PI / (2.0 * n)).cos();
                    sum += input[y * BLOCK_SIZE + x] * cos_x * cos_y;
                }
            }
            output[u * BLOCK_SIZE + v] = (2.0 / n) * cu * cv * sum;
        }
    }
}

/// The orthonormal DCT basis matrix A, `A[k][n] = C(k) sqrt(2/N)
/// cos((2n+1) k pi / 2N)`.
fn basis_matrix() -> [[Sample; BLOCK_SIZE]; BLOCK_SIZE] {
    let n = BLOCK_SIZE as Sample;
    let scale = (2.0 / n).sqrt();
    let mut a = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
    for (k, row) in a.iter_mut().enumerate() {
        let c = if k == 0 { FRAC_1_SQRT_2 } else { 1.0 };
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = c * scale * ((2.0 * j as Sample + 1.0) * k as Sample * PI / (2.0 * n)).cos();
        }
    }
    a
}

fn mat_mul(
    a: &[[Sample; BLOCK_SIZE]; BLOCK_SIZE],
    b: &[[Sample; BLOCK_SIZE]; BLOCK_SIZE],
) -> [[Sample; BLOCK_SIZE]; BLOCK_SIZE] {
    let mut out = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        for k in 0..BLOCK_SIZE {
            let aik = a[i][k];
            for j in 0..BLOCK_SIZE {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    out
}

fn transpose(m: &[[Sample; BLOCK_SIZE]; BLOCK_SIZE]) -> [[Sample; BLOCK_SIZE]; BLOCK_SIZE] {
    let mut out = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        for j in 0..BLOCK_SIZE {
            out[j][i] = m[i][j];
        }
    }
    out
}

fn to_rows(flat: &[Sample; BLOCK_DIM]) -> [[Sample; BLOCK_SIZE]; BLOCK_SIZE] {
    let mut out = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
    for (r, row) in out.iter_mut().enumerate() {
        row.copy_from_slice(&flat[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE]);
    }
    out
}

fn to_flat(rows: &[[Sample; BLOCK_SIZE]; BLOCK_SIZE], flat: &mut [Sample; BLOCK_DIM]) {
    for (r, row) in rows.iter().enumerate() {
        flat[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE].copy_from_slice(row);
    }
}

/// `Y = A X A^T` with the basis matrix above.
pub fn fdct_matrix(input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
    let a = basis_matrix();
    let at = transpose(&a);
    let x = to_rows(input);
    let y = mat_mul(&mat_mul(&a, &x), &at);
    to_flat(&y, output);
}

/// `X = A^T Y A`; recovers the spatial block from `fdct_matrix`
/// output.
pub fn idct_matrix(input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
    let a = basis_matrix();
    let at = transpose(&a);
    let y = to_rows(input);
    let x = mat_mul(&mat_mul(&at, &y), &a);
    to_flat(&x, output);
}

struct AraiConstants {
    a: [Sample; 6],
    s: [Sample; 8],
}

fn arai_constants() -> AraiConstants {
    let c = |k: usize| (k as Sample * PI / 16.0).cos();
    let a = [0.0, c(4), c(2) - c(6), c(4), c(6) + c(2), c(6)];
    let mut s = [0.0; 8];
    s[0] = 1.0 / (2.0 * SQRT_2);
    for (k, slot) in s.iter_mut().enumerate().skip(1) {
        *slot = 1.0 / (4.0 * c(k));
    }
    AraiConstants { a, s }
}

/// One 8-point pass down every column; the scaled outputs land
/// transposed, so two passes give the full 2-D transform.
fn arai_pass(consts: &AraiConstants, input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
    let a = &consts.a;
    let s = &consts.s;
    for j in 0..BLOCK_SIZE {
        let x0 = input[j];
        let x1 = input[BLOCK_SIZE + j];
        let x2 = input[2 * BLOCK_SIZE + j];
        let x3 = input[3 * BLOCK_SIZE + j];
        let x4 = input[4 * BLOCK_SIZE + j];
        let x5 = input[5 * BLOCK_SIZE + j];
        let x6 = input[6 * BLOCK_SIZE + j];
        let x7 = input[7 * BLOCK_SIZE + j];

        let z0 = x0 + x7;
        let z1 = x1 + x6;
        let z2 = x2 + x5;
        let z3 = x3 + x4;
        let z4 = x3 - x4;
        let z5 = x2 - x5;
        let z6 = x1 - x6;
        let z7 = x0 - x7;

        let r0 = z0 + z3;
        let r1 = z1 + z2;
        let r2 = z1 - z2;
        let r3 = z0 - z3;
        let r4 = -z4 - z5;
        let r5 = z5 + z6;
        let r6 = z6 + z7;

        let t0 = r0 + r1;
        let t1 = r0 - r1;
        let t2 = (r2 + r3) * a[1];
        let t4 = r4 * a[2];
        let t5 = r5 * a[3];
        let t6 = r6 * a[4];
        let tmp = (r4 + r6) * a[5];

        let u4 = -t4 - tmp;
        let u6 = t6 - tmp;

        let v2 = t2 + r3;
        let v3 = r3 - t2;
        let v5 = t5 + z7;
        let v7 = z7 - t5;

        let w4 = u4 + v7;
        let w5 = v5 + u6;
        let w6 = v5 - u6;
        let w7 = v7 - u4;

        let row = &mut output[j * BLOCK_SIZE..(j + 1) * BLOCK_SIZE];
        row[0] = t0 * s[0];
        row[4] = t1 * s[4];
        row[2] = v2 * s[2];
        row[6] = v3 * s[6];
        row[5] = w4 * s[5];
        row[1] = w5 * s[1];
        row[7] = w6 * s[7];
        row[3] = w7 * s[3];
    }
}

/// Arai-Agui-Nakajima fast DCT: row pass, transpose, column pass.
pub fn fdct_arai(input: &[Sample; BLOCK_DIM], output: &mut [Sample; BLOCK_DIM]) {
    let consts = arai_constants();
    let mut intermediate = [0.0; BLOCK_DIM];
    arai_pass(&consts, input, &mut intermediate);
    arai_pass(&consts, &intermediate, output);
}

fn store_block(data: &mut [Sample], cols: usize, r0: usize, c0: usize, block: &[Sample; BLOCK_DIM]) {
    for r in 0..BLOCK_SIZE {
        let row = &mut data[(r0 + r) * cols + c0..(r0 + r) * cols + c0 + BLOCK_SIZE];
        row.copy_from_slice(&block[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE]);
    }
}

fn transform_rows(
    kernel: DctKernel,
    src: &Channel<Sample>,
    dst: &mut [Sample],
    first_row: usize,
    cols: usize,
) {
    let rows = dst.len() / cols;
    let mut coeffs = [0.0; BLOCK_DIM];
    for r0 in (0..rows).step_by(BLOCK_SIZE) {
        for c0 in (0..cols).step_by(BLOCK_SIZE) {
            let block = src.block(first_row + r0, c0);
            kernel.transform(&block, &mut coeffs);
            store_block(dst, cols, r0, c0, &coeffs);
        }
    }
}

/// Applies the kernel to every 8x8 block of `src`.
///
/// With `workers > 1` the block rows are statically partitioned into
/// contiguous ranges, one scoped thread per range; each worker reads
/// the shared source and owns a disjoint slice of the destination.
/// The scope join is the barrier before quantization.
pub fn forward_channel(src: &Channel<Sample>, kernel: DctKernel, workers: usize) -> Channel<Sample> {
    let (rows, cols) = (src.rows(), src.cols());
    debug_assert!(rows % BLOCK_SIZE == 0 && cols % BLOCK_SIZE == 0);

    let mut dst = Channel::<Sample>::new(rows, cols);
    let block_rows = rows / BLOCK_SIZE;
    let workers = workers.max(1).min(block_rows.max(1));

    if workers <= 1 {
        transform_rows(kernel, src, dst.data_mut(), 0, cols);
        return dst;
    }

    let rows_per_worker = block_rows.div_ceil(workers) * BLOCK_SIZE;
    std::thread::scope(|scope| {
        for (i, chunk) in dst.data_mut().chunks_mut(rows_per_worker * cols).enumerate() {
            scope.spawn(move || {
                transform_rows(kernel, src, chunk, i * rows_per_worker, cols);
            });
        }
    });
    dst
}
