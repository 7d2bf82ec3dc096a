//! Matrix multiplication kernels.
//!
//! Every kernel accumulates `C[M,K] += A[M,N] * B[N,K]` over row-major buffers. The loop order is
//! `i, j, k` so that the innermost loop scans a row of `B` and a row of `C` contiguously.

use crate::error::ensure_len;
use crate::{KernelError, Scalar, hardware};

/// Fixed width of the lane-vectorized kernel.
pub const LANES: usize = 8;

/// Matrix multiplication implementation tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatMulKernel {
    /// Bounds checked scalar triple loop.
    Managed,
    /// Inner loop split into fixed-width lanes with a scalar tail.
    Vectorized,
    /// Scalar triple loop over raw pointers.
    Unsafe,
    /// Fused multiply-add intrinsics with a register-blocked kernel.
    Intrinsics,
}

impl MatMulKernel {
    pub const ALL: [MatMulKernel; 4] = [
        MatMulKernel::Managed,
        MatMulKernel::Vectorized,
        MatMulKernel::Unsafe,
        MatMulKernel::Intrinsics,
    ];
}

/// Validates buffer sizes and runs the requested tier.
pub fn matmul<T: Scalar>(
    kernel: MatMulKernel,
    m: usize,
    n: usize,
    k: usize,
    a: &[T],
    b: &[T],
    c: &mut [T],
) -> Result<(), KernelError> {
    ensure_len("a", a.len(), m * n)?;
    ensure_len("b", b.len(), n * k)?;
    ensure_len("c", c.len(), m * k)?;

    tracing::trace!(?kernel, m, n, k, "matmul");

    match kernel {
        MatMulKernel::Managed => mm_managed(m, n, k, a, b, c),
        MatMulKernel::Vectorized => mm_vectorized(m, n, k, a, b, c),
        // SAFETY: lengths were checked above and `c` is a unique borrow, so it cannot alias `a` or `b`.
        MatMulKernel::Unsafe => unsafe {
            mm_unsafe(m, n, k, a.as_ptr(), b.as_ptr(), c.as_mut_ptr())
        },
        MatMulKernel::Intrinsics => T::mm_fused(m, n, k, a, b, c),
    }

    Ok(())
}

/// Scalar reference kernel.
///
/// # Panics
/// When a buffer is shorter than its dimensions require.
pub fn mm_managed<T: Scalar>(m: usize, n: usize, k: usize, a: &[T], b: &[T], c: &mut [T]) {
    for i in 0..m {
        for j in 0..n {
            let av = a[i * n + j];
            for l in 0..k {
                c[i * k + l] += av * b[j * k + l];
            }
        }
    }
}

/// Same loop as [`mm_managed`] with the inner dimension processed [`LANES`] elements at a time.
///
/// # Panics
/// When a buffer is shorter than its dimensions require.
pub fn mm_vectorized<T: Scalar>(m: usize, n: usize, k: usize, a: &[T], b: &[T], c: &mut [T]) {
    if k == 0 {
        return;
    }

    for (i, c_row) in c[..m * k].chunks_exact_mut(k).enumerate() {
        let a_row = &a[i * n..(i + 1) * n];
        for (j, &av) in a_row.iter().enumerate() {
            let b_row = &b[j * k..(j + 1) * k];

            let mut c_lanes = c_row.chunks_exact_mut(LANES);
            let mut b_lanes = b_row.chunks_exact(LANES);
            for (cv, bv) in (&mut c_lanes).zip(&mut b_lanes) {
                for lane in 0..LANES {
                    cv[lane] += av * bv[lane];
                }
            }

            for (cv, &bv) in c_lanes.into_remainder().iter_mut().zip(b_lanes.remainder()) {
                *cv += av * bv;
            }
        }
    }
}

/// Scalar kernel over raw pointers, without bounds checks.
///
/// # Safety
/// `a` must be valid for `m * n` reads, `b` for `n * k` reads and `c` for `m * k` reads and
/// writes. `c` must not overlap `a` or `b`.
pub unsafe fn mm_unsafe<T: Scalar>(
    m: usize,
    n: usize,
    k: usize,
    a: *const T,
    b: *const T,
    c: *mut T,
) {
    for i in 0..m {
        // SAFETY: every offset stays within the extents the caller guarantees.
        unsafe {
            let ap = a.add(i * n);
            let cp = c.add(i * k);
            for j in 0..n {
                let av = *ap.add(j);
                let bp = b.add(j * k);
                for l in 0..k {
                    *cp.add(l) += av * *bp.add(l);
                }
            }
        }
    }
}

/// Fused multiply-add kernel for `f32`.
///
/// Runs AVX+FMA on x86_64 and NEON on aarch64. When `m` is even and `k` is a multiple of four
/// vector widths the register-blocked kernel computes two rows of `C` per pass over `B`. Machines
/// without either extension fall back to [`mm_vectorized`].
///
/// # Panics
/// When a buffer is shorter than its dimensions require.
pub fn mm_intrinsics(m: usize, n: usize, k: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
    assert!(a.len() >= m * n, "buffer 'a' too small");
    assert!(b.len() >= n * k, "buffer 'b' too small");
    assert!(c.len() >= m * k, "buffer 'c' too small");

    #[cfg(target_arch = "x86_64")]
    {
        if hardware::has_fma() {
            // SAFETY: features were detected at runtime and buffer sizes asserted above.
            unsafe { x86::mm(m, n, k, a, b, c) };
            return;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is mandatory on aarch64 and buffer sizes were asserted above.
        unsafe { neon::mm(m, n, k, a, b, c) };
        return;
    }

    #[allow(unreachable_code)]
    {
        tracing::debug!(isa = hardware::short_info(), "no fused multiply-add, using lane kernel");
        mm_vectorized(m, n, k, a, b, c);
    }
}

/// True when [`mm_intrinsics`] takes the two-row blocked path for this shape on this machine.
pub fn uses_blocked_kernel(m: usize, k: usize) -> bool {
    let lanes = hardware::f32_lanes();
    lanes > 1 && m % 2 == 0 && k % (4 * lanes) == 0
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    const W: usize = 8;

    #[target_feature(enable = "avx,fma")]
    pub(super) unsafe fn mm(m: usize, n: usize, k: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
        let ap = a.as_ptr();
        let bp = b.as_ptr();
        let cp = c.as_mut_ptr();

        // SAFETY: callers assert the buffer extents, every pointer below stays within them.
        unsafe {
            if m % 2 == 0 && k % (4 * W) == 0 {
                for i in (0..m).step_by(2) {
                    block_2x4(
                        n,
                        k,
                        ap.add(i * n),
                        ap.add((i + 1) * n),
                        bp,
                        cp.add(i * k),
                        cp.add((i + 1) * k),
                    );
                }
                return;
            }

            let full = k - k % W;
            for i in 0..m {
                let c_row = cp.add(i * k);
                for j in 0..n {
                    let av = *ap.add(i * n + j);
                    let a_vec = _mm256_set1_ps(av);
                    let b_row = bp.add(j * k);
                    let mut l = 0;
                    while l < full {
                        let acc = _mm256_loadu_ps(c_row.add(l));
                        let bv = _mm256_loadu_ps(b_row.add(l));
                        _mm256_storeu_ps(c_row.add(l), _mm256_fmadd_ps(a_vec, bv, acc));
                        l += W;
                    }
                    while l < k {
                        *c_row.add(l) += av * *b_row.add(l);
                        l += 1;
                    }
                }
            }
        }
    }

    /// Two rows of `C`, four vectors wide: each `B` load feeds both rows.
    #[target_feature(enable = "avx,fma")]
    unsafe fn block_2x4(
        n: usize,
        k: usize,
        a0: *const f32,
        a1: *const f32,
        b: *const f32,
        c0: *mut f32,
        c1: *mut f32,
    ) {
        // SAFETY: `k` is a multiple of 4 * W and all rows have `k` elements.
        unsafe {
            for l in (0..k).step_by(4 * W) {
                let mut c00 = _mm256_loadu_ps(c0.add(l));
                let mut c01 = _mm256_loadu_ps(c0.add(l + W));
                let mut c02 = _mm256_loadu_ps(c0.add(l + 2 * W));
                let mut c03 = _mm256_loadu_ps(c0.add(l + 3 * W));
                let mut c10 = _mm256_loadu_ps(c1.add(l));
                let mut c11 = _mm256_loadu_ps(c1.add(l + W));
                let mut c12 = _mm256_loadu_ps(c1.add(l + 2 * W));
                let mut c13 = _mm256_loadu_ps(c1.add(l + 3 * W));

                for j in 0..n {
                    let av0 = _mm256_set1_ps(*a0.add(j));
                    let av1 = _mm256_set1_ps(*a1.add(j));
                    let b_row = b.add(j * k + l);

                    let b0 = _mm256_loadu_ps(b_row);
                    c00 = _mm256_fmadd_ps(av0, b0, c00);
                    c10 = _mm256_fmadd_ps(av1, b0, c10);
                    let b1 = _mm256_loadu_ps(b_row.add(W));
                    c01 = _mm256_fmadd_ps(av0, b1, c01);
                    c11 = _mm256_fmadd_ps(av1, b1, c11);
                    let b2 = _mm256_loadu_ps(b_row.add(2 * W));
                    c02 = _mm256_fmadd_ps(av0, b2, c02);
                    c12 = _mm256_fmadd_ps(av1, b2, c12);
                    let b3 = _mm256_loadu_ps(b_row.add(3 * W));
                    c03 = _mm256_fmadd_ps(av0, b3, c03);
                    c13 = _mm256_fmadd_ps(av1, b3, c13);
                }

                _mm256_storeu_ps(c0.add(l), c00);
                _mm256_storeu_ps(c0.add(l + W), c01);
                _mm256_storeu_ps(c0.add(l + 2 * W), c02);
                _mm256_storeu_ps(c0.add(l + 3 * W), c03);
                _mm256_storeu_ps(c1.add(l), c10);
                _mm256_storeu_ps(c1.add(l + W), c11);
                _mm256_storeu_ps(c1.add(l + 2 * W), c12);
                _mm256_storeu_ps(c1.add(l + 3 * W), c13);
            }
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    const W: usize = 4;

    #[target_feature(enable = "neon")]
    pub(super) unsafe fn mm(m: usize, n: usize, k: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
        let ap = a.as_ptr();
        let bp = b.as_ptr();
        let cp = c.as_mut_ptr();

        // SAFETY: callers assert the buffer extents, every pointer below stays within them.
        unsafe {
            if m % 2 == 0 && k % (4 * W) == 0 {
                for i in (0..m).step_by(2) {
                    block_2x4(
                        n,
                        k,
                        ap.add(i * n),
                        ap.add((i + 1) * n),
                        bp,
                        cp.add(i * k),
                        cp.add((i + 1) * k),
                    );
                }
                return;
            }

            let full = k - k % W;
            for i in 0..m {
                let c_row = cp.add(i * k);
                for j in 0..n {
                    let av = *ap.add(i * n + j);
                    let a_vec = vdupq_n_f32(av);
                    let b_row = bp.add(j * k);
                    let mut l = 0;
                    while l < full {
                        let acc = vld1q_f32(c_row.add(l));
                        let bv = vld1q_f32(b_row.add(l));
                        vst1q_f32(c_row.add(l), vfmaq_f32(acc, a_vec, bv));
                        l += W;
                    }
                    while l < k {
                        *c_row.add(l) += av * *b_row.add(l);
                        l += 1;
                    }
                }
            }
        }
    }

    #[target_feature(enable = "neon")]
    unsafe fn block_2x4(
        n: usize,
        k: usize,
        a0: *const f32,
        a1: *const f32,
        b: *const f32,
        c0: *mut f32,
        c1: *mut f32,
    ) {
        // SAFETY: `k` is a multiple of 4 * W and all rows have `k` elements.
        unsafe {
            for l in (0..k).step_by(4 * W) {
                let mut c00 = vld1q_f32(c0.add(l));
                let mut c01 = vld1q_f32(c0.add(l + W));
                let mut c02 = vld1q_f32(c0.add(l + 2 * W));
                let mut c03 = vld1q_f32(c0.add(l + 3 * W));
                let mut c10 = vld1q_f32(c1.add(l));
                let mut c11 = vld1q_f32(c1.add(l + W));
                let mut c12 = vld1q_f32(c1.add(l + 2 * W));
                let mut c13 = vld1q_f32(c1.add(l + 3 * W));

                for j in 0..n {
                    let av0 = vdupq_n_f32(*a0.add(j));
                    let av1 = vdupq_n_f32(*a1.add(j));
                    let b_row = b.add(j * k + l);

                    let b0 = vld1q_f32(b_row);
                    c00 = vfmaq_f32(c00, av0, b0);
                    c10 = vfmaq_f32(c10, av1, b0);
                    let b1 = vld1q_f32(b_row.add(W));
                    c01 = vfmaq_f32(c01, av0, b1);
                    c11 = vfmaq_f32(c11, av1, b1);
                    let b2 = vld1q_f32(b_row.add(2 * W));
                    c02 = vfmaq_f32(c02, av0, b2);
                    c12 = vfmaq_f32(c12, av1, b2);
                    let b3 = vld1q_f32(b_row.add(3 * W));
                    c03 = vfmaq_f32(c03, av0, b3);
                    c13 = vfmaq_f32(c13, av1, b3);
                }

                vst1q_f32(c0.add(l), c00);
                vst1q_f32(c0.add(l + W), c01);
                vst1q_f32(c0.add(l + 2 * W), c02);
                vst1q_f32(c0.add(l + 3 * W), c03);
                vst1q_f32(c1.add(l), c10);
                vst1q_f32(c1.add(l + W), c11);
                vst1q_f32(c1.add(l + 2 * W), c12);
                vst1q_f32(c1.add(l + 3 * W), c13);
            }
        }
    }
}
