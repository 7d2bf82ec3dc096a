//! Runtime detection of the vector instruction sets the kernels can use.

/// Check if AVX2 is available (x86_64 only).
#[cfg(target_arch = "x86_64")]
pub fn has_avx2() -> bool {
    is_x86_feature_detected!("avx2")
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_avx2() -> bool {
    false
}

/// Check if both AVX and FMA are available, which is what the x86_64 intrinsic matmul needs.
#[cfg(target_arch = "x86_64")]
pub fn has_fma() -> bool {
    is_x86_feature_detected!("avx") && is_x86_feature_detected!("fma")
}

#[cfg(not(target_arch = "x86_64"))]
pub fn has_fma() -> bool {
    false
}

/// Check if NEON is available (ARM only).
#[cfg(target_arch = "aarch64")]
pub fn has_neon() -> bool {
    // NEON is mandatory on aarch64
    true
}

#[cfg(not(target_arch = "aarch64"))]
pub fn has_neon() -> bool {
    false
}

/// True when [`crate::matmul::mm_intrinsics`] runs a hardware path instead of falling back.
pub fn has_fused_multiply_add() -> bool {
    has_fma() || has_neon()
}

/// Number of `f32` lanes in one vector register of the intrinsic kernels.
pub fn f32_lanes() -> usize {
    if has_fma() {
        8
    } else if has_neon() {
        4
    } else {
        1
    }
}

/// Short name of the best instruction set detected on this machine.
#[cfg(target_arch = "x86_64")]
pub fn short_info() -> &'static str {
    if is_x86_feature_detected!("avx512f") {
        "AVX512F"
    } else if is_x86_feature_detected!("avx2") {
        "AVX2"
    } else if is_x86_feature_detected!("avx") {
        "AVX"
    } else if is_x86_feature_detected!("sse4.2") {
        "SSE4.2"
    } else if is_x86_feature_detected!("sse4.1") {
        "SSE4.1"
    } else if is_x86_feature_detected!("ssse3") {
        "SSSE3"
    } else if is_x86_feature_detected!("sse3") {
        "SSE3"
    } else {
        "SSE2"
    }
}

#[cfg(target_arch = "aarch64")]
pub fn short_info() -> &'static str {
    "AdvSIMD"
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn short_info() -> &'static str {
    "scalar"
}

/// Comma separated list of the detected extensions relevant to the kernels.
pub fn full_info() -> String {
    let mut parts = vec![short_info().to_string()];
    if has_fma() {
        parts.push("FMA".to_string());
    }
    if has_neon() && short_info() != "AdvSIMD" {
        parts.push("NEON".to_string());
    }
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_match_detected_features() {
        let lanes = f32_lanes();
        assert!(lanes == 1 || lanes == 4 || lanes == 8);
        assert_eq!(lanes > 1, has_fused_multiply_add());
    }

    #[test]
    fn full_info_starts_with_short_info() {
        assert!(full_info().starts_with(short_info()));
    }
}
