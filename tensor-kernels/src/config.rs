//! Process-wide kernel selection.
//!
//! # TOML Format
//! ```toml
//! use_simd = true
//! use_intrinsics = false
//! matmul = "vectorized"
//! ```

use crate::{KernelError, MatMulKernel, hardware};
use std::path::Path;
use std::sync::RwLock;

static CURRENT: RwLock<KernelConfig> = RwLock::new(KernelConfig::DEFAULT);

/// Selects which kernel tiers the tensor operations use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Use the lane-vectorized kernels.
    pub use_simd: bool,
    /// Use fused multiply-add intrinsics when the hardware has them.
    pub use_intrinsics: bool,
    /// Explicit matmul tier, overrides both flags above.
    pub matmul: Option<MatMulKernel>,
}

impl KernelConfig {
    const DEFAULT: KernelConfig = KernelConfig {
        use_simd: true,
        use_intrinsics: false,
        matmul: None,
    };

    /// Vectorized kernels plus intrinsics.
    pub fn enable_intrinsics() -> Self {
        Self {
            use_intrinsics: true,
            ..Self::DEFAULT
        }
    }

    /// Vectorized kernels without intrinsics.
    pub fn enable_simd_only() -> Self {
        Self::DEFAULT
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, KernelError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KernelError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), ?config, "loaded kernel config");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, KernelError> {
        toml::from_str(toml_str).map_err(|e| KernelError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, KernelError> {
        toml::to_string_pretty(self)
            .map_err(|e| KernelError::Config(format!("TOML serialise error: {e}")))
    }

    /// Makes this configuration the one returned by [`KernelConfig::current`].
    pub fn install(self) {
        tracing::info!(
            simd = self.use_simd,
            intrinsics = self.use_intrinsics,
            isa = hardware::short_info(),
            "installing kernel config"
        );
        if self.use_intrinsics && !hardware::has_fused_multiply_add() {
            tracing::warn!("intrinsics requested but no fused multiply-add unit was detected");
        }
        let mut guard = CURRENT.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = self;
    }

    /// Returns a copy of the installed configuration.
    pub fn current() -> Self {
        *CURRENT.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolves the matmul tier: explicit override, then intrinsics, then SIMD, then scalar.
    pub fn matmul_kernel(&self) -> MatMulKernel {
        match self.matmul {
            Some(kernel) => kernel,
            None if self.use_intrinsics => MatMulKernel::Intrinsics,
            None if self.use_simd => MatMulKernel::Vectorized,
            None => MatMulKernel::Managed,
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
