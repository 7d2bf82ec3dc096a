use thiserror::Error;

/// Errors raised by the kernels when their preconditions do not hold.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum KernelError {
    /// A buffer is shorter than the dimensions passed alongside it require.
    #[error("buffer '{name}' too small: expected at least {expected} elements, got {actual}")]
    BufferTooSmall {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Convolution or pooling geometry that yields no output.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Channel counts not divisible by the number of groups.
    #[error("{channels} {what} channels are not divisible into {group} groups")]
    InvalidGroups {
        what: &'static str,
        channels: usize,
        group: usize,
    },

    /// Configuration could not be read, parsed or serialised.
    #[error("config error: {0}")]
    Config(String),
}

pub(crate) fn ensure_len(name: &'static str, actual: usize, expected: usize) -> Result<(), KernelError> {
    if actual < expected {
        return Err(KernelError::BufferTooSmall {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}
