//! Error types for rastersimd-core.
//!
//! Kernels never return errors from their hot loops. Errors only surface at
//! construction boundaries: raster views, aligned allocations, configuration
//! loading and Synet tensor arguments.

use thiserror::Error;

/// Kernel library error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing slice is shorter than the raster extent it must describe.
    #[error("Raster extent error: {width}x{height} with stride {stride} needs {required} elements, got {actual}")]
    RasterExtent {
        /// Raster width in elements.
        width: usize,
        /// Raster height in rows.
        height: usize,
        /// Row stride in elements.
        stride: usize,
        /// Minimum slice length for this extent.
        required: usize,
        /// Actual slice length.
        actual: usize,
    },

    /// The raster extent does not fit in `usize`.
    #[error("Raster extent overflow: {width}x{height} with stride {stride} exceeds the address space")]
    RasterOverflow {
        /// Raster width in elements.
        width: usize,
        /// Raster height in rows.
        height: usize,
        /// Row stride in elements.
        stride: usize,
    },

    /// Row stride is smaller than the row width.
    #[error("Invalid stride: stride {stride} is smaller than width {width}")]
    InvalidStride {
        /// Row stride in elements.
        stride: usize,
        /// Raster width in elements.
        width: usize,
    },

    /// Alignment is zero or not a power of two.
    #[error("Invalid alignment: {0} is not a power of two")]
    InvalidAlignment(usize),

    /// The allocator could not satisfy an aligned allocation.
    #[error("Allocation failed: {bytes} bytes aligned to {align}")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// A tensor argument does not carry the element type the kernel was built for.
    #[error("Tensor type mismatch: {0}")]
    TensorType(String),

    /// A tensor argument has the wrong number of elements.
    #[error("Tensor shape mismatch: {0}")]
    TensorShape(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration extraction error.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Result type alias for kernel library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_extent_display() {
        let err = Error::RasterExtent {
            width: 16,
            height: 4,
            stride: 20,
            required: 76,
            actual: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("16x4"));
        assert!(msg.contains("76"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_invalid_stride_display() {
        let err = Error::InvalidStride {
            stride: 3,
            width: 8,
        };
        assert_eq!(
            err.to_string(),
            "Invalid stride: stride 3 is smaller than width 8"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_figment_error_is_boxed() {
        let err: Error = figment::Error::from("bad value".to_string()).into();
        assert!(matches!(err, Error::Figment(_)));
        assert!(err.to_string().contains("bad value"));
    }
}
