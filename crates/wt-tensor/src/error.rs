// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the toolkit.
pub type PureResult<T> = Result<T, TensorError>;

/// Errors raised by tensor constructors, transforms and the IO helpers built on them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TensorError {
    /// A constructor received an empty shape or a zero-sized axis.
    #[error("invalid tensor dimensions {dims:?}; every axis must be non-zero")]
    InvalidDimensions { dims: Vec<usize> },
    /// Data provided to a constructor does not match the tensor volume.
    #[error("data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },
    /// Two operands cannot be combined.
    #[error("shape mismatch: left={left:?}, right={right:?} cannot be combined")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    /// The tensor rank or spatial layout is not supported by the operation.
    #[error("unsupported layout {dims:?}: {label}")]
    UnsupportedLayout { label: &'static str, dims: Vec<usize> },
    /// Generic configuration violation.
    #[error("invalid value for {label}")]
    InvalidValue { label: &'static str },
    /// Computation received an empty input.
    #[error("{0} must not be empty for this computation")]
    EmptyInput(&'static str),
    /// A state dict did not contain a parameter the module expects.
    #[error("parameter '{name}' is missing from the state dict")]
    MissingParameter { name: String },
    /// Wrapper around I/O failures when persisting artifacts.
    #[error("i/o error: {message}")]
    IoError { message: String },
    /// Wrapper around serde failures when (de)serialising checkpoints.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
    /// Wrapper around image encoding or decoding failures.
    #[error("image error: {message}")]
    ImageError { message: String },
}

impl From<std::io::Error> for TensorError {
    fn from(err: std::io::Error) -> Self {
        TensorError::IoError {
            message: err.to_string(),
        }
    }
}
