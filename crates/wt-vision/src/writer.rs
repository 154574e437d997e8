// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Scalar sinks for evaluation summaries.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use wt_tensor::{PureResult, TensorError};

/// Receives tagged scalar values keyed by step.
pub trait ScalarWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> PureResult<()>;

    fn flush(&mut self) -> PureResult<()> {
        Ok(())
    }
}

/// Discards every scalar.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl ScalarWriter for NullWriter {
    fn add_scalar(&mut self, _tag: &str, _value: f32, _step: usize) -> PureResult<()> {
        Ok(())
    }
}

/// Emits each scalar as an `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWriter;

impl ScalarWriter for TracingWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> PureResult<()> {
        tracing::info!(tag, value, step, "scalar");
        Ok(())
    }
}

/// One line of a [`JsonlWriter`] log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f32,
    pub step: usize,
}

/// Appends one JSON object per scalar to a file.
#[derive(Debug)]
pub struct JsonlWriter {
    writer: BufWriter<File>,
}

impl JsonlWriter {
    pub fn open<P: AsRef<Path>>(path: P) -> PureResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ScalarWriter for JsonlWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> PureResult<()> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
        };
        serde_json::to_writer(&mut self.writer, &record).map_err(|err| {
            TensorError::SerializationError {
                message: err.to_string(),
            }
        })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> PureResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: ScalarWriter + ?Sized> ScalarWriter for &mut W {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> PureResult<()> {
        (**self).add_scalar(tag, value, step)
    }

    fn flush(&mut self) -> PureResult<()> {
        (**self).flush()
    }
}
