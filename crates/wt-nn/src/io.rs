// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::module::{Module, StateDict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use wt_tensor::{PureResult, Tensor, TensorError};

/// On-disk encoding of a module checkpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    #[default]
    Bincode,
    Json,
}

impl CheckpointFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CheckpointFormat::Bincode => "bin",
            CheckpointFormat::Json => "json",
        }
    }

    /// Joins `{stem}.{extension}` onto `dir`.
    pub fn path_in(self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{stem}.{}", self.extension()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredTensor {
    dims: Vec<usize>,
    data: Vec<f32>,
}

impl StoredTensor {
    fn from_tensor(tensor: &Tensor) -> StoredTensor {
        StoredTensor {
            dims: tensor.dims().to_vec(),
            data: tensor.data().to_vec(),
        }
    }

    fn into_tensor(self) -> PureResult<Tensor> {
        Tensor::from_vec(self.dims, self.data)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ModuleSnapshot {
    parameters: BTreeMap<String, StoredTensor>,
}

fn snapshot_from_state(state: &StateDict) -> ModuleSnapshot {
    let parameters = state
        .iter()
        .map(|(name, tensor)| (name.clone(), StoredTensor::from_tensor(tensor)))
        .collect();
    ModuleSnapshot { parameters }
}

fn from_snapshot(snapshot: ModuleSnapshot) -> PureResult<StateDict> {
    let mut state = StateDict::new();
    for (name, tensor) in snapshot.parameters {
        state.insert(name, tensor.into_tensor()?);
    }
    Ok(state)
}

fn serde_error(err: impl ToString) -> TensorError {
    TensorError::SerializationError {
        message: err.to_string(),
    }
}

fn create(path: &Path) -> PureResult<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn open(path: &Path) -> PureResult<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

pub fn save_state_dict_json<P: AsRef<Path>>(state: &StateDict, path: P) -> PureResult<()> {
    let mut writer = create(path.as_ref())?;
    serde_json::to_writer_pretty(&mut writer, &snapshot_from_state(state)).map_err(serde_error)?;
    writer.flush()?;
    Ok(())
}

pub fn load_state_dict_json<P: AsRef<Path>>(path: P) -> PureResult<StateDict> {
    let snapshot: ModuleSnapshot =
        serde_json::from_reader(open(path.as_ref())?).map_err(serde_error)?;
    from_snapshot(snapshot)
}

pub fn save_state_dict_bincode<P: AsRef<Path>>(state: &StateDict, path: P) -> PureResult<()> {
    let mut writer = create(path.as_ref())?;
    bincode::serialize_into(&mut writer, &snapshot_from_state(state)).map_err(serde_error)?;
    writer.flush()?;
    Ok(())
}

pub fn load_state_dict_bincode<P: AsRef<Path>>(path: P) -> PureResult<StateDict> {
    let snapshot: ModuleSnapshot =
        bincode::deserialize_from(open(path.as_ref())?).map_err(serde_error)?;
    from_snapshot(snapshot)
}

pub fn save_json<M: Module + ?Sized, P: AsRef<Path>>(module: &M, path: P) -> PureResult<()> {
    save_state_dict_json(&module.state_dict()?, path)
}

pub fn load_json<M: Module + ?Sized, P: AsRef<Path>>(module: &mut M, path: P) -> PureResult<()> {
    let state = load_state_dict_json(path)?;
    module.load_state_dict(&state)
}

pub fn save_bincode<M: Module + ?Sized, P: AsRef<Path>>(module: &M, path: P) -> PureResult<()> {
    save_state_dict_bincode(&module.state_dict()?, path)
}

pub fn load_bincode<M: Module + ?Sized, P: AsRef<Path>>(
    module: &mut M,
    path: P,
) -> PureResult<()> {
    let state = load_state_dict_bincode(path)?;
    module.load_state_dict(&state)
}

/// Writes `module`'s state dict in the requested format.
pub fn save_checkpoint<M: Module + ?Sized>(
    module: &M,
    path: &Path,
    format: CheckpointFormat,
) -> PureResult<()> {
    tracing::debug!(path = %path.display(), ?format, "writing checkpoint");
    match format {
        CheckpointFormat::Bincode => save_bincode(module, path),
        CheckpointFormat::Json => save_json(module, path),
    }
}

pub fn load_state_dict(path: &Path, format: CheckpointFormat) -> PureResult<StateDict> {
    match format {
        CheckpointFormat::Bincode => load_state_dict_bincode(path),
        CheckpointFormat::Json => load_state_dict_json(path),
    }
}
