// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Two-layer run configuration: a TOML base overridden by a JSON run file.
//!
//! Tables merge key by key; any other value in a later layer replaces the
//! earlier one outright.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

pub const ROOT_VAR: &str = "WTVAE_CONFIG_ROOT";
pub const BASE_VAR: &str = "WTVAE_CONFIG_BASE";
pub const RUN_VAR: &str = "WTVAE_CONFIG_RUN";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerFormat {
    Toml,
    Json,
}

impl fmt::Display for LayerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerFormat::Toml => "TOML",
            LayerFormat::Json => "JSON",
        })
    }
}

/// Paths of the base and run layers. Either may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigLayering {
    pub base: Option<PathBuf>,
    pub run: Option<PathBuf>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

/// `root_override`, else `<home>/.wtvae`, else the working directory.
fn resolve_root(root_override: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    root_override
        .or_else(|| home.map(|home| home.join(".wtvae")))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl ConfigLayering {
    /// Resolves the layers from `WTVAE_CONFIG_ROOT`, `WTVAE_CONFIG_BASE` and
    /// `WTVAE_CONFIG_RUN`. See [`ConfigLayering::discover_from`].
    pub fn discover() -> Self {
        let root = resolve_root(env_path(ROOT_VAR), dirs::home_dir());
        Self::discover_from(&root, env_path(BASE_VAR), env_path(RUN_VAR))
    }

    /// Each layer comes from its override or `<root>/base.toml` and
    /// `<root>/run.json`. Only files that exist are kept; a missing override
    /// does not fall back to the root.
    pub fn discover_from(
        root: &Path,
        base_override: Option<PathBuf>,
        run_override: Option<PathBuf>,
    ) -> Self {
        let locate = |path: Option<PathBuf>, file: &str| {
            Some(path.unwrap_or_else(|| root.join(file))).filter(|path| path.is_file())
        };
        Self {
            base: locate(base_override, "base.toml"),
            run: locate(run_override, "run.json"),
        }
    }

    pub fn with_base<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            base: Some(path.into()),
            ..self
        }
    }

    pub fn with_run<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            run: Some(path.into()),
            ..self
        }
    }

    fn layers(&self) -> impl Iterator<Item = (&Path, LayerFormat)> {
        let base = self.base.as_deref().map(|path| (path, LayerFormat::Toml));
        let run = self.run.as_deref().map(|path| (path, LayerFormat::Json));
        base.into_iter().chain(run)
    }
}

/// Merged view over every layer that was found on disk.
#[derive(Clone, Debug)]
pub struct LayeredConfig {
    value: Value,
}

impl LayeredConfig {
    /// Reads and merges the layers. A configured path that does not exist is
    /// skipped; one that exists but fails to parse is an error.
    pub fn load(layering: ConfigLayering) -> Result<Self, LayeredConfigError> {
        let mut value = Value::Object(Map::new());
        for (path, format) in layering.layers() {
            if !path.exists() {
                tracing::debug!(path = %path.display(), %format, "config layer not found");
                continue;
            }
            let layer = read_layer(path, format)?;
            tracing::debug!(path = %path.display(), %format, "merging config layer");
            merge_into(&mut value, layer);
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Deserialises the section found under `path`, or `None` when the
    /// section is missing.
    pub fn section<T>(&self, path: &[&str]) -> Result<Option<T>, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let node = path
            .iter()
            .try_fold(&self.value, |node, key| node.as_object()?.get(*key));
        node.cloned().map(serde_json::from_value).transpose()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayeredConfigError {
    #[error("cannot read config layer {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {format} in config layer {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: LayerFormat,
        message: String,
    },
}

fn read_layer(path: &Path, format: LayerFormat) -> Result<Value, LayeredConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| LayeredConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = match format {
        LayerFormat::Toml => toml::from_str::<toml::Table>(&text)
            .map_err(|err| err.to_string())
            .and_then(|table| serde_json::to_value(table).map_err(|err| err.to_string())),
        LayerFormat::Json => serde_json::from_str::<Value>(&text).map_err(|err| err.to_string()),
    };
    parsed.map_err(|message| LayeredConfigError::Parse {
        path: path.to_path_buf(),
        format,
        message,
    })
}

fn merge_into(target: &mut Value, layer: Value) {
    match (target, layer) {
        (Value::Object(target_map), Value::Object(layer_map)) => {
            for (key, incoming) in layer_map {
                if let Some(slot) = target_map.get_mut(&key) {
                    merge_into(slot, incoming);
                } else {
                    target_map.insert(key, incoming);
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}
