// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::BTreeMap;
use wt_tensor::{PureResult, Tensor, TensorError};

/// Named state dictionary keyed by canonical parameter names.
pub type StateDict = BTreeMap<String, Tensor>;

/// Named tensor owned by a module.
pub struct Parameter {
    name: String,
    value: Tensor,
}

impl core::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Parameter(name={},dims={:?})", self.name, self.value.dims())
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    /// Replaces the stored value. The replacement must keep the parameter's shape.
    pub fn load_value(&mut self, value: &Tensor) -> PureResult<()> {
        if value.dims() != self.value.dims() {
            return Err(TensorError::ShapeMismatch {
                left: self.value.dims().to_vec(),
                right: value.dims().to_vec(),
            });
        }
        self.value = value.clone();
        Ok(())
    }
}

/// `nn.Module` style surface shared by every model the evaluators drive.
pub trait Module {
    /// Runs a forward pass.
    fn forward(&self, input: &Tensor) -> PureResult<Tensor>;

    /// Visits immutable parameters.
    fn visit_parameters(
        &self,
        visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
    ) -> PureResult<()>;

    /// Visits mutable parameters.
    fn visit_parameters_mut(
        &mut self,
        visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
    ) -> PureResult<()>;

    /// Toggles training-only behaviour such as dropout or batch statistics.
    /// Stateless modules ignore it.
    fn set_training(&mut self, _training: bool) {}

    fn is_training(&self) -> bool {
        false
    }

    /// Switches the module to inference mode.
    fn eval(&mut self) {
        self.set_training(false);
    }

    /// Captures a copy of every parameter tensor keyed by its canonical name.
    fn state_dict(&self) -> PureResult<StateDict> {
        let mut state = StateDict::new();
        self.visit_parameters(&mut |param| {
            state.insert(param.name().to_string(), param.value().clone());
            Ok(())
        })?;
        Ok(state)
    }

    /// Restores parameters from a state dictionary produced by [`Module::state_dict`].
    fn load_state_dict(&mut self, state: &StateDict) -> PureResult<()> {
        self.visit_parameters_mut(&mut |param| {
            let Some(value) = state.get(param.name()) else {
                return Err(TensorError::MissingParameter {
                    name: param.name().to_string(),
                });
            };
            param.load_value(value)
        })
    }
}
