// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! In-memory sample loaders feeding the evaluators.
//!
//! The evaluators accept any `IntoIterator` of batches; these adapters cover
//! the common case of a held-out tensor already resident in memory.

use wt_tensor::{PureResult, Tensor, TensorError};

fn split_batches(samples: &Tensor, batch_size: usize) -> PureResult<Vec<Tensor>> {
    let total = samples.batch();
    let per_sample = samples.len() / total;
    let mut batches = Vec::with_capacity(total.div_ceil(batch_size));
    for (index, chunk) in samples.data().chunks(batch_size * per_sample).enumerate() {
        let mut dims = samples.dims().to_vec();
        dims[0] = batch_size.min(total - index * batch_size);
        batches.push(Tensor::from_vec(dims, chunk.to_vec())?);
    }
    Ok(batches)
}

/// Splits a sample tensor along its leading axis into fixed-size batches.
/// The final batch may be smaller.
#[derive(Clone, Debug)]
pub struct SampleLoader {
    batches: Vec<Tensor>,
}

impl SampleLoader {
    pub fn new(samples: Tensor, batch_size: usize) -> PureResult<Self> {
        if batch_size == 0 {
            return Err(TensorError::InvalidValue {
                label: "sample_loader_batch_size",
            });
        }
        Ok(Self {
            batches: split_batches(&samples, batch_size)?,
        })
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Yields owned copies of each batch.
    pub fn iter(&self) -> std::iter::Cloned<std::slice::Iter<'_, Tensor>> {
        self.batches.iter().cloned()
    }
}

impl<'a> IntoIterator for &'a SampleLoader {
    type Item = Tensor;
    type IntoIter = std::iter::Cloned<std::slice::Iter<'a, Tensor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Yields aligned batches from two sample tensors with the same leading axis,
/// e.g. a low-resolution input and its full-resolution target.
#[derive(Clone, Debug)]
pub struct PairedSampleLoader {
    first: SampleLoader,
    second: SampleLoader,
}

impl PairedSampleLoader {
    pub fn new(first: Tensor, second: Tensor, batch_size: usize) -> PureResult<Self> {
        if first.batch() != second.batch() {
            return Err(TensorError::ShapeMismatch {
                left: first.dims().to_vec(),
                right: second.dims().to_vec(),
            });
        }
        Ok(Self {
            first: SampleLoader::new(first, batch_size)?,
            second: SampleLoader::new(second, batch_size)?,
        })
    }

    pub fn num_batches(&self) -> usize {
        self.first.num_batches()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tensor, Tensor)> + '_ {
        self.first.iter().zip(self.second.iter())
    }
}

impl<'a> IntoIterator for &'a PairedSampleLoader {
    type Item = (Tensor, Tensor);
    type IntoIter = std::iter::Zip<
        std::iter::Cloned<std::slice::Iter<'a, Tensor>>,
        std::iter::Cloned<std::slice::Iter<'a, Tensor>>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.first.iter().zip(self.second.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Tensor {
        Tensor::from_vec(vec![n, 1, 2, 2], (0..n * 4).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let loader = SampleLoader::new(samples(5), 2).unwrap();
        let batches: Vec<Tensor> = loader.iter().collect();
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(
            batches.iter().map(|b| b.batch()).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
        assert_eq!(batches[2].data(), &[16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn paired_loader_keeps_batches_aligned() {
        let loader = PairedSampleLoader::new(samples(3), samples(3).scale(2.0), 2).unwrap();
        for (first, second) in &loader {
            assert_eq!(first.scale(2.0), second);
        }
        assert!(PairedSampleLoader::new(samples(3), samples(4), 2).is_err());
        assert!(SampleLoader::new(samples(1), 0).is_err());
    }
}
