// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wt_nn::io::load_state_dict;
use wt_nn::{
    wt, CheckpointFormat, IwtPosterior, IwtVae, Module, PairVae, Parameter, Posterior,
    WaveletFilters, WaveletTransform,
};
use wt_tensor::{PureResult, Tensor, TensorError};
use wt_vision::{
    eval_ae_mask, eval_ae_mask_channels, eval_iwtvae, eval_wtvae_pair, save_image, zero_mask,
    EvalArgs, EvalDirs, NullWriter, PairedSampleLoader, SampleLoader, ScalarWriter,
};

fn images(n: usize, side: usize, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Tensor::random_normal(vec![n, 3, side, side], 0.5, 0.1, &mut rng).unwrap();
    let data = noise.data().iter().map(|v| v.clamp(0.0, 1.0)).collect();
    Tensor::from_vec(vec![n, 3, side, side], data).unwrap()
}

fn png_dims(path: &Path) -> (u32, u32) {
    image::open(path).unwrap().to_rgb8().dimensions()
}

macro_rules! single_weight_module {
    ($ty:ident) => {
        impl Module for $ty {
            fn forward(&self, input: &Tensor) -> PureResult<Tensor> {
                Ok(input.scale(self.weight.value().data()[0]))
            }

            fn visit_parameters(
                &self,
                visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
            ) -> PureResult<()> {
                visitor(&self.weight)
            }

            fn visit_parameters_mut(
                &mut self,
                visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
            ) -> PureResult<()> {
                visitor(&mut self.weight)
            }

            fn set_training(&mut self, training: bool) {
                self.training = training;
            }

            fn is_training(&self) -> bool {
                self.training
            }
        }
    };
}

/// Decodes each latent row into a constant `(3, out, out)` patch.
struct ConstantPairVae {
    weight: Parameter,
    filters: WaveletFilters,
    z_dim: usize,
    out: usize,
    training: bool,
}

impl ConstantPairVae {
    fn new(z_dim: usize, out: usize) -> Self {
        Self {
            weight: Parameter::new(
                "decoder::weight",
                Tensor::from_vec(vec![1], vec![1.0]).unwrap(),
            ),
            filters: WaveletFilters::haar(),
            z_dim,
            out,
            training: true,
        }
    }
}

single_weight_module!(ConstantPairVae);

impl PairVae for ConstantPairVae {
    fn filters(&self) -> &WaveletFilters {
        &self.filters
    }

    fn encode(&self, input: &Tensor) -> PureResult<Posterior> {
        let n = input.batch();
        let per_sample = input.len() / n;
        let mut data = Vec::with_capacity(n * self.z_dim);
        for sample in input.data().chunks_exact(per_sample) {
            let mean = sample.iter().sum::<f32>() / per_sample as f32;
            data.extend(std::iter::repeat(mean).take(self.z_dim));
        }
        let z = Tensor::from_vec(vec![n, self.z_dim], data)?;
        Ok(Posterior {
            mu: z.clone(),
            logvar: Tensor::zeros(vec![n, self.z_dim])?,
            z,
        })
    }

    fn decode(&self, z: &Tensor) -> PureResult<Tensor> {
        let n = z.batch();
        let plane = 3 * self.out * self.out;
        let mut data = Vec::with_capacity(n * plane);
        for row in z.data().chunks_exact(self.z_dim) {
            let value = 0.5 + 0.4 * row[0].tanh() * self.weight.value().data()[0];
            data.extend(std::iter::repeat(value).take(plane));
        }
        Tensor::from_vec(vec![n, 3, self.out, self.out], data)
    }
}

/// Returns its masked input unchanged, whatever the latent.
struct PassthroughIwtVae {
    weight: Parameter,
    z_dim: usize,
    training: bool,
}

impl PassthroughIwtVae {
    fn new(z_dim: usize) -> Self {
        Self {
            weight: Parameter::new("iwt::weight", Tensor::from_vec(vec![1], vec![1.0]).unwrap()),
            z_dim,
            training: true,
        }
    }
}

single_weight_module!(PassthroughIwtVae);

impl IwtVae for PassthroughIwtVae {
    type Skip = Vec<usize>;

    fn encode(&self, residual: &Tensor) -> PureResult<IwtPosterior<Self::Skip>> {
        let n = residual.batch();
        Ok(IwtPosterior {
            mu: Tensor::zeros(vec![n, self.z_dim])?,
            var: Tensor::from_vec(vec![n, self.z_dim], vec![1.0; n * self.z_dim])?,
            skip: residual.dims().to_vec(),
        })
    }

    fn decode(&self, y: &Tensor, z: &Tensor, skip: &Self::Skip) -> PureResult<Tensor> {
        if z.dims() != [y.batch(), self.z_dim] || skip.as_slice() != y.dims() {
            return Err(TensorError::ShapeMismatch {
                left: y.dims().to_vec(),
                right: z.dims().to_vec(),
            });
        }
        self.forward(y)
    }
}

struct IdentityAe {
    weight: Parameter,
    training: bool,
}

impl IdentityAe {
    fn new() -> Self {
        Self {
            weight: Parameter::new("ae::weight", Tensor::from_vec(vec![1], vec![1.0]).unwrap()),
            training: true,
        }
    }
}

single_weight_module!(IdentityAe);

#[derive(Default)]
struct RecordingWriter {
    records: Vec<(String, f32, usize)>,
    flushed: bool,
}

impl ScalarWriter for RecordingWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> PureResult<()> {
        self.records.push((tag.to_string(), value, step));
        Ok(())
    }

    fn flush(&mut self) -> PureResult<()> {
        self.flushed = true;
        Ok(())
    }
}

struct FailingWriter;

impl ScalarWriter for FailingWriter {
    fn add_scalar(&mut self, _tag: &str, _value: f32, _step: usize) -> PureResult<()> {
        Err(TensorError::IoError {
            message: "disk full".into(),
        })
    }
}

/// PNG bytes `save_image` produces for `batch`.
fn rendered(batch: &Tensor, dir: &Path, name: &str) -> Vec<u8> {
    let path = dir.join(name);
    save_image(batch, &path).unwrap();
    fs::read(path).unwrap()
}

fn args(num_wt: usize, num_iwt: usize) -> EvalArgs {
    EvalArgs {
        z_dim: 4,
        num_wt,
        num_iwt,
        seed: Some(7),
        ..EvalArgs::default()
    }
}

#[test]
fn pair_evaluator_writes_padded_reconstructions_and_checkpoint() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let mut model = ConstantPairVae::new(4, 4);
    let loader = PairedSampleLoader::new(images(3, 8, 1), images(3, 16, 2), 2).unwrap();

    let report = eval_wtvae_pair(5, &mut model, &loader, &args(2, 2), &dirs).unwrap();

    assert!(!model.is_training());
    assert_eq!(report.epoch, 5);
    assert_eq!(report.batches, 2);
    let names: Vec<_> = report
        .images
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["recon_y_padded5.png", "recon_y5.png", "sample_y5.png", "target5.png"]
    );
    // The last batch holds a single sample, so its grids are unpadded.
    assert_eq!(png_dims(report.image("recon_y_padded5.png").unwrap()), (16, 16));
    assert_eq!(png_dims(report.image("target5.png").unwrap()), (4, 4));

    assert_eq!(report.checkpoint, dir.path().join("models/wtvae_epoch5.bin"));
    let state = load_state_dict(&report.checkpoint, CheckpointFormat::Bincode).unwrap();
    assert_eq!(state, model.state_dict().unwrap());
}

#[test]
fn pair_evaluator_targets_the_top_left_coefficients() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let mut model = ConstantPairVae::new(4, 4);
    let x1 = images(1, 16, 2);
    let batch = vec![(images(1, 8, 1), x1.clone())];

    let report = eval_wtvae_pair(0, &mut model, batch, &args(2, 2), &dirs).unwrap();

    let expected = wt(&x1, &WaveletFilters::haar(), 2)
        .unwrap()
        .crop_spatial(4, 4)
        .unwrap();
    assert_eq!(
        fs::read(report.image("target0.png").unwrap()).unwrap(),
        rendered(&expected, dir.path(), "expected_target.png")
    );

    let padded = image::open(report.image("recon_y_padded0.png").unwrap())
        .unwrap()
        .to_rgb8();
    assert_eq!(padded.dimensions(), (16, 16));
    for (x, y, pixel) in padded.enumerate_pixels() {
        let inside = x < 4 && y < 4;
        assert_eq!(pixel.0 != [0, 0, 0], inside, "pixel ({x}, {y})");
    }
}

#[test]
fn pair_evaluator_samples_are_reproducible_with_a_seed() {
    let run = |root: &Path| {
        let dirs = EvalDirs::new(root.join("img"), root.join("models"));
        let mut model = ConstantPairVae::new(4, 4);
        let loader = PairedSampleLoader::new(images(2, 8, 1), images(2, 16, 2), 2).unwrap();
        let report = eval_wtvae_pair(0, &mut model, &loader, &args(2, 2), &dirs).unwrap();
        fs::read(report.image("sample_y0.png").unwrap()).unwrap()
    };
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    assert_eq!(run(first.path()), run(second.path()));
}

#[test]
fn iwt_evaluator_reports_scalars_and_saves_only_the_iwt_model() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(2).unwrap();
    let inverse = wt_model.inverse();
    let mut iwt_model = PassthroughIwtVae::new(4);
    let loader = SampleLoader::new(images(4, 8, 3), 2).unwrap();
    let mut writer = RecordingWriter::default();
    let eval_args = EvalArgs {
        zero: false,
        checkpoint_format: CheckpointFormat::Json,
        ..args(2, 2)
    };

    let report = eval_iwtvae(
        3,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| inverse.apply(t),
        &loader,
        &eval_args,
        &dirs,
        &mut writer,
    )
    .unwrap();

    assert!(!iwt_model.is_training());
    assert_eq!(report.batches, 2);
    assert_eq!(report.images.len(), 7);
    for name in [
        "sample_y_before_zero3.png",
        "sample_encoder_input3.png",
        "sample_recon3.png",
        "sample_recon_wt3.png",
        "sample_z3.png",
        "sample_y3.png",
        "sample3.png",
    ] {
        assert!(report.image(name).unwrap().exists(), "{name} missing");
    }

    // Without zeroing the decoder sees the full coefficients, so the inverse
    // transform recovers the input.
    assert!(writer.flushed);
    assert_eq!(writer.records.len(), 2);
    assert_eq!(writer.records[0].0, "eval/recon_mse");
    assert_eq!(writer.records[1].0, "eval/recon_wt_mse");
    assert!(writer.records.iter().all(|(_, value, step)| *value < 1e-10 && *step == 3));

    assert_eq!(report.checkpoint, dir.path().join("models/iwtvae_epoch3.json"));
    let state = load_state_dict(&report.checkpoint, CheckpointFormat::Json).unwrap();
    assert!(state.contains_key("iwt::weight"));
}

#[test]
fn iwt_evaluator_keeps_only_the_approximation_patch() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(2).unwrap();
    let inverse = wt_model.inverse();
    let mut iwt_model = PassthroughIwtVae::new(4);
    let loader = SampleLoader::new(images(2, 8, 4), 2).unwrap();
    let mut writer = RecordingWriter::default();

    eval_iwtvae(
        0,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| inverse.apply(t),
        &loader,
        &args(2, 2),
        &dirs,
        &mut writer,
    )
    .unwrap();

    // Only the approximation patch reaches the decoder, so the detail bands
    // are lost in both domains.
    let recon_mse = writer.records[0].1;
    let recon_wt_mse = writer.records[1].1;
    assert!(recon_mse > 1e-3, "recon_mse = {recon_mse}");
    assert!(recon_wt_mse > 1e-3, "recon_wt_mse = {recon_wt_mse}");
}

#[test]
fn iwt_evaluator_checkpoints_before_reporting_scalars() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(1).unwrap();
    let inverse = wt_model.inverse();
    let mut iwt_model = PassthroughIwtVae::new(4);
    let loader = SampleLoader::new(images(2, 8, 8), 2).unwrap();

    let err = eval_iwtvae(
        4,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| inverse.apply(t),
        &loader,
        &args(1, 1),
        &dirs,
        FailingWriter,
    )
    .unwrap_err();

    assert_eq!(
        err,
        TensorError::IoError {
            message: "disk full".into()
        }
    );
    assert!(dir.path().join("img/sample4.png").exists());
    assert!(dir.path().join("models/iwtvae_epoch4.bin").exists());
}

#[test]
fn iwt_evaluator_skips_metrics_with_mismatched_shapes() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(1).unwrap();
    let mut iwt_model = PassthroughIwtVae::new(4);
    let loader = SampleLoader::new(images(2, 8, 9), 2).unwrap();
    let mut writer = RecordingWriter::default();

    let report = eval_iwtvae(
        1,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| t.crop_spatial(4, 4),
        &loader,
        &args(1, 1),
        &dirs,
        &mut writer,
    )
    .unwrap();

    assert_eq!(report.batches, 1);
    assert_eq!(report.images.len(), 7);
    assert!(report.checkpoint.exists());
    let tags: Vec<_> = writer.records.iter().map(|(tag, _, _)| tag.as_str()).collect();
    assert_eq!(tags, vec!["eval/recon_wt_mse"]);
    assert!(writer.flushed);
}

#[test]
fn empty_loader_still_checkpoints() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(1).unwrap();
    let mut model = IdentityAe::new();

    let report = eval_ae_mask(9, &wt_model, &mut model, Vec::<Tensor>::new(), &args(1, 1), &dirs)
        .unwrap();

    assert_eq!(report.batches, 0);
    assert!(report.images.is_empty());
    assert!(report.checkpoint.exists());
    assert!(!dir.path().join("img").exists());

    let mut iwt_model = PassthroughIwtVae::new(4);
    let mut writer = RecordingWriter::default();
    let report = eval_iwtvae(
        9,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| Ok(t.clone()),
        Vec::<Tensor>::new(),
        &args(1, 1),
        &dirs,
        &mut writer,
    )
    .unwrap();
    assert!(report.checkpoint.exists());
    assert!(writer.records.is_empty());
}

#[test]
fn mask_evaluator_feeds_the_coarsest_detail_ring() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(2).unwrap();
    let mut model = IdentityAe::new();
    let loader = SampleLoader::new(images(2, 8, 5), 2).unwrap();

    let report = eval_ae_mask(1, &wt_model, &mut model, &loader, &args(2, 2), &dirs).unwrap();

    assert!(!model.is_training());
    assert_eq!(report.batches, 1);
    // Two 8x8 tiles side by side with 2px padding.
    assert_eq!(png_dims(report.image("sample_recon1.png").unwrap()), (22, 12));
    assert_eq!(
        fs::read(report.image("sample_recon1.png").unwrap()).unwrap(),
        fs::read(report.image("sample1.png").unwrap()).unwrap()
    );
    assert_eq!(report.checkpoint, dir.path().join("models/aemask_epoch1.bin"));
}

#[test]
fn channel_mask_evaluator_restores_image_layout() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(2).unwrap();
    let mut model = IdentityAe::new();
    let loader = SampleLoader::new(images(2, 8, 6), 2).unwrap();

    let report =
        eval_ae_mask_channels(2, &wt_model, &mut model, &loader, &args(2, 2), &dirs).unwrap();

    // Two-level collation works on the 4x4 window, so tiles come back 4x4.
    assert_eq!(png_dims(report.image("sample2.png").unwrap()), (14, 8));
    assert_eq!(png_dims(report.image("sample_recon2.png").unwrap()), (14, 8));
    let sample = fs::read(report.image("sample2.png").unwrap()).unwrap();
    assert_eq!(
        fs::read(report.image("sample_recon2.png").unwrap()).unwrap(),
        sample
    );
    // Scattering the channel groups back lands each band in its own quadrant.
    let masked = zero_mask(&wt_model.forward(&images(2, 8, 6)).unwrap(), 2, 1)
        .unwrap()
        .crop_spatial(4, 4)
        .unwrap();
    assert_eq!(sample, rendered(&masked, dir.path(), "expected_sample.png"));

    let wt_model = WaveletTransform::haar(1).unwrap();
    let report =
        eval_ae_mask_channels(3, &wt_model, &mut model, &loader, &args(1, 1), &dirs).unwrap();
    assert_eq!(png_dims(report.image("sample3.png").unwrap()), (22, 12));
}

#[test]
fn channel_mask_evaluator_rejects_deep_decompositions() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let wt_model = WaveletTransform::haar(3).unwrap();
    let mut model = IdentityAe::new();
    let loader = SampleLoader::new(images(1, 8, 7), 1).unwrap();

    let err = eval_ae_mask_channels(0, &wt_model, &mut model, &loader, &args(3, 3), &dirs)
        .unwrap_err();
    assert_eq!(err, TensorError::InvalidValue { label: "num_wt" });
    assert!(!dir.path().join("models").exists());
}

#[test]
fn invalid_args_are_rejected_before_any_output() {
    let dir = tempdir().unwrap();
    let dirs = EvalDirs::new(dir.path().join("img"), dir.path().join("models"));
    let mut model = ConstantPairVae::new(4, 4);
    let bad = EvalArgs {
        z_dim: 0,
        ..args(2, 2)
    };
    let loader = PairedSampleLoader::new(images(1, 8, 1), images(1, 16, 2), 1).unwrap();
    assert!(eval_wtvae_pair(0, &mut model, &loader, &bad, &dirs).is_err());
    assert!(!dir.path().join("models").exists());

    let wt_model = WaveletTransform::haar(1).unwrap();
    let mut iwt_model = PassthroughIwtVae::new(4);
    assert!(eval_iwtvae(
        0,
        &wt_model,
        &mut iwt_model,
        |t: &Tensor| Ok(t.clone()),
        Vec::<Tensor>::new(),
        &bad,
        &dirs,
        NullWriter,
    )
    .is_err());
}
