// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::error::Error;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use wt_nn::io::load_state_dict;
use wt_nn::{CheckpointFormat, Module, WaveletTransform};
use wt_vision::{load_image_batch, save_image, zero_mask, zero_patches};

type DynError = Box<dyn Error>;

type Result<T> = std::result::Result<T, DynError>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Wavelet previews and checkpoint inspection for WT-VAE runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run images through the wavelet transform, mask them and invert the result
    Preview(PreviewArgs),

    /// List the parameters stored in an evaluation checkpoint
    Inspect(InspectArgs),
}

#[derive(Args)]
struct PreviewArgs {
    /// Same-sized PNG images forming the preview batch
    #[arg(long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
    images: Vec<PathBuf>,

    /// Number of wavelet levels
    #[arg(long, default_value_t = 1)]
    levels: usize,

    /// Keep the coarsest detail ring instead of the approximation patch
    #[arg(long)]
    zero_mask: bool,

    /// Directory receiving input.png, wt.png, masked.png and reconstruction.png
    #[arg(long, value_hint = ValueHint::DirPath)]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Bincode,
    Json,
}

impl From<FormatArg> for CheckpointFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Bincode => CheckpointFormat::Bincode,
            FormatArg::Json => CheckpointFormat::Json,
        }
    }
}

#[derive(Args)]
struct InspectArgs {
    /// Checkpoint written by one of the evaluators
    #[arg(long, value_hint = ValueHint::FilePath)]
    checkpoint: PathBuf,

    /// Checkpoint encoding; inferred from the extension when omitted
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

fn main() {
    let guard = match wt_config::init_tracing() {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: {err}");
            None
        }
    };
    let outcome = try_main();
    drop(guard);
    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Preview(args) => run_preview(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn run_preview(args: &PreviewArgs) -> Result<()> {
    if args.levels == 0 {
        return Err(Box::new(io::Error::new(
            ErrorKind::InvalidInput,
            "--levels must be greater than zero",
        )));
    }
    let input = load_image_batch(&args.images)?;
    let transform = WaveletTransform::haar(args.levels)?;
    let coefficients = transform.forward(&input)?;
    let masked = if args.zero_mask {
        zero_mask(&coefficients, args.levels, 1)?
    } else {
        zero_patches(&coefficients, args.levels)?
    };
    let reconstruction = transform.inverse().apply(&masked)?;
    let mse = reconstruction.mean_squared_error(&input)?;

    fs::create_dir_all(&args.output)?;
    save_image(&input, args.output.join("input.png"))?;
    save_image(&coefficients, args.output.join("wt.png"))?;
    save_image(&masked, args.output.join("masked.png"))?;
    save_image(&reconstruction, args.output.join("reconstruction.png"))?;
    tracing::info!(
        images = args.images.len(),
        levels = args.levels,
        output = %args.output.display(),
        "wrote wavelet preview"
    );
    println!("reconstruction mse: {mse:.6}");
    Ok(())
}

fn infer_format(path: &Path) -> CheckpointFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => CheckpointFormat::Json,
        _ => CheckpointFormat::Bincode,
    }
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let format = args
        .format
        .map(CheckpointFormat::from)
        .unwrap_or_else(|| infer_format(&args.checkpoint));
    let state = load_state_dict(&args.checkpoint, format)?;
    let mut total = 0usize;
    for (name, tensor) in &state {
        total += tensor.len();
        println!("{name}\t{:?}", tensor.dims());
    }
    println!("{} parameters, {total} values", state.len());
    Ok(())
}
