//! jfifenc CLI - baseline JPEG encoder for PPM input.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use jfifenc_rs::{DctKernel, JpegEncoder, SubsamplingMode};

/// Baseline sequential DCT JPEG (JFIF) encoder
#[derive(Parser)]
#[command(name = "jfifenc")]
#[command(author = "jfifenc-rs contributors")]
#[command(version)]
#[command(about = "Encode PPM images into baseline JFIF/JPEG", long_about = None)]
#[command(after_help = "EXAMPLES:
    jfifenc encode photo.ppm photo.jpg
    jfifenc encode photo.ppm photo.jpg --sub 420 --quality 90
    jfifenc encode scan.ppm scan.jpg --dct matrix --threads 0

SUBSAMPLING MODES:
    444    full chroma resolution (default)
    422    halve chroma horizontally
    411    quarter chroma horizontally
    420    halve chroma in both directions
    420m   like 420, averaging each 2x2 neighborhood
    420lm  like 420, averaging vertical pairs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a PPM image (P3 or P6) to a JPEG file
    #[command(visible_alias = "e")]
    Encode {
        /// Input PPM file
        input: PathBuf,

        /// Output JPEG file (overwritten if present)
        output: PathBuf,

        /// Chroma subsampling mode
        #[arg(long = "sub", default_value = "444", value_enum)]
        subsampling: SubsamplingArg,

        /// DCT kernel
        #[arg(long, default_value = "arai", value_enum)]
        dct: DctArg,

        /// Quality 1-100 (50 keeps the standard tables unscaled)
        #[arg(short, long, default_value = "85")]
        quality: u32,

        /// DCT worker threads (0 = one per core)
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Encode the luma channel only (single-component JPEG)
        #[arg(long)]
        gray: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SubsamplingArg {
    #[value(name = "444")]
    S444,
    #[value(name = "422")]
    S422,
    #[value(name = "411")]
    S411,
    #[value(name = "420")]
    S420,
    #[value(name = "420m")]
    S420M,
    #[value(name = "420lm")]
    S420Lm,
}

impl From<SubsamplingArg> for SubsamplingMode {
    fn from(arg: SubsamplingArg) -> Self {
        match arg {
            SubsamplingArg::S444 => Self::S444,
            SubsamplingArg::S422 => Self::S422,
            SubsamplingArg::S411 => Self::S411,
            SubsamplingArg::S420 => Self::S420,
            SubsamplingArg::S420M => Self::S420M,
            SubsamplingArg::S420Lm => Self::S420Lm,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DctArg {
    Direct,
    Matrix,
    Arai,
}

impl From<DctArg> for DctKernel {
    fn from(arg: DctArg) -> Self {
        match arg {
            DctArg::Direct => Self::Direct,
            DctArg::Matrix => Self::Matrix,
            DctArg::Arai => Self::Arai,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            subsampling,
            dct,
            quality,
            threads,
            gray,
        } => {
            let encoder = JpegEncoder {
                subsampling: subsampling.into(),
                kernel: dct.into(),
                quality,
                workers: resolve_threads(threads),
                grayscale: gray,
            };
            if let Err(e) = encoder.encode_file(&input, &output) {
                eprintln!("error: {e}");
                // never leave a partial output behind
                let _ = std::fs::remove_file(&output);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    }
}
