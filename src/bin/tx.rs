//! Encode tool: byte stream → audio.
//!
//! Reads bytes from a file (or stdin), encodes them as nine-tone symbols and
//! writes a mono 32-bit PCM WAV, or raw little-endian i32 PCM on stdout with
//! `--raw`.

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ninetone::protocol::{DATA_AMPLITUDE, WAV_BITS_PER_SAMPLE, WAV_SAMPLE_RATE};

#[derive(Parser)]
#[command(name = "ninetone-tx")]
#[command(about = "Encode a byte stream as nine-tone audio")]
#[command(version)]
struct Cli {
    /// Input file with the bytes to send; stdin if omitted.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output WAV file; required unless --raw streams to stdout.
    #[arg(value_name = "OUTPUT.WAV")]
    output: Option<PathBuf>,

    /// Write raw little-endian i32 PCM to stdout instead of a WAV file.
    #[arg(long)]
    raw: bool,

    /// Amplitude of data symbols, in (0, 1].
    #[arg(short, long, default_value_t = DATA_AMPLITUDE)]
    amplitude: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ninetone=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let payload = match &cli.input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    info!(bytes = payload.len(), "encoding");

    let samples = ninetone::encode(&payload, cli.amplitude)?;
    info!(samples = samples.len(), "synthesized");

    if cli.raw {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for &s in &samples {
            let pcm = (s * i32::MAX as f32) as i32;
            out.write_all(&pcm.to_le_bytes())?;
        }
        out.flush()?;
        return Ok(());
    }

    let output = cli
        .output
        .ok_or("no output file given (or pass --raw for stdout PCM)")?;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: WAV_SAMPLE_RATE,
        bits_per_sample: WAV_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&output, spec)?;
    for &s in &samples {
        writer.write_sample((s * i32::MAX as f32) as i32)?;
    }
    writer.finalize()?;
    info!(path = %output.display(), "wrote WAV");

    Ok(())
}
