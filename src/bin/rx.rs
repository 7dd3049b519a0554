//! Decode tool: audio → byte stream.
//!
//! Reads a WAV file (16/32-bit int or 32-bit float, mono) or raw
//! little-endian i32 PCM from stdin with `--raw`, feeds the decoder one
//! sample at a time and writes decoded bytes to stdout as they arrive.
//! Exits on the stream's terminator or on input EOF, whichever comes first.

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ninetone::{Decoder, Output};

#[derive(Parser)]
#[command(name = "ninetone-rx")]
#[command(about = "Decode nine-tone audio back into bytes")]
#[command(version)]
struct Cli {
    /// Input WAV file; required unless --raw streams from stdin.
    #[arg(value_name = "INPUT.WAV")]
    input: Option<PathBuf>,

    /// Output file for the decoded bytes; stdout if omitted.
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Read raw little-endian i32 PCM from stdin instead of a WAV file.
    #[arg(long)]
    raw: bool,
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

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };

    let decoded = if cli.raw {
        decode_raw_stdin(&mut sink)?
    } else {
        let input = cli
            .input
            .ok_or("no input file given (or pass --raw for stdin PCM)")?;
        decode_wav(&input, &mut sink)?
    };
    sink.flush()?;
    info!(bytes = decoded, "done");

    Ok(())
}

/// Stream raw i32 LE PCM from stdin through the decoder, sample at a time.
fn decode_raw_stdin(sink: &mut dyn Write) -> Result<usize, Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut decoder = Decoder::new();
    let mut frame = [0u8; 4];
    let mut decoded = 0usize;

    loop {
        if let Err(e) = input.read_exact(&mut frame) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                warn!("input ended before stream terminator");
                return Ok(decoded);
            }
            return Err(e.into());
        }
        let sample = i32::from_le_bytes(frame) as f32 / i32::MAX as f32;
        match decoder.decode_f32(sample) {
            Output::Pending => {}
            Output::Byte(b) => {
                sink.write_all(&[b])?;
                decoded += 1;
            }
            Output::Eof => return Ok(decoded),
        }
    }
}

/// Decode a whole WAV file. Stereo input is averaged down to mono.
fn decode_wav(
    path: &PathBuf,
    sink: &mut dyn Write,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    info!(
        rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "reading WAV"
    );

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => {
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        (_, bits) => return Err(format!("unsupported WAV bit depth: {bits}").into()),
    };

    let mono: Vec<f32> = if spec.channels == 2 {
        samples.chunks_exact(2).map(|c| (c[0] + c[1]) / 2.0).collect()
    } else {
        samples
    };

    let mut decoder = Decoder::new();
    let mut decoded = 0usize;
    for &s in &mono {
        match decoder.decode_f32(s) {
            Output::Pending => {}
            Output::Byte(b) => {
                sink.write_all(&[b])?;
                decoded += 1;
            }
            Output::Eof => return Ok(decoded),
        }
    }
    warn!("input ended before stream terminator");
    Ok(decoded)
}
