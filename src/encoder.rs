//! Encoder: byte stream → f32 audio samples (inverse of the decoder's wire
//! format).

use crate::protocol::*;

/// Append one 20-sample symbol: the sum of one sine per set bit of `word`,
/// scaled by `amplitude` and clamped to [-1, 1].
fn emit_symbol(out: &mut Vec<f32>, word: u16, amplitude: f32) {
    for t in 0..SAMPLE_COUNT {
        let mut sample = 0.0f32;
        for bit in 0..BIT_COUNT {
            if word & (1 << bit) == 0 {
                continue;
            }
            let turns = (bit_frequency(bit) * t) as f32 / SAMPLE_COUNT as f32;
            sample += (turns * std::f32::consts::TAU).sin();
        }
        out.push((sample * amplitude).clamp(-1.0, 1.0));
    }
}

/// Encode a payload into audio samples carrying the nine-tone wire format:
/// two silence symbols, eight full-amplitude sync symbols, the `'>'` start
/// marker, the payload bytes, and two silence symbols to terminate.
///
/// `amplitude` scales the marker and data symbols, 0 < amplitude <= 1
/// ([`DATA_AMPLITUDE`] is the reference value). The sync preamble is always
/// emitted at full amplitude; data symbols sum up to nine sines, which is
/// why their amplitude must stay low enough to limit clipping.
///
/// A payload byte of zero is carried as a sync-flagged word and is therefore
/// distinct from the all-zero terminator, but round-trip behavior is only
/// guaranteed for payloads without embedded zero bytes.
pub fn encode(payload: &[u8], amplitude: f32) -> Result<Vec<f32>, crate::Error> {
    if !(amplitude > 0.0 && amplitude <= 1.0) {
        return Err(crate::Error::InvalidAmplitude(amplitude));
    }

    let symbols = LEAD_SILENCE_SYMBOLS
        + SYNC_PREAMBLE_SYMBOLS
        + 1
        + payload.len()
        + TAIL_SILENCE_SYMBOLS;
    let mut out = Vec::with_capacity(symbols * SAMPLE_COUNT);

    for _ in 0..LEAD_SILENCE_SYMBOLS {
        emit_symbol(&mut out, 0, SYNC_AMPLITUDE);
    }
    for _ in 0..SYNC_PREAMBLE_SYMBOLS {
        emit_symbol(&mut out, SYNC_FLAG, SYNC_AMPLITUDE);
    }
    emit_symbol(&mut out, START_BYTE as u16 | SYNC_FLAG, amplitude);
    for &byte in payload {
        emit_symbol(&mut out, byte as u16 | SYNC_FLAG, amplitude);
    }
    for _ in 0..TAIL_SILENCE_SYMBOLS {
        emit_symbol(&mut out, 0, SYNC_AMPLITUDE);
    }

    Ok(out)
}
