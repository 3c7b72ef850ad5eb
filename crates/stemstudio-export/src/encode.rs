//! PCM encoders for the final mix.

use crate::error::{ExportError, ExportResult};
use crate::format::{ExportFormat, ExportSettings};
use std::io::Cursor;

/// Encode interleaved stereo f32 samples.
pub fn encode(
    format: ExportFormat,
    samples: &[f32],
    settings: &ExportSettings,
) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Wav => encode_wav(samples, settings.sample_rate, 2),
        ExportFormat::Mp3 => encode_mp3(samples, settings.sample_rate, settings.mp3_bitrate_kbps),
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// 16-bit integer WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> ExportResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut output = Vec::with_capacity(44 + samples.len() * 2);
    let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(to_i16(sample))
            .map_err(|e| ExportError::Encode(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(output)
}

#[cfg(feature = "mp3")]
fn lame_bitrate(kbps: u32) -> mp3lame_encoder::Bitrate {
    use mp3lame_encoder::Bitrate;
    match kbps {
        0..=111 => Bitrate::Kbps96,
        112..=127 => Bitrate::Kbps112,
        128..=159 => Bitrate::Kbps128,
        160..=191 => Bitrate::Kbps160,
        192..=223 => Bitrate::Kbps192,
        224..=255 => Bitrate::Kbps224,
        256..=319 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

/// Constant-bitrate stereo MP3 through LAME.
#[cfg(feature = "mp3")]
pub fn encode_mp3(samples: &[f32], sample_rate: u32, bitrate_kbps: u32) -> ExportResult<Vec<u8>> {
    use mp3lame_encoder::{Builder, DualPcm, FlushNoGap, Quality};

    let lame = |what: &str, e: &dyn std::fmt::Debug| ExportError::Encode(format!("LAME {what} failed: {e:?}"));

    let mut builder =
        Builder::new().ok_or_else(|| ExportError::Encode("LAME encoder init failed".into()))?;
    builder
        .set_num_channels(2)
        .map_err(|e| lame("set channels", &e))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| lame("set sample rate", &e))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| lame("set bitrate", &e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| lame("set quality", &e))?;
    let mut encoder = builder.build().map_err(|e| lame("build", &e))?;

    let (left, right): (Vec<i16>, Vec<i16>) = samples
        .chunks_exact(2)
        .map(|frame| (to_i16(frame[0]), to_i16(frame[1])))
        .unzip();

    let mut output: Vec<u8> =
        Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));
    encoder
        .encode_to_vec(
            DualPcm {
                left: &left,
                right: &right,
            },
            &mut output,
        )
        .map_err(|e| lame("encode", &e))?;

    output.reserve(7200);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut output)
        .map_err(|e| lame("flush", &e))?;

    Ok(output)
}

#[cfg(not(feature = "mp3"))]
pub fn encode_mp3(_samples: &[f32], _sample_rate: u32, _bitrate_kbps: u32) -> ExportResult<Vec<u8>> {
    Err(ExportError::UnsupportedFormat(
        "mp3 (built without the `mp3` feature)".into(),
    ))
}
