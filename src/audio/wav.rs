//! WAV loading for recorded pathogens.

use std::path::{Path, PathBuf};

use hound::SampleFormat;
use thiserror::Error;

use super::RawAudioBuffer;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("Invalid wav at {path}: {source}")]
    Open {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Sample error in {path}: {source}")]
    Sample {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Wav at {path} declares zero channels")]
    NoChannels { path: PathBuf },
}

/// Read a WAV file and mix it down to a mono buffer.
pub fn load_wav(path: &Path) -> Result<RawAudioBuffer, WavError> {
    let mut reader = hound::WavReader::open(path).map_err(|source| WavError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(WavError::NoChannels {
            path: path.to_path_buf(),
        });
    }
    let map_sample = |source| WavError::Sample {
        path: path.to_path_buf(),
        source,
    };
    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sample)?,
        SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sample)?
        }
    };
    Ok(RawAudioBuffer::new(
        mixdown(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

fn mixdown(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_stereo_i16(path: &Path, frames: &[(i16, i16)]) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for (left, right) in frames {
            writer.write_sample(*left).unwrap();
            writer.write_sample(*right).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_int_wav_is_mixed_to_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.wav");
        write_stereo_i16(&path, &[(16_384, 0), (-16_384, -16_384)]);
        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.len(), 2);
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-6);
        assert!((buffer.samples()[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.wav");
        let err = load_wav(&path).unwrap_err();
        assert!(err.to_string().contains("missing.wav"));
    }
}
