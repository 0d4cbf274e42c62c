//! WAV read/write helpers for stem files
//!
//! Stem output is always 16-bit stereo WAV. Reading handles the int and
//! float sample formats hound supports; mono inputs are duplicated to both
//! channels so the model layer always sees stereo.

use std::path::Path;

use crate::error::{Result, StemprepError};
use crate::types::StereoBuffer;

/// Read an audio file into a stereo buffer.
///
/// Only WAV input is handled here; other formats are expected to be decoded
/// by the caller's model layer before reaching this point.
pub fn read_stereo_wav(path: &Path) -> Result<StereoBuffer> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| StemprepError::decode_error(path, e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| StemprepError::decode_error(path, e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| StemprepError::decode_error(path, e.to_string()))?,
    };

    match spec.channels {
        1 => Ok(StereoBuffer::new(
            interleaved.clone(),
            interleaved,
            spec.sample_rate,
        )),
        2 => {
            let frames = interleaved.len() / 2;
            let mut left = Vec::with_capacity(frames);
            let mut right = Vec::with_capacity(frames);
            for frame in interleaved.chunks_exact(2) {
                left.push(frame[0]);
                right.push(frame[1]);
            }
            Ok(StereoBuffer::new(left, right, spec.sample_rate))
        }
        n => Err(StemprepError::decode_error(
            path,
            format!("expected mono or stereo, got {} channels", n),
        )),
    }
}

/// Write stereo audio to a 16-bit WAV file
pub fn write_stereo_wav(path: &Path, audio: &StereoBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| StemprepError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to create WAV file: {}", e),
    })?;

    for (l, r) in audio.left.iter().zip(audio.right.iter()) {
        let l_i16 = (*l * 32767.0).clamp(-32768.0, 32767.0) as i16;
        let r_i16 = (*r * 32767.0).clamp(-32768.0, 32767.0) as i16;

        for sample in [l_i16, r_i16] {
            writer.write_sample(sample).map_err(|e| StemprepError::OutputError {
                path: path.to_path_buf(),
                reason: format!("Failed to write sample: {}", e),
            })?;
        }
    }

    writer.finalize().map_err(|e| StemprepError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to finalize WAV: {}", e),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wav_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tone.wav");

        let n = 4410;
        let left: Vec<f32> = (0..n).map(|i| (i as f32 / 100.0).sin() * 0.5).collect();
        let right = left.clone();
        let original = StereoBuffer::new(left, right, 44100);

        write_stereo_wav(&path, &original).expect("write");
        let loaded = read_stereo_wav(&path).expect("read");

        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.sample_rate, 44100);
        for (a, b) in loaded.left.iter().zip(original.left.iter()) {
            assert!((a - b).abs() < 1.0 / 16384.0, "lossy beyond 16-bit tolerance");
        }
    }

    #[test]
    fn test_read_rejects_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"not a wav file").expect("write bytes");

        let err = read_stereo_wav(&path).unwrap_err();
        assert!(matches!(err, StemprepError::DecodeError { .. }));
    }
}
