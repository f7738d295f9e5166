//! Audio buffers handed to STT strategies

use std::io::Cursor;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::{Error, Result};

/// Sinc filter length used for resampling
const SINC_LEN: usize = 256;

/// Mono 16-bit PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioData {
    #[must_use]
    pub const fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode WAV bytes, mixing multi-channel audio down to mono
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a readable WAV file
    #[allow(clippy::cast_precision_loss)]
    pub fn from_wav(bytes: &[u8]) -> Result<Self> {
        let mut reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Audio(e.to_string()))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Audio(e.to_string()))?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| to_i16(frame.iter().sum::<f32>() / frame.len() as f32))
            .collect();

        Ok(Self::new(samples, spec.sample_rate))
    }

    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encode as a 16-bit mono WAV file at the original rate
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn wav_data(&self) -> Result<Vec<u8>> {
        encode_wav(&self.samples, self.sample_rate)
    }

    /// Encode as WAV after resampling to `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if resampling or WAV encoding fails
    pub fn wav_data_at(&self, sample_rate: u32) -> Result<Vec<u8>> {
        let resampled = self.resample(sample_rate)?;
        resampled.wav_data()
    }

    /// Resample to `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if the rate is zero or the resampler fails
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn resample(&self, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 || self.sample_rate == 0 {
            return Err(Error::Audio("sample rate must be non-zero".to_string()));
        }
        if sample_rate == self.sample_rate || self.samples.is_empty() {
            return Ok(Self::new(self.samples.clone(), sample_rate));
        }

        let ratio = f64::from(sample_rate) / f64::from(self.sample_rate);
        let expected = (self.samples.len() as f64 * ratio).round() as usize;

        // Zero padding flushes the filter so the tail is not cut off
        let mut input: Vec<f32> = self
            .samples
            .iter()
            .map(|&s| f32::from(s) / 32768.0)
            .collect();
        input.resize(input.len() + SINC_LEN, 0.0);

        let params = SincInterpolationParameters {
            sinc_len: SINC_LEN,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };
        let chunk_size = input.len();
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1)
            .map_err(|e| Error::Audio(e.to_string()))?;
        let delay = resampler.output_delay();

        let waves_in = vec![input];
        let output = resampler
            .process(&waves_in, None)
            .map_err(|e| Error::Audio(e.to_string()))?;

        let samples = output
            .first()
            .map(|channel| {
                channel
                    .iter()
                    .skip(delay)
                    .take(expected)
                    .map(|&s| to_i16(s))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self::new(samples, sample_rate))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    if sample_rate == 0 {
        return Err(Error::Audio("cannot encode audio with a zero sample rate".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
