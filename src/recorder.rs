use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

const TARGET_RATE: u32 = 16000;

/// Start capturing audio from the default input device.
/// Samples are appended to the shared buffer at ~16kHz mono f32.
/// Drop the returned `Stream` to stop recording.
pub fn start_capture(
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), Box<dyn std::error::Error>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or("No microphone found")?;

    log::info!("Input device: {:?}", device.description());

    let supported_configs: Vec<_> = device.supported_input_configs()?.collect();

    let desired = supported_configs.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    let (config, capture_rate, downsample_factor) = if let Some(cfg) = desired {
        (cfg.with_sample_rate(TARGET_RATE).config(), TARGET_RATE, 1usize)
    } else {
        let default_config = device.default_input_config()?;
        let rate = default_config.sample_rate();
        let factor = (rate / TARGET_RATE).max(1) as usize;
        let actual_rate = rate / factor as u32;
        log::info!("Using native rate {rate}Hz, downsampling by {factor}x to ~{actual_rate}Hz");
        (default_config.config(), actual_rate, factor)
    };

    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut buf = buffer.lock().unwrap();
            for (i, frame) in data.chunks(channels).enumerate() {
                if i % downsample_factor == 0 {
                    buf.push(frame.iter().sum::<f32>() / channels as f32);
                }
            }
        },
        |err| log::error!("Input stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, capture_rate))
}

/// Encode one captured utterance as WAV (mono 16-bit PCM).
/// Returns `None` when nothing was recorded.
pub fn encode_utterance(
    samples: &[f32],
    sample_rate: u32,
) -> Result<Option<Vec<u8>>, hound::Error> {
    if samples.is_empty() {
        return Ok(None);
    }
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(Some(cursor.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_capture_encodes_to_nothing() {
        assert!(encode_utterance(&[], 16000).unwrap().is_none());
    }

    #[test]
    fn utterance_is_clamped_pcm16() {
        let wav = encode_utterance(&[0.0, 2.0, -2.0], 16000).unwrap().unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0, i16::MAX, -i16::MAX]);
    }
}
