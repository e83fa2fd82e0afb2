use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::{Result, SceneError};

/// Fully decoded audio, interleaved `f32` samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl AudioBuffer {
    /// Length in seconds
    pub fn duration(&self) -> f32 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.channels as f32 * self.sample_rate as f32)
    }
}

/// Decodes a WAV, OGG Vorbis, MP3 or FLAC file into memory
pub fn load_audio_buffer(path: &Path) -> anyhow::Result<AudioBuffer> {
    let file = File::open(path).context(format!("Failed to open audio file: {:?}", path))?;
    let decoder = Decoder::new(BufReader::new(file)).context(format!("Failed to decode audio: {:?}", path))?;

    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples().collect();
    log::debug!(
        "decoded {:?}: {} channels, {} Hz, {} samples",
        path,
        channels,
        sample_rate,
        samples.len()
    );

    Ok(AudioBuffer {
        channels,
        sample_rate,
        samples: samples.into(),
    })
}

/// Listener created alongside the camera. The output device is opened on
/// first playback and kept alive as long as the listener.
pub struct AudioListener {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    pub master_volume: f32,
}

impl AudioListener {
    pub fn new() -> Self {
        Self {
            stream: None,
            master_volume: 1.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn handle(&mut self) -> Result<&OutputStreamHandle> {
        if self.stream.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|e| SceneError::Audio(format!("Failed to open audio output: {e}")))?;
            log::info!("audio output opened");
            self.stream = Some(opened);
        }
        match &self.stream {
            Some((_, handle)) => Ok(handle),
            None => Err(SceneError::Audio("audio output unavailable".to_string())),
        }
    }
}

impl Default for AudioListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-positional sound source
pub struct Sound {
    buffer: Option<AudioBuffer>,
    pub volume: f32,
    pub looping: bool,
    sink: Option<Sink>,
}

impl Sound {
    pub fn new() -> Self {
        Self {
            buffer: None,
            volume: 1.0,
            looping: false,
            sink: None,
        }
    }

    pub fn set_buffer(&mut self, buffer: AudioBuffer) {
        self.buffer = Some(buffer);
    }

    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty() && !sink.is_paused())
    }

    /// Start playback through `listener`, replacing any running playback
    pub fn play(&mut self, listener: &mut AudioListener) -> Result<()> {
        let buffer = self.buffer.as_ref().ok_or(SceneError::NotReady("audio buffer"))?;
        let volume = self.volume * listener.master_volume;

        let sink = Sink::try_new(listener.handle()?)
            .map_err(|e| SceneError::Audio(format!("Failed to create sink: {e}")))?;
        let source = SamplesBuffer::new(buffer.channels, buffer.sample_rate, buffer.samples.to_vec());
        if self.looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        sink.set_volume(volume);

        if let Some(previous) = self.sink.replace(sink) {
            previous.stop();
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::new()
    }
}
