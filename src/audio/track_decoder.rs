//! Decodes one file into the render queue, converted to the output format.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};
use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::render::RenderShared;
use crate::error::AudioError;

const RESAMPLER_CHUNK_FRAMES: usize = 1024;
const RESAMPLER_SUB_CHUNKS: usize = 2;
const QUEUE_AHEAD_SECS: usize = 2;
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A probed file with its decoder, ready to run on the decode thread.
pub(crate) struct OpenedTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    duration_secs: f64,
}

impl OpenedTrack {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(|error| AudioError::Unsupported(error.to_string()))?;
        let media_source = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                media_source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|error| AudioError::Unsupported(error.to_string()))?;
        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| AudioError::Unsupported("no default audio track".to_string()))?;
        let codec_params = track.codec_params.clone();
        let track_id = track.id;
        let sample_rate = codec_params.sample_rate.unwrap_or(44_100).max(1);
        let channels = codec_params
            .channels
            .map(|channels| channels.count() as u16)
            .unwrap_or(2)
            .max(1);
        let duration_secs = codec_params
            .n_frames
            .map(|frames| frames as f64 / f64::from(sample_rate))
            .unwrap_or(0.0);
        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|error| AudioError::Unsupported(error.to_string()))?;
        debug!(
            "TrackDecoder: opened {} (sr={} channels={} duration={:.1}s)",
            path.display(),
            sample_rate,
            channels,
            duration_secs
        );
        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration_secs,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Decodes until end of stream or until `cancel` is set.
    pub fn decode_into(mut self, output: OutputFormat, shared: &RenderShared, cancel: &AtomicBool) {
        let mut converter = match FormatConverter::new(self.sample_rate, self.channels, output) {
            Ok(converter) => converter,
            Err(error) => {
                warn!("TrackDecoder: {}", error);
                shared.finish_decoding();
                return;
            }
        };
        let queue_limit =
            output.sample_rate as usize * usize::from(output.channels) * QUEUE_AHEAD_SECS;

        while !cancel.load(Ordering::SeqCst) {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(error))
                    if error.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(error) => {
                    debug!("TrackDecoder: stopping at read error: {}", error);
                    break;
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(error)) => {
                    trace!("TrackDecoder: skipping corrupt packet: {}", error);
                    continue;
                }
                Err(error) => {
                    warn!("TrackDecoder: {}", error);
                    break;
                }
            };
            let spec = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            let converted = converter.push(buffer.samples());
            if !wait_for_room(shared, queue_limit, cancel) {
                return;
            }
            shared.push_samples(&converted);
        }

        if !cancel.load(Ordering::SeqCst) {
            shared.push_samples(&converter.flush());
        }
        shared.finish_decoding();
        debug!("TrackDecoder: finished");
    }
}

fn wait_for_room(shared: &RenderShared, queue_limit: usize, cancel: &AtomicBool) -> bool {
    while shared.queued_len() >= queue_limit {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(QUEUE_FULL_BACKOFF);
    }
    !cancel.load(Ordering::SeqCst)
}

/// Maps interleaved frames from `from` channels to `to` channels.
///
/// Mono is duplicated, extra source channels are averaged into `index % to`.
pub(crate) fn remix_interleaved(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let frames = samples.len() / from;
    let mut remixed = Vec::with_capacity(frames * to);
    let mut frame_out = vec![0.0_f32; to];
    let mut counts = vec![0_u32; to];
    for frame in samples.chunks_exact(from) {
        if from == 1 {
            remixed.extend(std::iter::repeat(frame[0]).take(to));
            continue;
        }
        frame_out.iter_mut().for_each(|value| *value = 0.0);
        counts.iter_mut().for_each(|count| *count = 0);
        for (index, sample) in frame.iter().enumerate() {
            frame_out[index % to] += *sample;
            counts[index % to] += 1;
        }
        for (index, value) in frame_out.iter().enumerate() {
            let sample = if counts[index] == 0 {
                // More output than source channels: repeat source channels.
                frame[index % from]
            } else {
                *value / counts[index] as f32
            };
            remixed.push(sample);
        }
    }
    remixed
}

/// Channel remix followed by optional rubato resampling.
pub(crate) struct FormatConverter {
    source_channels: usize,
    output_channels: usize,
    resampler: Option<FftFixedIn<f32>>,
    pending: Vec<Vec<f32>>,
}

impl FormatConverter {
    pub fn new(
        source_sample_rate: u32,
        source_channels: u16,
        output: OutputFormat,
    ) -> Result<Self, AudioError> {
        let output_channels = usize::from(output.channels.max(1));
        let resampler = if source_sample_rate == output.sample_rate {
            None
        } else {
            debug!(
                "TrackDecoder: resampling {} Hz -> {} Hz",
                source_sample_rate, output.sample_rate
            );
            Some(
                FftFixedIn::<f32>::new(
                    source_sample_rate as usize,
                    output.sample_rate as usize,
                    RESAMPLER_CHUNK_FRAMES,
                    RESAMPLER_SUB_CHUNKS,
                    output_channels,
                )
                .map_err(|error| AudioError::Resample(error.to_string()))?,
            )
        };
        Ok(Self {
            source_channels: usize::from(source_channels.max(1)),
            output_channels,
            resampler,
            pending: vec![Vec::new(); output_channels],
        })
    }

    /// Converts one decoded packet. May hold frames back until a full resampler chunk is ready.
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        let remixed = remix_interleaved(samples, self.source_channels, self.output_channels);
        if self.resampler.is_none() {
            return remixed;
        }
        for frame in remixed.chunks_exact(self.output_channels) {
            for (channel, sample) in frame.iter().enumerate() {
                self.pending[channel].push(*sample);
            }
        }
        self.drain_full_chunks()
    }

    /// Resamples whatever is still pending.
    pub fn flush(&mut self) -> Vec<f32> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Vec::new();
        };
        if self.pending.iter().all(Vec::is_empty) {
            return Vec::new();
        }
        let result = resampler.process_partial(Some(self.pending.as_slice()), None);
        self.pending.iter_mut().for_each(Vec::clear);
        match result {
            Ok(planar) => interleave(&planar),
            Err(error) => {
                warn!("TrackDecoder: resampler flush failed: {}", error);
                Vec::new()
            }
        }
    }

    fn drain_full_chunks(&mut self) -> Vec<f32> {
        let mut output = Vec::new();
        let Some(resampler) = self.resampler.as_mut() else {
            return output;
        };
        loop {
            let needed = resampler.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            match resampler.process(chunk.as_slice(), None) {
                Ok(planar) => output.extend(interleave(&planar)),
                Err(error) => {
                    warn!("TrackDecoder: resampler failed: {}", error);
                    break;
                }
            }
        }
        output
    }
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut interleaved = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for channel in planar {
            interleaved.push(channel.get(frame).copied().unwrap_or(0.0));
        }
    }
    interleaved
}

/// Spawned body of the `audio-decode` thread.
pub(crate) fn run_decode_thread(
    track: OpenedTrack,
    output: OutputFormat,
    shared: Arc<RenderShared>,
    cancel: Arc<AtomicBool>,
) {
    track.decode_into(output, &shared, &cancel);
}
