//! `AudioBackend` built on cpal output, symphonia decoding and rubato resampling.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use log::{debug, error, info, warn};

use super::output_config_selection::{choose_best_stream_config, select_output_device};
use super::render::{quantize_i16, quantize_u16, render_output_buffer, RenderShared, U16_SILENCE};
use super::track_decoder::{run_decode_thread, OpenedTrack, OutputFormat};
use crate::config::OutputConfig;
use crate::error::{AudioError, PlaybackError};
use crate::playback::AudioBackend;
use crate::worker_thread::{join_logged, spawn_named};

const OUTPUT_THREAD_NAME: &str = "audio-output";
const DECODE_THREAD_NAME: &str = "audio-decode";

struct OutputThread {
    format: OutputFormat,
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

struct DecodeThread {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct MixerBackend {
    settings: OutputConfig,
    shared: Arc<RenderShared>,
    output: Mutex<Option<OutputThread>>,
    decoder: Mutex<Option<DecodeThread>>,
    duration_bits: AtomicU64,
    volume: AtomicU8,
}

impl MixerBackend {
    pub fn new(settings: OutputConfig) -> Self {
        Self {
            settings,
            shared: Arc::new(RenderShared::default()),
            output: Mutex::new(None),
            decoder: Mutex::new(None),
            duration_bits: AtomicU64::new(0_f64.to_bits()),
            volume: AtomicU8::new(100),
        }
    }

    fn output_format(&self) -> Option<OutputFormat> {
        lock(&self.output).as_ref().map(|output| output.format)
    }

    fn stop_decoder(&self) {
        if let Some(decoder) = lock(&self.decoder).take() {
            decoder.cancel.store(true, Ordering::SeqCst);
            join_logged(DECODE_THREAD_NAME, decoder.handle);
        }
    }
}

/// Body of the `audio-output` thread. The stream lives and dies on this thread.
fn run_output_thread(
    requested_device_name: Option<String>,
    requested: OutputFormat,
    shared: Arc<RenderShared>,
    ready: Sender<Result<OutputFormat, AudioError>>,
    shutdown: Receiver<()>,
) {
    let stream = match open_output_stream(requested_device_name.as_deref(), requested, shared) {
        Ok((stream, format)) => {
            let _ = ready.send(Ok(format));
            stream
        }
        Err(error) => {
            let _ = ready.send(Err(error));
            return;
        }
    };
    // Blocks until cleanup sends or drops the sender.
    let _ = shutdown.recv();
    if let Err(error) = stream.pause() {
        debug!("MixerBackend: pausing stream on shutdown failed: {}", error);
    }
    drop(stream);
    debug!("MixerBackend: output stream closed");
}

fn open_output_stream(
    requested_device_name: Option<&str>,
    requested: OutputFormat,
    shared: Arc<RenderShared>,
) -> Result<(cpal::Stream, OutputFormat), AudioError> {
    let device = select_output_device(requested_device_name)?;
    let configs = device
        .supported_output_configs()
        .map_err(|error| AudioError::Stream(error.to_string()))?
        .collect::<Vec<_>>();
    let selected = choose_best_stream_config(&configs, requested.sample_rate, requested.channels)
        .ok_or_else(|| AudioError::Stream("no usable output configuration".to_string()))?;
    let sample_format = selected.sample_format();
    let config: cpal::StreamConfig = selected.config();
    let format = OutputFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_output_buffer(output, &shared, |sample| sample.clamp(-1.0, 1.0), 0.0);
            },
            |err| error!("MixerBackend: stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            move |output: &mut [i16], _: &cpal::OutputCallbackInfo| {
                render_output_buffer(output, &shared, quantize_i16, 0);
            },
            |err| error!("MixerBackend: stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::U16 => device.build_output_stream(
            &config,
            move |output: &mut [u16], _: &cpal::OutputCallbackInfo| {
                render_output_buffer(output, &shared, quantize_u16, U16_SILENCE);
            },
            |err| error!("MixerBackend: stream error: {}", err),
            None,
        ),
        other => {
            return Err(AudioError::Stream(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|error| AudioError::Stream(error.to_string()))?;
    stream
        .play()
        .map_err(|error| AudioError::Stream(error.to_string()))?;
    info!(
        "MixerBackend: output open at {} Hz, {} channel(s), {:?}",
        format.sample_rate, format.channels, sample_format
    );
    Ok((stream, format))
}

impl AudioBackend for MixerBackend {
    fn initialize(&self) -> Result<(), PlaybackError> {
        let mut output = lock(&self.output);
        if output.is_some() {
            return Ok(());
        }
        let requested = OutputFormat {
            sample_rate: self.settings.sample_rate_hz,
            channels: self.settings.channel_count,
        };
        let requested_device_name = self.settings.requested_device_name();
        let shared = Arc::clone(&self.shared);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let handle = spawn_named(OUTPUT_THREAD_NAME, move || {
            run_output_thread(requested_device_name, requested, shared, ready_tx, shutdown_rx)
        })
        .map_err(|error| PlaybackError::BackendInit(error.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(format)) => {
                *output = Some(OutputThread {
                    format,
                    shutdown: shutdown_tx,
                    handle,
                });
                drop(output);
                self.shared.set_volume(self.volume.load(Ordering::SeqCst));
                Ok(())
            }
            Ok(Err(error)) => {
                join_logged(OUTPUT_THREAD_NAME, handle);
                Err(PlaybackError::BackendInit(error.to_string()))
            }
            Err(_) => {
                join_logged(OUTPUT_THREAD_NAME, handle);
                Err(PlaybackError::BackendInit(
                    "output thread exited before reporting".to_string(),
                ))
            }
        }
    }

    fn load_and_play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.stop();
        let Some(format) = self.output_format() else {
            return Err(PlaybackError::BackendInit(
                "audio output is not initialized".to_string(),
            ));
        };
        let track = OpenedTrack::open(path).map_err(|error| PlaybackError::Load {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        self.duration_bits
            .store(track.duration_secs().to_bits(), Ordering::SeqCst);

        self.shared.begin_track();
        let cancel = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let thread_cancel = Arc::clone(&cancel);
        let handle = match spawn_named(DECODE_THREAD_NAME, move || {
            run_decode_thread(track, format, shared, thread_cancel)
        }) {
            Ok(handle) => handle,
            Err(error) => {
                self.shared.unload();
                return Err(PlaybackError::Load {
                    path: path.to_path_buf(),
                    reason: error.to_string(),
                });
            }
        };
        *lock(&self.decoder) = Some(DecodeThread { cancel, handle });
        debug!("MixerBackend: playing {}", path.display());
        Ok(())
    }

    fn pause(&self) {
        self.shared.set_paused(true);
    }

    fn resume(&self) {
        if self.shared.is_loaded() {
            self.shared.set_paused(false);
        }
    }

    fn stop(&self) {
        self.stop_decoder();
        self.shared.unload();
        self.duration_bits.store(0_f64.to_bits(), Ordering::SeqCst);
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume.min(100), Ordering::SeqCst);
        self.shared.set_volume(volume);
    }

    fn current_position(&self) -> f64 {
        let Some(format) = self.output_format() else {
            return 0.0;
        };
        let samples_per_second = f64::from(format.sample_rate) * f64::from(format.channels.max(1));
        self.shared.rendered_samples() as f64 / samples_per_second
    }

    fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    fn duration(&self) -> f64 {
        f64::from_bits(self.duration_bits.load(Ordering::SeqCst))
    }

    fn cleanup(&self) {
        self.stop();
        let Some(output) = lock(&self.output).take() else {
            return;
        };
        if output.shutdown.send(()).is_err() {
            warn!("MixerBackend: output thread already gone");
        }
        join_logged(OUTPUT_THREAD_NAME, output.handle);
        info!("MixerBackend: cleaned up");
    }
}

impl Drop for MixerBackend {
    fn drop(&mut self) {
        self.cleanup();
    }
}
