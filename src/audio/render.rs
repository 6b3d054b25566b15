//! State shared between the decoder thread and the device callback.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Interleaved samples waiting for the device plus transport flags.
#[derive(Debug)]
pub(crate) struct RenderShared {
    queue: Mutex<VecDeque<f32>>,
    loaded: AtomicBool,
    paused: AtomicBool,
    decoding_finished: AtomicBool,
    rendered_samples: AtomicU64,
    gain_bits: AtomicU32,
}

impl Default for RenderShared {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            loaded: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            decoding_finished: AtomicBool::new(false),
            rendered_samples: AtomicU64::new(0),
            gain_bits: AtomicU32::new(1.0_f32.to_bits()),
        }
    }
}

impl RenderShared {
    pub fn lock_queue(&self) -> MutexGuard<'_, VecDeque<f32>> {
        match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn queued_len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn push_samples(&self, samples: &[f32]) {
        self.lock_queue().extend(samples.iter().copied());
    }

    /// Marks a new track as loaded and resets the rendered counter.
    pub fn begin_track(&self) {
        self.lock_queue().clear();
        self.rendered_samples.store(0, Ordering::SeqCst);
        self.decoding_finished.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.loaded.store(true, Ordering::SeqCst);
    }

    pub fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.lock_queue().clear();
        self.rendered_samples.store(0, Ordering::SeqCst);
    }

    pub fn finish_decoding(&self) {
        self.decoding_finished.store(true, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Loaded, not paused, and still has samples to render or decode.
    pub fn is_playing(&self) -> bool {
        if !self.loaded.load(Ordering::SeqCst) || self.paused.load(Ordering::SeqCst) {
            return false;
        }
        !(self.decoding_finished.load(Ordering::SeqCst) && self.lock_queue().is_empty())
    }

    pub fn rendered_samples(&self) -> u64 {
        self.rendered_samples.load(Ordering::SeqCst)
    }

    /// `volume` is 0..=100, mapped linearly.
    pub fn set_volume(&self, volume: u8) {
        let gain = f32::from(volume.min(100)) / 100.0;
        self.gain_bits.store(gain.to_bits(), Ordering::SeqCst);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::SeqCst))
    }
}

/// Fills `output` from the queue, padding with `silence` when paused, unloaded or starved.
pub(crate) fn render_output_buffer<T, F>(
    output: &mut [T],
    shared: &RenderShared,
    mut convert: F,
    silence: T,
) where
    T: Copy,
    F: FnMut(f32) -> T,
{
    if !shared.loaded.load(Ordering::Relaxed) || shared.paused.load(Ordering::Relaxed) {
        output.fill(silence);
        return;
    }
    let gain = shared.gain();
    let mut queue = shared.lock_queue();
    let available = queue.len().min(output.len());
    for (slot, sample) in output.iter_mut().zip(queue.drain(..available)) {
        *slot = convert(sample * gain);
    }
    drop(queue);
    output[available..].fill(silence);
    shared
        .rendered_samples
        .fetch_add(available as u64, Ordering::Relaxed);
}

pub(crate) fn quantize_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

pub(crate) fn quantize_u16(sample: f32) -> u16 {
    ((sample.clamp(-1.0, 1.0) * 0.5 + 0.5) * u16::MAX as f32)
        .round()
        .clamp(0.0, u16::MAX as f32) as u16
}

pub(crate) const U16_SILENCE: u16 = u16::MAX / 2 + 1;
