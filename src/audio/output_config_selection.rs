//! Picks the output stream configuration closest to the configured format.

use cpal::traits::{DeviceTrait, HostTrait};
use log::{debug, warn};

use crate::error::AudioError;

const COMMON_SAMPLE_RATES: [u32; 6] = [44_100, 48_000, 88_200, 96_000, 176_400, 192_000];
const MIN_SAMPLE_RATE: u32 = 8_000;

fn score_sample_format(sample_format: cpal::SampleFormat) -> u64 {
    match sample_format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I16 => 20,
        cpal::SampleFormat::U16 => 30,
        // Only the three formats above can be rendered.
        _ => u64::MAX / 4,
    }
}

pub(crate) fn is_renderable(sample_format: cpal::SampleFormat) -> bool {
    matches!(
        sample_format,
        cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
    )
}

fn choose_sample_rate_for_range(
    range: &cpal::SupportedStreamConfigRange,
    requested_sample_rate: u32,
) -> u32 {
    let min_rate = range.min_sample_rate().0;
    let max_rate = range.max_sample_rate().0;
    if (min_rate..=max_rate).contains(&requested_sample_rate) {
        return requested_sample_rate;
    }
    COMMON_SAMPLE_RATES
        .iter()
        .copied()
        .filter(|rate| (min_rate..=max_rate).contains(rate))
        .min_by_key(|rate| rate.abs_diff(requested_sample_rate))
        .unwrap_or_else(|| requested_sample_rate.clamp(min_rate, max_rate))
}

/// Lowest-penalty renderable config; channel mismatches weigh most, then rate, then format.
pub(crate) fn choose_best_stream_config(
    supported_configs: &[cpal::SupportedStreamConfigRange],
    requested_sample_rate: u32,
    requested_channels: u16,
) -> Option<cpal::SupportedStreamConfig> {
    let requested_sample_rate = requested_sample_rate.max(MIN_SAMPLE_RATE);
    let mut best: Option<(u64, cpal::SupportedStreamConfig)> = None;
    for range in supported_configs
        .iter()
        .filter(|range| is_renderable(range.sample_format()))
    {
        let sample_rate = choose_sample_rate_for_range(range, requested_sample_rate);
        let candidate = range.with_sample_rate(cpal::SampleRate(sample_rate));
        let score = u64::from(candidate.channels().abs_diff(requested_channels)) * 1_000_000
            + u64::from(sample_rate.abs_diff(requested_sample_rate))
            + score_sample_format(candidate.sample_format());
        match &best {
            Some((best_score, _)) if *best_score <= score => {}
            _ => best = Some((score, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Requested device by name, falling back to the host default.
pub(crate) fn select_output_device(
    requested_device_name: Option<&str>,
) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    let selected = requested_device_name.and_then(|device_name| {
        host.output_devices().ok().and_then(|mut devices| {
            devices.find(|device| device.name().is_ok_and(|name| name == device_name))
        })
    });
    if let (Some(device_name), None) = (requested_device_name, selected.as_ref()) {
        warn!(
            "MixerBackend: output device '{}' not found, using system default",
            device_name
        );
    }
    let device = selected
        .or_else(|| host.default_output_device())
        .ok_or(AudioError::NoOutputDevice)?;
    debug!(
        "MixerBackend: selected output device '{}'",
        device.name().unwrap_or_else(|_| "Unknown Device".to_string())
    );
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(
        channels: u16,
        min_rate: u32,
        max_rate: u32,
        sample_format: cpal::SampleFormat,
    ) -> cpal::SupportedStreamConfigRange {
        cpal::SupportedStreamConfigRange::new(
            channels,
            cpal::SampleRate(min_rate),
            cpal::SampleRate(max_rate),
            cpal::SupportedBufferSize::Unknown,
            sample_format,
        )
    }

    #[test]
    fn test_requested_rate_used_when_inside_range() {
        let configs = [range(2, 8_000, 192_000, cpal::SampleFormat::F32)];
        let chosen = choose_best_stream_config(&configs, 48_000, 2).expect("config");
        assert_eq!(chosen.sample_rate().0, 48_000);
        assert_eq!(chosen.channels(), 2);
    }

    #[test]
    fn test_nearest_common_rate_used_when_outside_range() {
        let configs = [range(2, 88_200, 96_000, cpal::SampleFormat::F32)];
        let chosen = choose_best_stream_config(&configs, 48_000, 2).expect("config");
        assert_eq!(chosen.sample_rate().0, 88_200);
    }

    #[test]
    fn test_channel_match_beats_sample_format_preference() {
        let configs = [
            range(1, 48_000, 48_000, cpal::SampleFormat::F32),
            range(2, 48_000, 48_000, cpal::SampleFormat::I16),
        ];
        let chosen = choose_best_stream_config(&configs, 48_000, 2).expect("config");
        assert_eq!(chosen.channels(), 2);
        assert_eq!(chosen.sample_format(), cpal::SampleFormat::I16);
    }

    #[test]
    fn test_unrenderable_formats_are_skipped() {
        let configs = [range(2, 48_000, 48_000, cpal::SampleFormat::I32)];
        assert!(choose_best_stream_config(&configs, 48_000, 2).is_none());
        assert!(is_renderable(cpal::SampleFormat::U16));
        assert!(!is_renderable(cpal::SampleFormat::F64));
    }
}
