//! Transport and playback configuration.
//!
//! The serial audio peripheral derives its frame clock from a fixed source
//! clock through a master-clock divider and an LRCK ratio, both picked from
//! short discrete lists. Most sample rates are therefore only approximated;
//! [`ClockSetup::nearest`] reports how close it got.
//!
//! The divider tables model the reference clock tree the PCM clips were
//! mastered against (32 MHz source, 16 kHz nominal). They fix the rate a
//! clip is meant to play at. A transport with its own clock tree, such as
//! the ESP32-S3 I2S0 binding, takes [`TransportConfig::sample_rate`] as the
//! requested rate and does its own division, so
//! [`SampleRate::actual`] is the model's figure, not a measurement of that
//! hardware.

use crate::error::ClockError;

/// Source clock feeding the master-clock divider.
pub const SOURCE_CLOCK_HZ: u32 = 32_000_000;

/// Sample rate the badge's PCM clips are mastered for.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Master-clock dividers supported by the peripheral, ascending.
pub const MCK_DIVIDERS: [u16; 18] = [
    2, 3, 4, 5, 6, 8, 10, 11, 15, 16, 21, 23, 30, 31, 32, 42, 63, 125,
];

/// MCK/LRCK ratios supported by the peripheral, ascending.
pub const LRCK_RATIOS: [u16; 9] = [32, 48, 64, 96, 128, 192, 256, 384, 512];

/// Bus role of the audio interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// We drive SCK and LRCK.
    #[default]
    Master,
    Slave,
}

/// Frame format on the data line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Format {
    /// Philips I2S, data delayed one SCK after the LRCK edge.
    I2s,
    /// Data aligned with the LRCK edge.
    #[default]
    Aligned,
}

/// Position of the sample within a wider slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Width of one sample on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleWidth {
    Bits8,
    #[default]
    Bits16,
    Bits24,
}

/// Which channels carry data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channels {
    /// Mono on the left channel: consecutive half-words are consecutive samples.
    #[default]
    Left,
    /// Mono on the right channel.
    Right,
    /// Each word carries a left and a right sample.
    Stereo,
}

/// A requested sample rate and what the divider tables deliver for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRate {
    pub requested: u32,
    pub actual: u32,
}

impl SampleRate {
    /// Absolute deviation from the requested rate in Hz.
    #[must_use]
    pub const fn error_hz(&self) -> u32 {
        self.requested.abs_diff(self.actual)
    }
}

/// Master-clock divider and LRCK ratio pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSetup {
    pub divider: u16,
    pub ratio: u16,
}

impl ClockSetup {
    /// 32 MHz / 21 / 96 ≈ 15 873 Hz, the closest the tree gets to 16 kHz.
    pub const DEFAULT: Self = Self {
        divider: 21,
        ratio: 96,
    };

    /// Frame (LRCK) rate produced from `source_hz`.
    #[must_use]
    pub const fn sample_rate(&self, source_hz: u32) -> u32 {
        let div = self.divider as u32 * self.ratio as u32;
        if div == 0 { 0 } else { source_hz / div }
    }

    /// Pick the divider/ratio pair whose rate is closest to `target_hz`.
    ///
    /// Ties go to the smallest divider.
    pub fn nearest(source_hz: u32, target_hz: u32) -> Result<(Self, SampleRate), ClockError> {
        let mut best: Option<(Self, u32)> = None;

        for &divider in &MCK_DIVIDERS {
            for &ratio in &LRCK_RATIOS {
                let setup = Self { divider, ratio };
                let actual = setup.sample_rate(source_hz);
                if actual == 0 {
                    continue;
                }
                let better = match best {
                    Some((_, best_rate)) => {
                        actual.abs_diff(target_hz) < best_rate.abs_diff(target_hz)
                    }
                    None => true,
                };
                if better {
                    best = Some((setup, actual));
                }
            }
        }

        let (setup, actual) = best.ok_or(ClockError::Unreachable {
            source_hz,
            target_hz,
        })?;
        debug!(
            "clock: MCK/{} x{} -> {} Hz (requested {} Hz)",
            setup.divider, setup.ratio, actual, target_hz
        );
        Ok((setup, SampleRate {
            requested: target_hz,
            actual,
        }))
    }
}

impl Default for ClockSetup {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration of the serial audio transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    pub role: Role,
    pub format: Format,
    pub alignment: Alignment,
    pub width: SampleWidth,
    pub channels: Channels,
    pub clock: ClockSetup,
    pub source_clock_hz: u32,
}

impl TransportConfig {
    /// Default layout, clocked as close to `target_hz` as the tree allows.
    pub fn for_sample_rate(target_hz: u32) -> Result<(Self, SampleRate), ClockError> {
        let (clock, rate) = ClockSetup::nearest(SOURCE_CLOCK_HZ, target_hz)?;
        Ok((Self::new().with_clock(clock), rate))
    }

    #[must_use]
    pub const fn new() -> Self {
        Self {
            role: Role::Master,
            format: Format::Aligned,
            alignment: Alignment::Left,
            width: SampleWidth::Bits16,
            channels: Channels::Left,
            clock: ClockSetup::DEFAULT,
            source_clock_hz: SOURCE_CLOCK_HZ,
        }
    }

    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub const fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    #[must_use]
    pub const fn with_width(mut self, width: SampleWidth) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub const fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    #[must_use]
    pub const fn with_clock(mut self, clock: ClockSetup) -> Self {
        self.clock = clock;
        self
    }

    /// Frame rate this configuration produces.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.clock.sample_rate(self.source_clock_hz)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Default stall budget: a 500-word half block lasts ~32 ms at 15.9 kHz.
pub const DEFAULT_STALL_TIMEOUT_US: u32 = 250_000;

/// Default sleep between two looks at the playback state.
pub const DEFAULT_POLL_INTERVAL_US: u32 = 100;

/// How [`AudioEngine::play`](crate::AudioEngine::play) waits for a session to finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackConfig {
    /// Give up if the transport goes this long without a refill request.
    /// `None` spins until the session finishes, however long that takes.
    pub stall_timeout_us: Option<u32>,
    pub poll_interval_us: u32,
}

impl PlaybackConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stall_timeout_us: Some(DEFAULT_STALL_TIMEOUT_US),
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }

    #[must_use]
    pub const fn with_stall_timeout_us(mut self, timeout: Option<u32>) -> Self {
        self.stall_timeout_us = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval_us(mut self, interval: u32) -> Self {
        self.poll_interval_us = interval;
        self
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_khz_resolves_to_mdiv21_ratio96() {
        let (setup, rate) = ClockSetup::nearest(SOURCE_CLOCK_HZ, TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(setup, ClockSetup { divider: 21, ratio: 96 });
        assert_eq!(rate.actual, 15_873);
        assert_eq!(rate.requested, 16_000);
        assert_eq!(rate.error_hz(), 127);
    }

    #[test]
    fn exact_rates_are_hit_exactly() {
        // 32 MHz / 125 / 256 = 1000 Hz
        let (setup, rate) = ClockSetup::nearest(SOURCE_CLOCK_HZ, 1_000).unwrap();
        assert_eq!(rate.actual, 1_000);
        assert_eq!(setup.sample_rate(SOURCE_CLOCK_HZ), 1_000);
    }

    #[test]
    fn dead_source_clock_is_unreachable() {
        assert_eq!(
            ClockSetup::nearest(0, 16_000),
            Err(ClockError::Unreachable {
                source_hz: 0,
                target_hz: 16_000
            })
        );
    }

    #[test]
    fn default_transport_matches_default_clock() {
        let config = TransportConfig::default();
        assert_eq!(config, TransportConfig::new());
        assert_eq!(config.sample_rate(), 15_873);
        assert_eq!(config.channels, Channels::Left);
        assert_eq!(config.width, SampleWidth::Bits16);
    }

    #[test]
    fn for_sample_rate_keeps_layout() {
        let (config, rate) = TransportConfig::for_sample_rate(8_000).unwrap();
        assert_eq!(config.role, Role::Master);
        assert_eq!(config.sample_rate(), rate.actual);
        assert!(rate.error_hz() < 200);
    }

    #[test]
    fn builders_override_fields() {
        let config = TransportConfig::new()
            .with_role(Role::Slave)
            .with_format(Format::I2s)
            .with_alignment(Alignment::Right)
            .with_width(SampleWidth::Bits8)
            .with_channels(Channels::Stereo);
        assert_eq!(config.role, Role::Slave);
        assert_eq!(config.format, Format::I2s);
        assert_eq!(config.alignment, Alignment::Right);
        assert_eq!(config.width, SampleWidth::Bits8);
        assert_eq!(config.channels, Channels::Stereo);
    }

    #[test]
    fn playback_defaults_bound_the_wait() {
        let config = PlaybackConfig::default();
        assert_eq!(config.stall_timeout_us, Some(DEFAULT_STALL_TIMEOUT_US));
        assert_eq!(config.with_stall_timeout_us(None).stall_timeout_us, None);
    }
}
