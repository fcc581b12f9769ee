//! Playback errors.

use core::fmt::Debug;

/// Errors returned by [`AudioEngine`](crate::AudioEngine).
///
/// `TE` is the transport's error type, `PE` the amplifier pin's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<TE: Debug, PE: Debug> {
    /// The serial transport rejected a configure, start or stop request.
    #[error("audio transport failed: {0:?}")]
    Transport(TE),
    /// Driving the amplifier-enable output failed.
    #[error("amplifier enable pin failed: {0:?}")]
    Amplifier(PE),
    /// `play` was called while another session had not returned to idle.
    #[error("a playback session is already active")]
    SessionAlreadyActive,
    /// The transport stopped asking for data before the session finished.
    #[error("audio transport stalled: no refill request within the timeout")]
    TransportStalled,
    /// The source holds more samples than a session can address.
    #[error("source of {len} bytes exceeds the playable maximum")]
    SourceTooLong { len: usize },
}

/// The clock tree cannot produce any sample rate for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    #[error("no divider/ratio pair reaches {target_hz} Hz from a {source_hz} Hz clock")]
    Unreachable { source_hz: u32, target_hz: u32 },
}
