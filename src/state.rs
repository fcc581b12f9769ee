//! Playback state shared between the foreground and the refill interrupt.

use core::sync::atomic::{
    AtomicU8,
    Ordering,
};

/// Where the current playback session is.
///
/// Within one session the state only moves forward:
/// `Idle → Playing → Finishing → Finished`, after which the foreground
/// resets it to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackState {
    /// No session. Refill requests are ignored.
    Idle = 0,
    /// Source samples are being served.
    Playing = 1,
    /// Source exhausted, first silent block served.
    Finishing = 2,
    /// Second silent block served, both transfer halves are silent.
    Finished = 3,
}

impl PlaybackState {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Self::Playing,
            2 => Self::Finishing,
            3 => Self::Finished,
            _ => Self::Idle,
        }
    }

    /// The state a session moves to next, `None` once it is finished.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Playing),
            Self::Playing => Some(Self::Finishing),
            Self::Finishing => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

/// Atomic cell holding a [`PlaybackState`].
///
/// All accesses are `SeqCst`: the foreground polls this in a tight loop
/// while the interrupt side writes it.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(PlaybackState::Idle as u8))
    }

    pub(crate) fn load(&self) -> PlaybackState {
        PlaybackState::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: PlaybackState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Move from `from` to its successor.
    ///
    /// Fails without writing if the cell no longer holds `from`, e.g. when
    /// the foreground reset the session in between.
    pub(crate) fn advance(&self, from: PlaybackState) -> bool {
        let Some(to) = from.next() else {
            return false;
        };
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
