//! Double-buffered transfer memory.

use crate::player::Player;

/// Words in the transfer buffer, both halves together.
pub const TRANSFER_WORDS: usize = 1000;

/// Words refilled per interrupt.
pub const HALF_WORDS: usize = TRANSFER_WORDS / 2;

/// One half of the [`TransferBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    First,
    Second,
}

impl Half {
    /// The half the hardware moves to next.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    const fn range(self) -> core::ops::Range<usize> {
        match self {
            Self::First => 0..HALF_WORDS,
            Self::Second => HALF_WORDS..TRANSFER_WORDS,
        }
    }
}

/// Transfer memory handed to the serial transport.
///
/// While the hardware shifts out one half, the interrupt side refills the
/// other through [`refill`](Self::refill). It starts out silent and is
/// reused for every session.
pub struct TransferBuffer {
    words: [u32; TRANSFER_WORDS],
}

impl TransferBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [0; TRANSFER_WORDS],
        }
    }

    /// Let `player` serve `half` and return it.
    ///
    /// An idle or finished player leaves the half as it was, which after a
    /// completed session is silence.
    pub fn refill(&mut self, half: Half, player: &Player<'_>) -> &[u32] {
        let block = &mut self.words[half.range()];
        player.fill(block);
        block
    }

    #[must_use]
    pub fn half(&self, half: Half) -> &[u32] {
        &self.words[half.range()]
    }

    /// Little-endian bytes of `half`, as a byte-oriented DMA ring expects.
    pub fn bytes(&self, half: Half) -> impl Iterator<Item = u8> + '_ {
        self.half(half).iter().flat_map(|word| word.to_le_bytes())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new()
    }
}
