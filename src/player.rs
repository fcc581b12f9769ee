//! The playback state machine and its refill callback.
//!
//! [`Player`] is shared between the foreground, which arms and resets
//! sessions, and the transport's interrupt side, which calls
//! [`Player::fill`] once per half buffer. The state cell is the only value
//! both sides write; the source view and cursor are written by the
//! foreground only while idle and by the interrupt side only while playing.
//! Every arm or reset starts a new session generation, and the interrupt
//! side only commits work done for the generation it started with.
//!
//! Each 32-bit transfer word carries two 16-bit half-words. Every 8-bit
//! source sample is widened by placing it in the high byte of its
//! half-word:
//!
//! ```text
//! source:  [ b0 ][ b1 ]
//! word:    bits 31..24 = b1   bits 23..16 = 0   bits 15..8 = b0   bits 7..0 = 0
//! ```

use core::{
    cell::Cell,
    sync::atomic::{
        AtomicU32,
        Ordering,
    },
};

use critical_section::Mutex;

use crate::state::{
    PlaybackState,
    StateCell,
};

/// Longest source a session accepts, in bytes.
pub const MAX_SOURCE_LEN: usize = u16::MAX as usize;

/// Widen one 8-bit sample into a left-justified 16-bit half-word.
#[must_use]
pub const fn widen(sample: u8) -> u16 {
    (sample as u16) << 8
}

/// Pack two samples into one transfer word, `first` in the low half-word.
#[must_use]
pub const fn pack(first: u8, second: u8) -> u32 {
    widen(first) as u32 | (widen(second) as u32) << 16
}

#[derive(Clone, Copy)]
struct Session<'d> {
    source: &'d [u8],
    cursor: usize,
    generation: u32,
}

impl<'d> Session<'d> {
    const EMPTY: Self = Self {
        source: &[],
        cursor: 0,
        generation: 0,
    };

    /// A fresh session that supersedes `self`.
    const fn succeed(&self, source: &'d [u8]) -> Self {
        Self {
            source,
            cursor: 0,
            generation: self.generation.wrapping_add(1),
        }
    }

    const fn is_exhausted(&self) -> bool {
        self.cursor >= self.source.len()
    }

    /// Next transfer word, zero once the source is used up.
    ///
    /// An odd trailing byte is paired with a zero partner.
    fn next_word(&mut self) -> u32 {
        let Some(&first) = self.source.get(self.cursor) else {
            return 0;
        };
        let second = self.source.get(self.cursor + 1).copied().unwrap_or(0);
        self.cursor = (self.cursor + 2).min(self.source.len());
        pack(first, second)
    }
}

/// Playback state machine shared with the transport's interrupt side.
///
/// `'d` bounds every source buffer played through this player, so a
/// buffer can never be dropped or mutated while a session may still read
/// it. Place it in a `static` (see the board's `mk_static!`) when
/// the interrupt side needs `'static` access.
pub struct Player<'d> {
    state: StateCell,
    session: Mutex<Cell<Session<'d>>>,
    refills: AtomicU32,
}

impl<'d> Player<'d> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: StateCell::new(),
            session: Mutex::new(Cell::new(Session::EMPTY)),
            refills: AtomicU32::new(0),
        }
    }

    /// Current session state.
    pub fn state(&self) -> PlaybackState {
        self.state.load()
    }

    /// Bytes consumed from the current source. Diagnostic only.
    pub fn cursor(&self) -> usize {
        critical_section::with(|cs| self.session.borrow(cs).get().cursor)
    }

    /// Refill requests seen since creation, wrapping.
    ///
    /// Counts every call to [`fill`](Self::fill), including ignored ones,
    /// so it doubles as a transport heartbeat.
    pub fn refills(&self) -> u32 {
        self.refills.load(Ordering::SeqCst)
    }

    /// Serve one block of transfer words.
    ///
    /// Called from the transport's interrupt side once per half buffer.
    /// Never blocks and never fails. At most one state transition happens
    /// per call:
    ///
    /// * `Idle`, `Finished`: the block is left untouched.
    /// * `Playing` with samples left: the block is filled from the source,
    ///   zero-padded if the source runs out part way.
    /// * `Playing` with the source used up: the block is zeroed and the
    ///   session moves to `Finishing`.
    /// * `Finishing`: the block is zeroed and the session moves to
    ///   `Finished`.
    pub fn fill(&self, block: &mut [u32]) {
        self.refills.fetch_add(1, Ordering::SeqCst);

        match self.state.load() {
            PlaybackState::Idle | PlaybackState::Finished => {}
            PlaybackState::Playing => {
                let mut session = critical_section::with(|cs| self.session.borrow(cs).get());
                if session.is_exhausted() {
                    block.fill(0);
                    let finishing = self.commit(session.generation, |_| {
                        self.state.advance(PlaybackState::Playing)
                    });
                    if finishing {
                        debug!("playback: source drained, finishing");
                    }
                    return;
                }

                for word in block.iter_mut() {
                    *word = session.next_word();
                }
                let kept = self.commit(session.generation, |cell| {
                    cell.set(session);
                    true
                });
                if kept {
                    trace!("playback: served {} words, cursor {}", block.len(), session.cursor);
                } else {
                    debug!("playback: session replaced while serving, block dropped");
                }
            }
            PlaybackState::Finishing => {
                block.fill(0);
                if self.state.advance(PlaybackState::Finishing) {
                    debug!("playback: silence drained, finished");
                }
            }
        }
    }

    /// Start a session over `source`.
    ///
    /// Returns `false` without touching anything unless the player is idle.
    pub(crate) fn arm(&self, source: &'d [u8]) -> bool {
        critical_section::with(|cs| {
            if self.state.load() != PlaybackState::Idle {
                return false;
            }
            let cell = self.session.borrow(cs);
            cell.set(cell.get().succeed(source));
            self.state.store(PlaybackState::Playing);
            true
        })
    }

    /// Drop the session and return to idle.
    pub(crate) fn reset(&self) {
        critical_section::with(|cs| {
            self.state.store(PlaybackState::Idle);
            let cell = self.session.borrow(cs);
            cell.set(cell.get().succeed(&[]));
        });
    }

    /// Run `apply` if the session is still `generation` and still playing.
    ///
    /// Returns `false` without running it once an arm or reset has
    /// replaced the session.
    fn commit(&self, generation: u32, apply: impl FnOnce(&Cell<Session<'d>>) -> bool) -> bool {
        critical_section::with(|cs| {
            let cell = self.session.borrow(cs);
            if cell.get().generation != generation
                || self.state.load() != PlaybackState::Playing
            {
                return false;
            }
            apply(cell)
        })
    }
}

impl Default for Player<'_> {
    fn default() -> Self {
        Self::new()
    }
}
