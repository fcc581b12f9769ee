//! Foreground side of playback.

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
};

use crate::{
    amplifier::Amplifier,
    config::PlaybackConfig,
    error::Error,
    player::{
        MAX_SOURCE_LEN,
        Player,
    },
    state::PlaybackState,
    transport::Transport,
};

/// Result type of the engine's operations.
pub type Result<T, Tr, P> =
    core::result::Result<T, Error<<Tr as Transport>::Error, <P as embedded_hal::digital::ErrorType>::Error>>;

/// Plays 8-bit PCM buffers through a serial audio transport.
///
/// One engine per physical peripheral: create it once with
/// [`init`](Self::init) and reuse it for every clip. `play` blocks until
/// the clip and its silence tail are out; the transport's interrupt side
/// meanwhile feeds the shared [`Player`].
pub struct AudioEngine<'p, 'd, T, P, D> {
    player: &'p Player<'d>,
    transport: T,
    amplifier: Amplifier<P>,
    delay: D,
    config: PlaybackConfig,
}

impl<'p, 'd, T, P, D> AudioEngine<'p, 'd, T, P, D>
where
    T: Transport,
    P: OutputPin,
    D: DelayNs,
{
    /// Take over the collaborators and quiesce them.
    ///
    /// The amplifier is switched off, the transport stopped and the player
    /// reset to idle, so never init while another engine plays through the
    /// same player. A failure here leaves the hardware in an unknown state
    /// and should be treated as fatal.
    pub fn init(
        player: &'p Player<'d>,
        mut transport: T,
        amplifier_pin: P,
        delay: D,
        config: PlaybackConfig,
    ) -> Result<Self, T, P> {
        let amplifier = Amplifier::new(amplifier_pin).map_err(Error::Amplifier)?;
        transport.stop().map_err(Error::Transport)?;
        player.reset();
        info!("audio: engine ready");

        Ok(Self {
            player,
            transport,
            amplifier,
            delay,
            config,
        })
    }

    /// Switch the amplifier on.
    pub fn enable(&mut self) -> Result<(), T, P> {
        self.amplifier.enable().map_err(Error::Amplifier)
    }

    /// Switch the amplifier off.
    pub fn disable(&mut self) -> Result<(), T, P> {
        self.amplifier.disable().map_err(Error::Amplifier)
    }

    /// Play `data` and wait until it has been sent.
    ///
    /// Each byte is one unsigned 8-bit sample. Returns once every sample
    /// plus two blocks of silence have been handed to the transport and
    /// the engine has stopped again. An empty `data` returns at once
    /// without touching the hardware.
    ///
    /// # Errors
    ///
    /// * [`Error::SourceTooLong`] for more than [`MAX_SOURCE_LEN`] bytes.
    /// * [`Error::SessionAlreadyActive`] if the shared player is not idle.
    /// * [`Error::TransportStalled`] if the transport stops asking for data;
    ///   the engine is stopped before returning.
    pub fn play(&mut self, data: &'d [u8]) -> Result<(), T, P> {
        if data.is_empty() {
            trace!("audio: empty clip ignored");
            return Ok(());
        }
        if data.len() > MAX_SOURCE_LEN {
            return Err(Error::SourceTooLong { len: data.len() });
        }
        if !self.player.arm(data) {
            warn!("audio: play while {} rejected", self.player.state());
            return Err(Error::SessionAlreadyActive);
        }

        info!("audio: playing {} bytes", data.len());

        let outcome = self.run_session();
        let stopped = self.stop();
        outcome.and(stopped)
    }

    /// Halt the transport, switch the amplifier off and return to idle.
    ///
    /// Safe to call at any time, including when already idle.
    pub fn stop(&mut self) -> Result<(), T, P> {
        let halted = self.transport.stop().map_err(Error::Transport);
        let disabled = self.disable();
        self.player.reset();
        halted.and(disabled)
    }

    /// State of the shared player.
    pub fn state(&self) -> PlaybackState {
        self.player.state()
    }

    /// Bytes of the current clip consumed so far.
    pub fn cursor(&self) -> usize {
        self.player.cursor()
    }

    pub const fn is_enabled(&self) -> bool {
        self.amplifier.is_enabled()
    }

    pub const fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Give the transport and amplifier pin back.
    pub fn release(self) -> (T, P) {
        (self.transport, self.amplifier.release())
    }

    fn run_session(&mut self) -> Result<(), T, P> {
        self.enable()?;
        self.transport.start().map_err(Error::Transport)?;
        self.wait_finished()
    }

    fn wait_finished(&mut self) -> Result<(), T, P> {
        let Some(budget) = self.config.stall_timeout_us else {
            while !self.session_over() {
                core::hint::spin_loop();
            }
            return Ok(());
        };

        let interval = self.config.poll_interval_us.max(1);
        let mut heartbeat = self.player.refills();
        let mut quiet_us: u32 = 0;

        while !self.session_over() {
            self.delay.delay_us(interval);

            let seen = self.player.refills();
            if seen != heartbeat {
                heartbeat = seen;
                quiet_us = 0;
                continue;
            }

            quiet_us = quiet_us.saturating_add(interval);
            if quiet_us >= budget {
                warn!(
                    "audio: transport stalled in {} at byte {}",
                    self.player.state(),
                    self.player.cursor()
                );
                return Err(Error::TransportStalled);
            }
        }
        Ok(())
    }

    fn session_over(&self) -> bool {
        matches!(
            self.player.state(),
            PlaybackState::Finished | PlaybackState::Idle
        )
    }
}
