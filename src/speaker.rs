//! I2S speaker output for the badge.
//!
//! The speaker amplifier hangs off I2S0:
//! - BCLK on GPIO9
//! - WS (LRCLK) on GPIO10
//! - DOUT on GPIO47
//! - amplifier enable on GPIO48
//!
//! Playback is split across the two cores. The application core runs the
//! [`AudioEngine`] and blocks in `play`. The second core runs
//! [`Feeder::run`], which owns the DMA ring and refills one half of it
//! from the shared [`Player`] whenever the hardware has room. An
//! [`I2sLink`] carries start/stop requests from the engine to the feeder.

use core::{
    convert::Infallible,
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
};

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    signal::Signal,
};
use esp_hal::{
    Async,
    delay::Delay,
    dma_buffers,
    gpio::{
        Level,
        Output,
        OutputConfig,
    },
    i2s::master::{
        self,
        Channels,
        Config,
        DataFormat,
        I2s,
        I2sTx,
    },
    time::Rate,
};

use crate::{
    AudioEngine,
    Error,
    HALF_WORDS,
    Half,
    I2sOutResources,
    PlaybackConfig,
    Player,
    SpeakerResources,
    TRANSFER_WORDS,
    TransferBuffer,
    Transport,
    TransportConfig,
    config,
};

/// Size of the circular DMA ring in bytes.
pub const RING_BYTES: usize = TRANSFER_WORDS * 4;

/// The engine type [`engine`] builds.
pub type SpeakerEngine = AudioEngine<'static, 'static, I2sTransport, Output<'static>, Delay>;

/// Start/stop requests from the engine's core to the feeder's core.
pub struct I2sLink {
    running: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl I2sLink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for I2sLink {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Transport`] handle used by the engine.
pub struct I2sTransport {
    link: &'static I2sLink,
}

impl I2sTransport {
    #[must_use]
    pub const fn new(link: &'static I2sLink) -> Self {
        Self { link }
    }
}

impl Transport for I2sTransport {
    type Error = Infallible;

    fn start(&mut self) -> Result<(), Infallible> {
        self.link.running.store(true, Ordering::SeqCst);
        self.link.wake.signal(());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        self.link.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Owner of the I2S transmitter and its DMA ring.
///
/// Create it on the core that will run it, so the DMA interrupt is bound
/// there.
pub struct Feeder<'d> {
    tx: I2sTx<'d, Async>,
    ring: &'static mut [u8],
    staging: TransferBuffer,
    link: &'static I2sLink,
}

impl<'d> Feeder<'d> {
    /// Configure I2S0 for `config` and build the transmitter.
    ///
    /// The badge's transmitter is always a left-aligned 16-bit master and
    /// mono output goes out on the left slot. Other roles, widths,
    /// alignments and mono slots in `config` are ignored with a warning.
    ///
    /// The rate handed to esp-hal is [`TransportConfig::sample_rate`];
    /// esp-hal derives its own I2S0 dividers from it, so the rate on the
    /// wire can differ slightly from the divider-table model.
    pub fn new(res: I2sOutResources<'d>, config: &TransportConfig, link: &'static I2sLink) -> Self {
        if config.role != config::Role::Master || config.width != config::SampleWidth::Bits16 {
            warn!("speaker: only 16-bit master output is supported, ignoring {}", config);
        }
        if config.alignment != config::Alignment::Left {
            warn!("speaker: right alignment not supported, sending left-aligned");
        }
        if config.channels == config::Channels::Right {
            warn!("speaker: right-only mono not supported, sending mono on the left slot");
        }

        let base = match config.format {
            config::Format::I2s => Config::new_tdm_philips(),
            config::Format::Aligned => Config::new_tdm_msb(),
        };
        let channels = match config.channels {
            config::Channels::Left | config::Channels::Right => Channels::MONO,
            config::Channels::Stereo => Channels::STEREO,
        };

        let rate = config.sample_rate();
        info!("speaker: I2S0 at {} Hz", rate);

        let (_, _, ring, descriptors) = dma_buffers!(0, RING_BYTES);

        let i2s = I2s::new(
            res.i2s,
            res.dma,
            base.with_sample_rate(Rate::from_hz(rate))
                .with_data_format(DataFormat::Data16Channel16)
                .with_channels(channels),
        )
        .unwrap()
        .into_async();

        let tx = i2s
            .i2s_tx
            .with_bclk(res.bclk)
            .with_ws(res.ws)
            .with_dout(res.dout)
            .build(descriptors);

        Self {
            tx,
            ring,
            staging: TransferBuffer::new(),
            link,
        }
    }

    /// Serve playback sessions forever.
    pub async fn run(mut self, player: &Player<'_>) -> ! {
        loop {
            self.link.wake.wait().await;
            if !self.link.is_running() {
                continue;
            }
            if let Err(e) = self.stream(player).await {
                error!("speaker: I2S transfer failed: {}", e);
            }
        }
    }

    /// Keep the DMA ring topped up until the engine stops the link.
    async fn stream(&mut self, player: &Player<'_>) -> Result<(), master::Error> {
        let Self {
            tx,
            ring,
            staging,
            link,
        } = self;

        let mut transfer = tx.write_dma_circular_async(&mut **ring)?;
        let mut half = Half::First;

        while link.is_running() {
            staging.refill(half, player);

            let mut bytes = staging.bytes(half);
            let mut pending = HALF_WORDS * 4;
            while pending > 0 {
                let written = transfer
                    .push_with(|dst| {
                        let mut n = 0;
                        for (slot, byte) in dst.iter_mut().zip(&mut bytes) {
                            *slot = byte;
                            n += 1;
                        }
                        n
                    })
                    .await?;
                pending = pending.saturating_sub(written);
            }

            half = half.other();
        }

        trace!("speaker: link stopped, releasing DMA");
        Ok(())
    }
}

/// Build the engine for the speaker on `res`.
pub fn engine(
    res: SpeakerResources<'static>,
    player: &'static Player<'static>,
    link: &'static I2sLink,
    config: PlaybackConfig,
) -> Result<SpeakerEngine, Error<Infallible, Infallible>> {
    let amp = Output::new(res.amp, Level::Low, OutputConfig::default());
    AudioEngine::init(player, I2sTransport::new(link), amp, Delay::new(), config)
}
