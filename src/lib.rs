//! # disobey2026audio
//!
//! 8-bit PCM speaker playback for the Disobey 2026 badge.
//!
//! Streams a borrowed buffer of unsigned 8-bit samples out of an I2S
//! transmitter, widening each sample to a left-justified 16-bit word. The
//! transfer buffer is double-buffered: while one half is on the wire the
//! transport's interrupt side refills the other from the clip. After the
//! clip runs out, two blocks of silence are sent so both halves are quiet
//! before the transmitter is stopped and the amplifier switched off. This
//! avoids a click at the end of every clip.
//!
//! The playback core is hardware independent:
//! - [`Player`]: state machine shared with the interrupt side
//! - [`TransferBuffer`]: the two half buffers the interrupt side refills
//! - [`AudioEngine`]: foreground `init` / `play` / `stop`
//! - [`Transport`]: boundary to the serial audio peripheral
//!
//! With the `esp32s3` feature, [`speaker`] binds it to the badge's I2S0
//! peripheral and amplifier enable line.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let peripherals = disobey2026audio::init();
//! let resources = disobey2026audio::split_resources!(peripherals);
//!
//! let player = mk_static!(Player<'static>, Player::new());
//! let link = mk_static!(speaker::I2sLink, speaker::I2sLink::new());
//! // ... spawn `speaker::Feeder::run` on the second core ...
//! let mut engine = speaker::engine(resources.speaker, player, link, PlaybackConfig::default())?;
//! engine.play(CLIP)?;
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod amplifier;
mod buffer;
pub mod config;
mod engine;
mod error;
mod player;
mod state;
mod transport;

#[cfg(feature = "esp32s3")]
pub mod speaker;

pub use amplifier::Amplifier;
pub use buffer::{
    HALF_WORDS,
    Half,
    TRANSFER_WORDS,
    TransferBuffer,
};
pub use config::{
    PlaybackConfig,
    SampleRate,
    TransportConfig,
};
pub use engine::AudioEngine;
pub use error::{
    ClockError,
    Error,
};
pub use player::{
    MAX_SOURCE_LEN,
    Player,
    pack,
    widen,
};
pub use state::PlaybackState;
pub use transport::Transport;

/// Place a value in a `static` exactly once and return a `&'static mut` to it.
#[cfg(feature = "esp32s3")]
#[macro_export]
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

#[cfg(feature = "esp32s3")]
pub use board::*;

#[cfg(feature = "esp32s3")]
mod board {
    use esp_hal::{
        assign_resources,
        clock::{
            Clock,
            CpuClock,
        },
        rom,
    };

    // ── Pin / peripheral assignments ────────────────────────────────────────

    assign_resources! {
        pub Resources<'d> {
            speaker: SpeakerResources<'d> {
                amp: GPIO48,
            },
            i2s_out: I2sOutResources<'d> {
                bclk: GPIO9,
                ws: GPIO10,
                dout: GPIO47,
                i2s: I2S0,
                dma: DMA_CH0,
            },
        }
    }

    // ── Board initialisation ────────────────────────────────────────────────

    /// Minimal CPU clock switcher for ESP32-S3.
    ///
    /// Steps through an intermediate frequency before reaching the target,
    /// which is required by the hardware.
    fn set_cpu_clock(cpu_clock_speed: CpuClock) {
        let _ = esp_hal::peripherals::SYSTEM::regs()
            .sysclk_conf()
            .modify(|_, w| unsafe { w.soc_clk_sel().bits(1) });
        let _ = esp_hal::peripherals::SYSTEM::regs()
            .cpu_per_conf()
            .modify(|_, w| unsafe {
                let _ = w.pll_freq_sel().set_bit();
                w.cpuperiod_sel().bits(match cpu_clock_speed {
                    CpuClock::_80MHz => 0,
                    CpuClock::_160MHz => 1,
                    CpuClock::_240MHz => 2,
                    _ => panic!("Unsupported CPU clock speed"),
                })
            });

        rom::ets_update_cpu_frequency_rom(cpu_clock_speed.frequency().as_mhz());
    }

    /// Initialise the badge hardware and return the raw peripheral set.
    ///
    /// Call this once at the top of your `main`. Then use [`split_resources!`] to
    /// break the peripherals into typed resource groups.
    #[must_use]
    pub fn init() -> esp_hal::peripherals::Peripherals {
        set_cpu_clock(CpuClock::_160MHz);
        let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
        esp_hal::init(config)
    }

    impl From<esp_hal::peripherals::Peripherals> for Resources<'_> {
        fn from(peripherals: esp_hal::peripherals::Peripherals) -> Self {
            split_resources!(peripherals)
        }
    }
}
