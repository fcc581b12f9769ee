//! Plays a short synthesized chime through the speaker every two seconds.
//!
//! The I2S feeder runs on the second core; the first core blocks in
//! `play` until the chime and its silence tail are out.

#![no_std]
#![no_main]

use defmt::{
    error,
    info,
};
#[allow(clippy::wildcard_imports)]
use disobey2026audio::*;
use embassy_executor::Spawner;
use embassy_time::{
    Duration,
    Timer,
};
use esp_backtrace as _;
use esp_hal::{
    interrupt::software::SoftwareInterruptControl,
    timer::timg::TimerGroup,
};
use esp_println as _;

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

/// ~0.4 s at 15.9 kHz.
const CHIME_LEN: usize = 6_000;

/// Samples per triangle period, ~880 Hz at 15.9 kHz.
const PERIOD: usize = 18;

/// Unsigned 8-bit triangle wave with a linear fade-out, centred on 128.
fn synthesize(clip: &mut [u8]) {
    let len = clip.len();
    let half = PERIOD as i32 / 2;
    for (i, sample) in clip.iter_mut().enumerate() {
        let phase = (i % PERIOD) as i32;
        let triangle = if phase < half {
            phase * 4 - 18
        } else {
            (PERIOD as i32 - phase) * 4 - 18
        };
        let envelope = ((len - i) * 6 / len) as i32;
        *sample = (128 + triangle * envelope) as u8;
    }
}

#[embassy_executor::task]
async fn feed_task(feeder: speaker::Feeder<'static>, player: &'static Player<'static>) {
    info!("Feeder task started on core 1");
    feeder.run(player).await
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let peripherals = disobey2026audio::init();
    let resources = split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let (transport_config, rate) =
        TransportConfig::for_sample_rate(config::TARGET_SAMPLE_RATE).unwrap();
    info!(
        "Speaker clock: {} Hz requested, {} Hz actual",
        rate.requested, rate.actual
    );

    let player = mk_static!(Player<'static>, Player::new());
    let link = mk_static!(speaker::I2sLink, speaker::I2sLink::new());

    let chime = mk_static!([u8; CHIME_LEN], [128; CHIME_LEN]);
    synthesize(chime);
    let chime: &'static [u8] = chime;

    // Core 1 owns the I2S transmitter and keeps its DMA ring fed
    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    let core1_stack = mk_static!(
        esp_hal::system::Stack<8192>,
        esp_hal::system::Stack::new()
    );
    let i2s_out = resources.i2s_out;

    esp_rtos::start_second_core::<8192>(
        peripherals.CPU_CTRL,
        sw_ints.software_interrupt0,
        sw_ints.software_interrupt1,
        core1_stack,
        move || {
            let executor = mk_static!(
                esp_rtos::embassy::Executor,
                esp_rtos::embassy::Executor::new()
            );
            executor.run(|spawner| {
                let feeder = speaker::Feeder::new(i2s_out, &transport_config, link);
                spawner.must_spawn(feed_task(feeder, player));
            });
        },
    );

    let mut engine =
        speaker::engine(resources.speaker, player, link, PlaybackConfig::default()).unwrap();

    loop {
        match engine.play(chime) {
            Ok(()) => info!("Chime played"),
            Err(e) => error!("Chime failed: {}", e),
        }
        Timer::after(Duration::from_secs(2)).await;
    }
}
