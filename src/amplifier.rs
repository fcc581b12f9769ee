//! Speaker amplifier enable line.

use embedded_hal::digital::OutputPin;

/// Drives the amplifier's enable input.
///
/// Remembers the commanded level; there is no readback from the chip.
pub struct Amplifier<P> {
    pin: P,
    enabled: bool,
}

impl<P: OutputPin> Amplifier<P> {
    /// Take over `pin` and drive it low.
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self { pin, enabled: false })
    }

    pub fn enable(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()?;
        self.enabled = true;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()?;
        self.enabled = false;
        Ok(())
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::digital::ErrorType;

    use super::*;

    #[derive(Default)]
    struct LevelLog(Vec<bool>);

    impl ErrorType for LevelLog {
        type Error = Infallible;
    }

    impl OutputPin for LevelLog {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.push(true);
            Ok(())
        }
    }

    #[test]
    fn new_drives_the_line_low() {
        let amp = Amplifier::new(LevelLog::default()).unwrap();
        assert!(!amp.is_enabled());
        assert_eq!(amp.release().0, [false]);
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let mut amp = Amplifier::new(LevelLog::default()).unwrap();
        amp.enable().unwrap();
        amp.enable().unwrap();
        assert!(amp.is_enabled());
        amp.disable().unwrap();
        amp.disable().unwrap();
        assert!(!amp.is_enabled());
        assert_eq!(amp.release().0, [false, true, true, false, false]);
    }
}
