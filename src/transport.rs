//! Boundary to the serial audio peripheral.

use core::fmt::Debug;

/// A continuous, double-buffered serial audio transmitter.
///
/// Once started, the transport's interrupt side asks for data one half
/// buffer at a time by calling [`Player::fill`](crate::Player::fill),
/// typically through [`TransferBuffer::refill`](crate::TransferBuffer::refill).
/// It keeps doing so until [`stop`](Self::stop).
pub trait Transport {
    type Error: Debug;

    /// Begin streaming.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Halt streaming immediately. Whatever is in flight is cut off.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn start(&mut self) -> Result<(), Self::Error> {
        T::start(self)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        T::stop(self)
    }
}
