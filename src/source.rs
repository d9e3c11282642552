use crate::dsfmt::Dsfmt19937;

/// A stream of uniform doubles in `[0, 1)`, the only input the variate
/// samplers consume.
///
/// Exclusive access is part of the contract: a sampler borrows the source
/// mutably for the duration of a draw, so two samplers can never interleave
/// on one source, and dropping the source releases its state. Every value
/// must lie in `[0, 1)`; the samplers rely on that range without
/// re-checking it.
pub trait UniformSource {
    /// Returns the next uniform double in `[0, 1)`.
    fn next(&mut self) -> f64;
}

impl UniformSource for Dsfmt19937 {
    /// The engine's canonical `[0, 1)` stream, one buffered double per call.
    #[inline]
    fn next(&mut self) -> f64 {
        self.next_close_open()
    }
}
