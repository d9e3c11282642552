use thiserror::Error;

/// Errors reported by the engine's bulk operations and the variate samplers.
///
/// Every variant is a precondition failure at the call site. Nothing here is
/// transient: retrying the same call with the same arguments fails again.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariateError {
    /// A distribution parameter lies outside its documented domain.
    /// The payload names the function and the violated constraint.
    #[error("invalid distribution parameter: {0}")]
    InvalidParameter(&'static str),

    /// A bulk fill was requested with an unusable length. The length must be
    /// even and at least [`MIN_FILL_LEN`](crate::dsfmt::MIN_FILL_LEN).
    #[error("fill length {len} is invalid: expected an even length of at least {min}")]
    InvalidFillLength {
        /// The length that was requested.
        len: usize,
        /// The smallest length the generator accepts.
        min: usize,
    },
}
