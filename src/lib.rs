pub mod dsfmt;
pub mod error;
pub mod source;
pub mod variates;

pub use dsfmt::*;
pub use error::*;
pub use rand_core::*;
pub use source::*;
pub use variates::*;
