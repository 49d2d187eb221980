mod core;
#[cfg(feature = "table")]
mod table;

pub use core::*;
