//! Symbolic execution engine for static analysis of 65816 (SNES) ROMs.
//!
//! The engine walks a ROM image from its reset and NMI vectors, forking at
//! every branch, call, and jump, and converges what it learns about
//! processor mode state and subroutine boundaries into a [`snes::log::Log`].

pub mod error;
pub mod snes;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
