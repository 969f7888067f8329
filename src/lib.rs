#![no_std]

// Use std when running tests, see: https://stackoverflow.com/a/28186509
// Make sure to use different target when testing, e.g.
//   cargo test --target x86_64-unknown-linux-gnu
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod board;
pub mod delay;
pub mod io;
pub mod nvm;
pub mod sync;
pub mod timer;
pub mod utils;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
