pub mod config;
pub mod debounce;
pub mod diagnostics;
pub mod dirty;
pub mod frame;
pub mod frame_loop;
pub mod scheduler;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::*;
pub use debounce::*;
pub use diagnostics::*;
pub use dirty::*;
pub use frame::*;
pub use frame_loop::*;
pub use scheduler::*;
pub use worker::*;
