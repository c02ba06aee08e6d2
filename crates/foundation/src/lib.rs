pub mod bounds;
pub mod time;
pub mod viewport;
pub mod window;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use time::*;
pub use viewport::*;
pub use window::*;
