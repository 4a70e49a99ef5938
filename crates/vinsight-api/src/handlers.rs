//! Request handlers.

pub mod analyze;
pub mod health;
pub mod keyframes;
pub mod upload;

pub use analyze::*;
pub use health::*;
pub use keyframes::*;
pub use upload::*;
