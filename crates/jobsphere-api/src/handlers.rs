//! Request handlers.

pub mod contact;
pub mod health;
pub mod jobs;

pub use contact::*;
pub use health::*;
pub use jobs::*;
