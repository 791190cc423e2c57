#![doc = "Monotonic clock sampling shared by the gettime workspace."]

pub mod clock;
pub mod config;
pub mod error;
pub mod time;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use time::*;
