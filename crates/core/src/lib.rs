#![forbid(unsafe_code)]

pub mod model;
pub mod progression;
pub mod scoring;
pub mod time;

pub use time::Clock;
