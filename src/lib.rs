//! Weather watch face for the PineTime
//!
//! Board-agnostic part of the firmware: the render engine, the lifecycle and
//! timer coordinator, the weather data channel and the wall clock. Everything
//! in here builds for the host, the board glue lives in the firmware binary.

#![cfg_attr(not(test), no_std)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        pub use defmt::{debug, info, warn};
    }
    else if #[cfg(feature = "log")] {
        pub use log::{debug, info, warn};
    }
    else {
        #[macro_export]
        macro_rules! debug {
            ($($arg:tt)*) => {{}};
        }
        #[macro_export]
        macro_rules! info {
            ($($arg:tt)*) => {{}};
        }
        #[macro_export]
        macro_rules! warn {
            ($($arg:tt)*) => {{}};
        }
    }
}

pub mod clock;
pub mod registry;
pub mod ui;
pub mod weather;

pub use clock::{ClockReading, TimeReference, TimeSource, WallClock};
pub use registry::{FaceHandle, FaceRegistry};
pub use ui::{Effect, Effects, FaceEvent, WatchFace};
pub use weather::WeatherSnapshot;
