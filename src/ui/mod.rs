//! UI definitions module
//! Based on: https://github.com/lupyuen/pinetime-watchface/blob/master/src/lib.rs

mod face;
pub mod icons;
pub mod render;
pub mod style;

pub use face::{ChannelState, Effect, Effects, FaceEvent, TapKind, WatchFace};
pub use render::{FaceLayout, Renderer};
pub use style::{FaceConfig, ScreenShape, StyleConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackgroundVariant {
    #[default]
    A,
    B,
}

impl BackgroundVariant {
    /// Variant after `tap_count` completed taps
    pub fn for_taps(tap_count: u32) -> Self {
        if tap_count % 2 == 0 {
            BackgroundVariant::A
        } else {
            BackgroundVariant::B
        }
    }
}

/// State for the watch face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub ambient: bool,
    /// Display reported fewer colour bits in ambient mode
    pub low_bit_ambient: bool,
    pub tap_count: u32,
    pub background: BackgroundVariant,
}

impl DisplayState {
    /// Count a completed tap and flip the background
    pub fn register_tap(&mut self) {
        self.tap_count = self.tap_count.wrapping_add(1);
        self.background = BackgroundVariant::for_taps(self.tap_count);
    }
}
