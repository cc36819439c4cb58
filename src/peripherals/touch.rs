//! Touch controler module for PineTime

use cst816s::{TouchEvent, TouchGesture, CST816S};
use embassy_embedded_hal::shared_bus::blocking::i2c::I2cDevice;
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_10, P0_28},
    twim::{self, Twim},
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;

use pinetime_weatherface::ui::TapKind;

/// CST816S action code of a finger going down
const ACTION_DOWN: u8 = 0;

/// Touch sample in screen coordinates
#[derive(Debug, Clone, Copy)]
pub struct Touch {
    pub kind: TapKind,
    pub x: i32,
    pub y: i32,
}

pub struct TouchController<'a, TWI>
where
    TWI: twim::Instance,
{
    touchpad:
        CST816S<I2cDevice<'a, NoopRawMutex, Twim<'a, TWI>>, Input<'a, P0_28>, Output<'a, P0_10>>,
}

impl<'a, TWI> TouchController<'a, TWI>
where
    TWI: twim::Instance,
{
    /// Configure the touch controller on boot
    pub fn init(
        twi: I2cDevice<'a, NoopRawMutex, Twim<'a, TWI>>,
        interrupt_pin: Input<'a, P0_28>,
        reset_pin: Output<'a, P0_10>,
    ) -> Self {
        let mut touchpad = CST816S::new(twi, interrupt_pin, reset_pin);
        touchpad.setup(&mut Delay).ok();
        Self { touchpad }
    }

    /// Check for a new touch event
    pub fn try_event_detected(&mut self) -> Option<Touch> {
        let event = self.touchpad.read_one_touch_event(true)?;
        Some(Touch {
            kind: tap_kind(&event)?,
            x: event.x,
            y: event.y,
        })
    }
}

/// Map a controller report to the phase of a tap
fn tap_kind(event: &TouchEvent) -> Option<TapKind> {
    match event.gesture {
        TouchGesture::SingleClick => Some(TapKind::Tap),
        TouchGesture::None if event.action == ACTION_DOWN => Some(TapKind::Touch),
        TouchGesture::None => None,
        _ => Some(TapKind::TouchCancel),
    }
}
