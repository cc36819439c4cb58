//! Lifecycle and timer coordination of the watch face

use chrono::{FixedOffset, Offset, Utc};
use embedded_graphics::{pixelcolor::Rgb565, prelude::DrawTarget, primitives::Rectangle};
use heapless::Vec;

use super::{
    render::Renderer,
    style::{FaceConfig, ScreenShape, StyleConfig},
    DisplayState,
};
use crate::{
    clock::{TimeSample, TimeSource},
    weather::WeatherSnapshot,
};

/// Update rate in interactive mode, seconds are displayed there
pub const INTERACTIVE_UPDATE_RATE_MS: u64 = 1_000;

/// Phase of a tap gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapKind {
    /// Finger down
    Touch,
    /// Gesture turned into something else
    TouchCancel,
    /// Completed tap
    Tap,
}

/// Events the host delivers to the face
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceEvent {
    VisibilityChanged(bool),
    AmbientModeChanged(bool),
    PropertiesChanged { low_bit_ambient: bool },
    /// Host's periodic tick, once a minute in ambient mode
    TimeTick,
    Tap {
        kind: TapKind,
        x: i32,
        y: i32,
        time_ms: u64,
    },
    InsetsApplied(ScreenShape),
    /// Interactive update timer fired
    UpdateTimer,
    WeatherReceived(WeatherSnapshot),
    TimezoneChanged,
    ChannelConnected,
    ChannelSuspended,
    ChannelFailed,
    Destroyed,
}

/// Requests from the face to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    Redraw,
    ConnectChannel,
    DisconnectChannel,
    SubscribeTimezone,
    UnsubscribeTimezone,
    CancelTick,
    ScheduleTick { delay_ms: u32 },
}

/// Effects of one event, in order. Redraws are coalesced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects(Vec<Effect, 8>);

impl Effects {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, effect: Effect) {
        if effect == Effect::Redraw && self.contains(Effect::Redraw) {
            return;
        }
        // No event produces more effects than the capacity
        let _ = self.0.push(effect);
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.0.contains(&effect)
    }

    pub fn redraw(&self) -> bool {
        self.contains(Effect::Redraw)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Effect] {
        &self.0
    }
}

impl IntoIterator for Effects {
    type Item = Effect;
    type IntoIter = <Vec<Effect, 8> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// State of the data channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Digital watch face with seconds and weather.
///
/// In ambient mode the seconds aren't displayed. On devices with low-bit
/// ambient mode the text is drawn without anti-aliasing in ambient mode.
pub struct WatchFace {
    config: FaceConfig,
    renderer: Renderer,
    display: DisplayState,
    weather: WeatherSnapshot,
    visible: bool,
    timer_running: bool,
    channel: ChannelState,
    timezone_subscribed: bool,
    zone: FixedOffset,
}

impl WatchFace {
    pub fn new(config: FaceConfig) -> Self {
        Self {
            config,
            renderer: Renderer::new(StyleConfig::new(&config)),
            display: DisplayState::default(),
            weather: WeatherSnapshot::default(),
            visible: false,
            timer_running: false,
            channel: ChannelState::Disconnected,
            timezone_subscribed: false,
            zone: Utc.fix(),
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn weather(&self) -> &WeatherSnapshot {
        &self.weather
    }

    pub fn style(&self) -> &StyleConfig {
        self.renderer.style()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the interactive update timer is scheduled
    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn channel(&self) -> ChannelState {
        self.channel
    }

    pub fn timezone_subscribed(&self) -> bool {
        self.timezone_subscribed
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Handle one host event
    pub fn handle(&mut self, event: FaceEvent, clock: &impl TimeSource) -> Effects {
        let mut effects = Effects::new();

        match event {
            FaceEvent::VisibilityChanged(visible) => {
                self.on_visibility_changed(visible, clock, &mut effects)
            }
            FaceEvent::AmbientModeChanged(ambient) => {
                self.on_ambient_mode_changed(ambient, &mut effects)
            }
            FaceEvent::PropertiesChanged { low_bit_ambient } => {
                self.display.low_bit_ambient = low_bit_ambient;
            }
            FaceEvent::TimeTick => effects.push(Effect::Redraw),
            FaceEvent::Tap { kind, x, y, .. } => self.on_tap(kind, x, y, &mut effects),
            FaceEvent::InsetsApplied(shape) => {
                let metrics = self.config.metrics(shape);
                self.renderer.style_mut().apply_metrics(metrics);
            }
            FaceEvent::UpdateTimer => self.on_update_timer(clock, &mut effects),
            FaceEvent::WeatherReceived(weather) => {
                crate::info!(
                    "Weather updated (complete: {})",
                    weather.complete().is_some()
                );
                self.weather = weather;
                effects.push(Effect::Redraw);
            }
            FaceEvent::TimezoneChanged => {
                if self.timezone_subscribed {
                    self.zone = clock.local_offset();
                    effects.push(Effect::Redraw);
                }
            }
            FaceEvent::ChannelConnected => {
                if self.channel != ChannelState::Disconnected {
                    crate::info!("Data channel connected");
                    self.channel = ChannelState::Connected;
                } else {
                    crate::debug!("Dropping connection made while hidden");
                    effects.push(Effect::DisconnectChannel);
                }
            }
            FaceEvent::ChannelSuspended => crate::info!("Data channel suspended"),
            FaceEvent::ChannelFailed => {
                crate::warn!("Data channel connection failed");
                self.channel = ChannelState::Disconnected;
            }
            FaceEvent::Destroyed => self.on_destroy(&mut effects),
        }

        effects
    }

    /// Draw the current frame
    pub fn draw<D>(
        &self,
        target: &mut D,
        bounds: Rectangle,
        clock: &impl TimeSource,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let time = TimeSample::now(clock, self.zone);
        self.renderer
            .render(target, bounds, &time, &self.display, &self.weather)
    }

    fn on_visibility_changed(
        &mut self,
        visible: bool,
        clock: &impl TimeSource,
        effects: &mut Effects,
    ) {
        self.visible = visible;

        if visible {
            if self.channel == ChannelState::Disconnected {
                self.channel = ChannelState::Connecting;
                effects.push(Effect::ConnectChannel);
            }
            if !self.timezone_subscribed {
                self.timezone_subscribed = true;
                effects.push(Effect::SubscribeTimezone);
            }
            // The zone may have changed while hidden
            self.zone = clock.local_offset();
        } else {
            self.release_channel(effects);
        }

        self.update_timer(effects);
    }

    fn on_ambient_mode_changed(&mut self, ambient: bool, effects: &mut Effects) {
        if self.display.ambient != ambient {
            self.display.ambient = ambient;
            self.renderer
                .style_mut()
                .apply_ambient(ambient, self.display.low_bit_ambient);
            effects.push(Effect::Redraw);
        }

        self.update_timer(effects);
    }

    /// Only a completed tap toggles the background
    fn on_tap(&mut self, kind: TapKind, x: i32, y: i32, effects: &mut Effects) {
        if kind == TapKind::Tap {
            self.display.register_tap();
            crate::debug!("Tap at {},{}, count {}", x, y, self.display.tap_count);
        }
        effects.push(Effect::Redraw);
    }

    fn on_update_timer(&mut self, clock: &impl TimeSource, effects: &mut Effects) {
        effects.push(Effect::Redraw);
        if self.should_timer_be_running() {
            let delay_ms = clock.ms_until_next(INTERACTIVE_UPDATE_RATE_MS);
            effects.push(Effect::ScheduleTick {
                delay_ms: delay_ms as u32,
            });
        } else {
            self.timer_running = false;
        }
    }

    fn on_destroy(&mut self, effects: &mut Effects) {
        self.visible = false;
        self.timer_running = false;
        effects.push(Effect::CancelTick);
        self.release_channel(effects);
    }

    fn release_channel(&mut self, effects: &mut Effects) {
        if self.channel != ChannelState::Disconnected {
            self.channel = ChannelState::Disconnected;
            effects.push(Effect::DisconnectChannel);
        }
        if self.timezone_subscribed {
            self.timezone_subscribed = false;
            effects.push(Effect::UnsubscribeTimezone);
        }
    }

    /// Cancel the timer and start it again if it should be running
    fn update_timer(&mut self, effects: &mut Effects) {
        effects.push(Effect::CancelTick);
        self.timer_running = self.should_timer_be_running();
        if self.timer_running {
            effects.push(Effect::ScheduleTick { delay_ms: 0 });
        }
    }

    /// The timer only runs while visible and in interactive mode
    fn should_timer_be_running(&self) -> bool {
        self.visible && !self.display.ambient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ClockReading,
        ui::{render::tests::Canvas, BackgroundVariant},
    };
    use chrono::{NaiveDate, NaiveDateTime, Timelike};
    use embedded_graphics::{geometry::Point, prelude::Size};
    use proptest::prelude::*;

    fn utc() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_milli_opt(21, 5, 3, 250)
            .unwrap()
    }

    fn clock() -> ClockReading {
        ClockReading::new(utc(), Utc.fix())
    }

    fn tap(kind: TapKind) -> FaceEvent {
        FaceEvent::Tap {
            kind,
            x: 120,
            y: 120,
            time_ms: 0,
        }
    }

    fn visible_face() -> WatchFace {
        let mut face = WatchFace::new(FaceConfig::default());
        face.handle(FaceEvent::VisibilityChanged(true), &clock());
        face
    }

    fn schedules(effects: &Effects) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::ScheduleTick { .. }))
            .count()
    }

    #[test]
    fn test_becoming_visible() {
        let mut face = WatchFace::new(FaceConfig::default());
        let effects = face.handle(FaceEvent::VisibilityChanged(true), &clock());

        assert_eq!(
            effects.as_slice(),
            [
                Effect::ConnectChannel,
                Effect::SubscribeTimezone,
                Effect::CancelTick,
                Effect::ScheduleTick { delay_ms: 0 },
            ]
        );
        assert!(face.timer_running());
        assert_eq!(face.channel(), ChannelState::Connecting);
    }

    #[test]
    fn test_repeated_visibility_does_not_duplicate() {
        let mut face = visible_face();
        let effects = face.handle(FaceEvent::VisibilityChanged(true), &clock());
        assert_eq!(
            effects.as_slice(),
            [Effect::CancelTick, Effect::ScheduleTick { delay_ms: 0 }]
        );
    }

    #[test]
    fn test_becoming_hidden() {
        let mut face = visible_face();
        face.handle(FaceEvent::ChannelConnected, &clock());
        let effects = face.handle(FaceEvent::VisibilityChanged(false), &clock());

        assert_eq!(
            effects.as_slice(),
            [
                Effect::DisconnectChannel,
                Effect::UnsubscribeTimezone,
                Effect::CancelTick,
            ]
        );
        assert!(!face.timer_running());
        assert_eq!(face.channel(), ChannelState::Disconnected);
    }

    #[test]
    fn test_ambient_stops_timer() {
        let mut face = visible_face();
        let effects = face.handle(FaceEvent::AmbientModeChanged(true), &clock());
        assert_eq!(effects.as_slice(), [Effect::Redraw, Effect::CancelTick]);
        assert!(!face.timer_running());

        // Same value again only re-evaluates the timer
        let effects = face.handle(FaceEvent::AmbientModeChanged(true), &clock());
        assert_eq!(effects.as_slice(), [Effect::CancelTick]);

        let effects = face.handle(FaceEvent::AmbientModeChanged(false), &clock());
        assert_eq!(
            effects.as_slice(),
            [
                Effect::Redraw,
                Effect::CancelTick,
                Effect::ScheduleTick { delay_ms: 0 },
            ]
        );
    }

    #[test]
    fn test_low_bit_ambient() {
        let mut face = visible_face();
        face.handle(
            FaceEvent::PropertiesChanged {
                low_bit_ambient: true,
            },
            &clock(),
        );
        face.handle(FaceEvent::AmbientModeChanged(true), &clock());
        assert!(!face.style().time.anti_alias);
        assert_eq!(face.style().date.color, face.style().palette.text);

        face.handle(FaceEvent::AmbientModeChanged(false), &clock());
        assert!(face.style().time.anti_alias);
        assert_eq!(face.style().date.color, face.style().palette.text_light);
    }

    #[test]
    fn test_update_timer_aligns_to_seconds() {
        let mut face = visible_face();
        let effects = face.handle(FaceEvent::UpdateTimer, &clock());
        assert_eq!(
            effects.as_slice(),
            [Effect::Redraw, Effect::ScheduleTick { delay_ms: 750 }]
        );

        let on_the_second = ClockReading::new(utc().with_nanosecond(0).unwrap(), Utc.fix());
        let effects = face.handle(FaceEvent::UpdateTimer, &on_the_second);
        assert!(effects.contains(Effect::ScheduleTick { delay_ms: 1000 }));
    }

    #[test]
    fn test_stale_update_timer_only_redraws() {
        let mut face = visible_face();
        face.handle(FaceEvent::AmbientModeChanged(true), &clock());
        let effects = face.handle(FaceEvent::UpdateTimer, &clock());
        assert_eq!(effects.as_slice(), [Effect::Redraw]);
    }

    #[test]
    fn test_tap_sequence() {
        let mut face = visible_face();
        let original = face.display().background;
        assert_eq!(original, BackgroundVariant::A);

        let mut seen = std::vec::Vec::new();
        for kind in [TapKind::Touch, TapKind::Tap, TapKind::Touch, TapKind::Tap] {
            let effects = face.handle(tap(kind), &clock());
            assert!(effects.redraw());
            seen.push(face.display().background);
        }

        assert_eq!(face.display().tap_count, 2);
        assert_eq!(
            seen,
            [
                BackgroundVariant::A,
                BackgroundVariant::B,
                BackgroundVariant::B,
                BackgroundVariant::A,
            ]
        );
    }

    #[test]
    fn test_cancelled_tap_keeps_background() {
        let mut face = visible_face();
        let effects = face.handle(tap(TapKind::TouchCancel), &clock());
        assert_eq!(effects.as_slice(), [Effect::Redraw]);
        assert_eq!(face.display().tap_count, 0);
    }

    #[test]
    fn test_weather_replaced_whole() {
        let mut face = visible_face();
        face.handle(
            FaceEvent::WeatherReceived(WeatherSnapshot::new("72°", "58°", 800)),
            &clock(),
        );
        assert!(face.weather().complete().is_some());

        let partial = WeatherSnapshot {
            high_temperature: None,
            ..WeatherSnapshot::new("", "60°", 801)
        };
        let effects = face.handle(FaceEvent::WeatherReceived(partial.clone()), &clock());
        assert!(effects.redraw());
        assert_eq!(face.weather(), &partial);
        assert!(face.weather().complete().is_none());
    }

    #[test]
    fn test_timezone_only_while_subscribed() {
        let mut face = WatchFace::new(FaceConfig::default());
        let east = ClockReading::new(utc(), FixedOffset::east_opt(2 * 3600).unwrap());

        let effects = face.handle(FaceEvent::TimezoneChanged, &east);
        assert!(effects.is_empty());
        assert_eq!(face.zone(), Utc.fix());

        face.handle(FaceEvent::VisibilityChanged(true), &clock());
        let effects = face.handle(FaceEvent::TimezoneChanged, &east);
        assert_eq!(effects.as_slice(), [Effect::Redraw]);
        assert_eq!(face.zone().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_visibility_refreshes_zone() {
        let mut face = WatchFace::new(FaceConfig::default());
        let west = ClockReading::new(utc(), FixedOffset::west_opt(5 * 3600).unwrap());
        face.handle(FaceEvent::VisibilityChanged(true), &west);
        assert_eq!(face.zone().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_channel_lifecycle() {
        let mut face = visible_face();
        face.handle(FaceEvent::ChannelFailed, &clock());
        assert_eq!(face.channel(), ChannelState::Disconnected);

        // No retry until visible again
        let effects = face.handle(FaceEvent::ChannelSuspended, &clock());
        assert!(effects.is_empty());

        face.handle(FaceEvent::VisibilityChanged(false), &clock());
        let effects = face.handle(FaceEvent::VisibilityChanged(true), &clock());
        assert!(effects.contains(Effect::ConnectChannel));

        // A connection completing after hiding again is dropped
        face.handle(FaceEvent::VisibilityChanged(false), &clock());
        let effects = face.handle(FaceEvent::ChannelConnected, &clock());
        assert_eq!(effects.as_slice(), [Effect::DisconnectChannel]);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut face = visible_face();
        let effects = face.handle(FaceEvent::Destroyed, &clock());
        assert_eq!(
            effects.as_slice(),
            [
                Effect::CancelTick,
                Effect::DisconnectChannel,
                Effect::UnsubscribeTimezone,
            ]
        );
        assert!(!face.timer_running());
    }

    #[test]
    fn test_insets_switch_metrics() {
        let mut face = visible_face();
        let effects = face.handle(FaceEvent::InsetsApplied(ScreenShape::Round), &clock());
        assert!(effects.is_empty());
        assert_eq!(face.style().metrics.date_y, FaceConfig::default().round.date_y);
    }

    #[test]
    fn test_draw_uses_zone() {
        let mut face = WatchFace::new(FaceConfig::default());
        let east = ClockReading::new(utc(), FixedOffset::east_opt(3600).unwrap());
        face.handle(FaceEvent::VisibilityChanged(true), &east);
        face.handle(
            FaceEvent::WeatherReceived(WeatherSnapshot::new("72°", "58°", 800)),
            &east,
        );

        let bounds = Rectangle::new(Point::zero(), Size::new(240, 240));
        let mut canvas = Canvas::new();
        face.draw(&mut canvas, bounds, &east).unwrap();
        assert_eq!(canvas.pixel(0, 0), face.style().palette.background);

        let time = TimeSample::now(&east, face.zone());
        assert_eq!(time.hours, 10);
    }

    #[derive(Debug, Clone)]
    enum Transition {
        Visible(bool),
        Ambient(bool),
    }

    fn transition() -> impl Strategy<Value = Transition> {
        prop_oneof![
            any::<bool>().prop_map(Transition::Visible),
            any::<bool>().prop_map(Transition::Ambient),
        ]
    }

    proptest! {
        #[test]
        fn prop_background_follows_tap_parity(taps in proptest::collection::vec(0u8..3, 0..64)) {
            let mut face = visible_face();
            for kind in taps {
                let kind = match kind {
                    0 => TapKind::Touch,
                    1 => TapKind::TouchCancel,
                    _ => TapKind::Tap,
                };
                face.handle(tap(kind), &clock());
                let display = face.display();
                prop_assert_eq!(
                    display.background == BackgroundVariant::A,
                    display.tap_count % 2 == 0
                );
            }
        }

        #[test]
        fn prop_timer_runs_iff_visible_and_interactive(steps in proptest::collection::vec(transition(), 0..32)) {
            let mut face = WatchFace::new(FaceConfig::default());
            for step in steps {
                let event = match step {
                    Transition::Visible(visible) => FaceEvent::VisibilityChanged(visible),
                    Transition::Ambient(ambient) => FaceEvent::AmbientModeChanged(ambient),
                };
                let effects = face.handle(event, &clock());
                let should_run = face.is_visible() && !face.display().ambient;

                prop_assert_eq!(face.timer_running(), should_run);
                prop_assert!(effects.contains(Effect::CancelTick));
                prop_assert_eq!(schedules(&effects), should_run as usize);

                // Cancel always comes before a new schedule
                let cancel = effects.iter().position(|e| *e == Effect::CancelTick);
                let schedule = effects.iter().position(|e| matches!(e, Effect::ScheduleTick { .. }));
                if let (Some(cancel), Some(schedule)) = (cancel, schedule) {
                    prop_assert!(cancel < schedule);
                }
            }
        }
    }
}
