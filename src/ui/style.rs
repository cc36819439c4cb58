//! Colours, fonts and offsets of the face

use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_7X13, FONT_8X13, FONT_9X18},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::{Rgb565, RgbColor},
};
use profont::PROFONT_24_POINT;

use super::{BackgroundVariant, DisplayState};

/// Horizontal gap between high and low temperature, in pixels.
/// The divider is eight gaps long and the icon sits two gaps off the text.
pub const SPACE_BETWEEN_TEMPERATURES: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Background before the first tap (#03A9F4)
    pub background: Rgb565,
    /// Background after an odd number of taps (#0277BD)
    pub background_alt: Rgb565,
    pub text: Rgb565,
    /// Secondary text in interactive mode (#B3E5FC)
    pub text_light: Rgb565,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb565::new(0, 42, 30),
            background_alt: Rgb565::new(0, 29, 23),
            text: Rgb565::WHITE,
            text_light: Rgb565::new(22, 57, 31),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenShape {
    Round,
    Square,
}

/// Size dependent text settings, y values are text baselines
#[derive(Clone, Copy)]
pub struct TextMetrics {
    pub time_font: &'static MonoFont<'static>,
    pub date_font: &'static MonoFont<'static>,
    pub temperature_font: &'static MonoFont<'static>,
    pub time_y: i32,
    pub date_y: i32,
    pub weather_y: i32,
}

impl TextMetrics {
    pub const SQUARE: Self = Self {
        time_font: &PROFONT_24_POINT,
        date_font: &FONT_7X13,
        temperature_font: &FONT_9X18,
        time_y: 96,
        date_y: 128,
        weather_y: 188,
    };

    pub const ROUND: Self = Self {
        time_font: &PROFONT_24_POINT,
        date_font: &FONT_8X13,
        temperature_font: &FONT_10X20,
        time_y: 104,
        date_y: 136,
        weather_y: 192,
    };
}

/// Face configuration
#[derive(Clone, Copy)]
pub struct FaceConfig {
    pub palette: Palette,
    pub round: TextMetrics,
    pub square: TextMetrics,
    /// Shape assumed until the host reports insets
    pub shape: ScreenShape,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            round: TextMetrics::ROUND,
            square: TextMetrics::SQUARE,
            shape: ScreenShape::Square,
        }
    }
}

impl FaceConfig {
    pub fn metrics(&self, shape: ScreenShape) -> TextMetrics {
        match shape {
            ScreenShape::Round => self.round,
            ScreenShape::Square => self.square,
        }
    }
}

/// Paint of one text element
#[derive(Clone, Copy)]
pub struct TextPaint {
    pub font: &'static MonoFont<'static>,
    pub color: Rgb565,
    pub anti_alias: bool,
}

impl TextPaint {
    fn new(font: &'static MonoFont<'static>, color: Rgb565) -> Self {
        Self {
            font,
            color,
            anti_alias: true,
        }
    }

    /// Character style to draw with.
    ///
    /// Bitmap fonts have no smoothing, so without anti-aliasing the colour is
    /// snapped to full intensity channels instead.
    pub fn text_style(&self) -> MonoTextStyle<'static, Rgb565> {
        let color = if self.anti_alias {
            self.color
        } else {
            quantize(self.color)
        };
        MonoTextStyle::new(self.font, color)
    }
}

/// Snap every channel to either zero or its maximum
pub fn quantize(color: Rgb565) -> Rgb565 {
    let snap = |value: u8, max: u8| if value > max / 2 { max } else { 0 };
    Rgb565::new(
        snap(color.r(), Rgb565::MAX_R),
        snap(color.g(), Rgb565::MAX_G),
        snap(color.b(), Rgb565::MAX_B),
    )
}

/// Current visual state of the face
#[derive(Clone, Copy)]
pub struct StyleConfig {
    pub palette: Palette,
    pub metrics: TextMetrics,
    pub time: TextPaint,
    pub date: TextPaint,
    pub high_temperature: TextPaint,
    pub low_temperature: TextPaint,
    pub divider: Rgb565,
}

impl StyleConfig {
    pub fn new(config: &FaceConfig) -> Self {
        let palette = config.palette;
        let metrics = config.metrics(config.shape);
        Self {
            palette,
            metrics,
            time: TextPaint::new(metrics.time_font, palette.text),
            date: TextPaint::new(metrics.date_font, palette.text_light),
            high_temperature: TextPaint::new(metrics.temperature_font, palette.text),
            low_temperature: TextPaint::new(metrics.temperature_font, palette.text_light),
            divider: palette.text_light,
        }
    }

    /// Re-read size dependent text settings
    pub fn apply_metrics(&mut self, metrics: TextMetrics) {
        self.metrics = metrics;
        self.time.font = metrics.time_font;
        self.date.font = metrics.date_font;
        self.high_temperature.font = metrics.temperature_font;
        self.low_temperature.font = metrics.temperature_font;
    }

    /// Switch secondary colours and, on low-bit displays, anti-aliasing
    pub fn apply_ambient(&mut self, ambient: bool, low_bit_ambient: bool) {
        let secondary = if ambient {
            self.palette.text
        } else {
            self.palette.text_light
        };
        self.divider = secondary;
        self.date.color = secondary;
        self.low_temperature.color = secondary;

        if low_bit_ambient {
            for paint in [
                &mut self.time,
                &mut self.date,
                &mut self.high_temperature,
                &mut self.low_temperature,
            ] {
                paint.anti_alias = !ambient;
            }
        }
    }

    pub fn background(&self, display: &DisplayState) -> Rgb565 {
        if display.ambient {
            return Rgb565::BLACK;
        }
        match display.background {
            BackgroundVariant::A => self.palette.background,
            BackgroundVariant::B => self.palette.background_alt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(Rgb565::WHITE), Rgb565::WHITE);
        assert_eq!(quantize(Rgb565::BLACK), Rgb565::BLACK);
        assert_eq!(quantize(Palette::default().text_light), Rgb565::WHITE);
        assert_eq!(quantize(Rgb565::new(3, 40, 10)), Rgb565::new(0, 63, 0));
    }

    #[test]
    fn test_ambient_swaps_secondary_colours() {
        let palette = Palette::default();
        let mut style = StyleConfig::new(&FaceConfig::default());
        assert_eq!(style.date.color, palette.text_light);

        style.apply_ambient(true, false);
        assert_eq!(style.date.color, palette.text);
        assert_eq!(style.low_temperature.color, palette.text);
        assert_eq!(style.divider, palette.text);
        assert_eq!(style.high_temperature.color, palette.text);
        assert!(style.time.anti_alias);

        style.apply_ambient(false, false);
        assert_eq!(style.date.color, palette.text_light);
        assert_eq!(style.divider, palette.text_light);
    }

    #[test]
    fn test_low_bit_ambient_disables_anti_alias() {
        let mut style = StyleConfig::new(&FaceConfig::default());
        style.apply_ambient(true, true);
        assert!(!style.time.anti_alias);
        assert!(!style.low_temperature.anti_alias);
        assert_eq!(style.date.text_style().text_color, Some(Rgb565::WHITE));

        style.apply_ambient(false, true);
        assert!(style.time.anti_alias);
        assert!(style.date.anti_alias);
    }

    #[test]
    fn test_background() {
        let style = StyleConfig::new(&FaceConfig::default());
        let mut display = DisplayState::default();
        assert_eq!(style.background(&display), style.palette.background);

        display.register_tap();
        assert_eq!(style.background(&display), style.palette.background_alt);

        display.ambient = true;
        assert_eq!(style.background(&display), Rgb565::BLACK);
    }
}
