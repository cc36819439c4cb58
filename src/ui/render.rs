//! Frame rendering
//!
//! A frame is first laid out into a [`FaceLayout`] (strings, positions and
//! colours) and then drawn onto any `embedded-graphics` draw target.

use embedded_graphics::{
    geometry::Point,
    mono_font::MonoTextStyle,
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{renderer::TextRenderer, Baseline, Text},
};
use heapless::String;

use super::{
    icons::{draw_icon, ICON_SIZE},
    style::{StyleConfig, TextPaint, SPACE_BETWEEN_TEMPERATURES},
    DisplayState,
};
use crate::{
    clock::TimeSample,
    weather::{Condition, WeatherSnapshot},
};

const BUF_LEN: usize = 32;

/// A positioned line of text, `position` is the left end of the baseline
#[derive(Clone)]
pub struct Label {
    pub text: String<BUF_LEN>,
    pub position: Point,
    /// Measured width in pixels
    pub width: u32,
    /// Measured height in pixels
    pub height: u32,
    pub style: MonoTextStyle<'static, Rgb565>,
}

impl Label {
    fn new(text: &str, paint: &TextPaint) -> Self {
        let style = paint.text_style();
        let size = style
            .measure_string(text, Point::zero(), Baseline::Alphabetic)
            .bounding_box
            .size;
        let mut label = String::new();
        let _ = label.push_str(text);

        Self {
            text: label,
            position: Point::zero(),
            width: size.width,
            height: size.height,
            style,
        }
    }

    fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Centre horizontally on `center_x`
    fn centered(self, center_x: i32, y: i32) -> Self {
        let x = center_x - self.width as i32 / 2;
        self.at(x, y)
    }

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        Text::with_baseline(&self.text, self.position, self.style, Baseline::Alphabetic)
            .draw(target)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct WeatherRow {
    pub divider: Line,
    pub divider_color: Rgb565,
    /// Icon and its top left corner, interactive mode only
    pub icon: Option<(Condition, Point)>,
    pub icon_color: Rgb565,
    pub high: Label,
    pub low: Label,
}

/// Everything needed to draw one frame
#[derive(Clone)]
pub struct FaceLayout {
    pub bounds: Rectangle,
    pub background: Rgb565,
    pub time: Label,
    pub date: Label,
    pub weather: Option<WeatherRow>,
}

impl FaceLayout {
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        target.fill_solid(&self.bounds, self.background)?;
        self.time.draw(target)?;
        self.date.draw(target)?;

        if let Some(row) = &self.weather {
            row.divider
                .into_styled(PrimitiveStyle::with_stroke(row.divider_color, 1))
                .draw(target)?;
            if let Some((condition, origin)) = row.icon {
                draw_icon(target, condition, origin, row.icon_color)?;
            }
            row.high.draw(target)?;
            row.low.draw(target)?;
        }

        Ok(())
    }
}

/// Render engine of the face
pub struct Renderer {
    style: StyleConfig,
}

impl Renderer {
    pub fn new(style: StyleConfig) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleConfig {
        &mut self.style
    }

    /// Lay out a frame
    pub fn layout(
        &self,
        bounds: Rectangle,
        time: &TimeSample,
        display: &DisplayState,
        weather: &WeatherSnapshot,
    ) -> FaceLayout {
        let style = &self.style;
        let metrics = &style.metrics;
        let center_x = bounds.top_left.x + bounds.size.width as i32 / 2;

        let mut buf = [0u8; BUF_LEN];
        let time_text = time.format_time(&mut buf, display.ambient).unwrap_or("");
        let time_label = Label::new(time_text, &style.time).centered(center_x, metrics.time_y);

        let mut buf = [0u8; BUF_LEN];
        let date_text = time.format_date(&mut buf).unwrap_or("");
        let date_label = Label::new(date_text, &style.date).centered(center_x, metrics.date_y);

        let weather = weather.complete().map(|weather| {
            let gap = SPACE_BETWEEN_TEMPERATURES;
            let high = Label::new(weather.high_temperature, &style.high_temperature);
            let low = Label::new(weather.low_temperature, &style.low_temperature);
            let half_height = high.height as i32 / 2;

            let line_y = (metrics.date_y + metrics.weather_y) / 2 - half_height;
            let divider = Line::new(
                Point::new(center_x - 4 * gap, line_y),
                Point::new(center_x + 4 * gap, line_y),
            );

            let (high_x, icon) = if display.ambient {
                let block = high.width as i32 + low.width as i32 + gap;
                (center_x - block / 2, None)
            } else {
                let high_x = center_x - high.width as i32 / 2;
                let icon_origin = Point::new(
                    high_x - ICON_SIZE.width as i32 - 2 * gap,
                    metrics.weather_y - half_height - ICON_SIZE.height as i32 / 2,
                );
                (high_x, Some((weather.condition, icon_origin)))
            };
            let low_x = high_x + high.width as i32 + gap;

            WeatherRow {
                divider,
                divider_color: style.divider,
                icon,
                icon_color: style.high_temperature.color,
                high: high.at(high_x, metrics.weather_y),
                low: low.at(low_x, metrics.weather_y),
            }
        });

        FaceLayout {
            bounds,
            background: style.background(display),
            time: time_label,
            date: date_label,
            weather,
        }
    }

    /// Draw a frame into `target`
    pub fn render<D>(
        &self,
        target: &mut D,
        bounds: Rectangle,
        time: &TimeSample,
        display: &DisplayState,
        weather: &WeatherSnapshot,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.layout(bounds, time, display, weather).draw(target)
    }
}
