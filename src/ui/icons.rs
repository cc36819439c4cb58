//! Weather condition icons drawn from primitives

use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
};

use crate::weather::Condition;

pub const ICON_SIZE: Size = Size::new(24, 24);

/// Draw the icon of `condition` with its top left corner at `origin`
pub fn draw_icon<D>(
    target: &mut D,
    condition: Condition,
    origin: Point,
    color: Rgb565,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let fill = PrimitiveStyle::with_fill(color);
    let stroke = PrimitiveStyle::with_stroke(color, 2);
    let at = |x: i32, y: i32| origin + Point::new(x, y);

    match condition {
        Condition::Clear => {
            Circle::new(at(6, 6), 12).into_styled(fill).draw(target)?;
            for (start, end) in [
                ((12, 0), (12, 3)),
                ((12, 21), (12, 24)),
                ((0, 12), (3, 12)),
                ((21, 12), (24, 12)),
            ] {
                Line::new(at(start.0, start.1), at(end.0, end.1))
                    .into_styled(stroke)
                    .draw(target)?;
            }
        }
        Condition::LightClouds => {
            Circle::new(at(12, 0), 10).into_styled(fill).draw(target)?;
            draw_cloud(target, at(0, 6), color)?;
        }
        Condition::Clouds => {
            draw_cloud(target, at(0, 2), color)?;
            draw_cloud(target, at(4, 8), color)?;
        }
        Condition::Fog => {
            for y in [6, 12, 18] {
                Line::new(at(2, y), at(22, y))
                    .into_styled(stroke)
                    .draw(target)?;
            }
        }
        Condition::LightRain => {
            draw_cloud(target, origin, color)?;
            for x in [8, 16] {
                Line::new(at(x, 18), at(x - 2, 23))
                    .into_styled(stroke)
                    .draw(target)?;
            }
        }
        Condition::Rain => {
            draw_cloud(target, origin, color)?;
            for x in [6, 12, 18] {
                Line::new(at(x, 17), at(x - 3, 24))
                    .into_styled(stroke)
                    .draw(target)?;
            }
        }
        Condition::Snow => {
            draw_cloud(target, origin, color)?;
            for x in [4, 10, 16] {
                Circle::new(at(x, 19), 4).into_styled(fill).draw(target)?;
            }
        }
        Condition::Storm => {
            draw_cloud(target, origin, color)?;
            // Lightning bolt
            Line::new(at(13, 16), at(9, 20))
                .into_styled(stroke)
                .draw(target)?;
            Line::new(at(9, 20), at(14, 20))
                .into_styled(stroke)
                .draw(target)?;
            Line::new(at(14, 20), at(10, 24))
                .into_styled(stroke)
                .draw(target)?;
        }
    }

    Ok(())
}

/// Cloud of 24x16 pixels
fn draw_cloud<D>(target: &mut D, origin: Point, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let fill = PrimitiveStyle::with_fill(color);
    Circle::new(origin + Point::new(1, 5), 10)
        .into_styled(fill)
        .draw(target)?;
    Circle::new(origin + Point::new(7, 1), 12)
        .into_styled(fill)
        .draw(target)?;
    Circle::new(origin + Point::new(13, 5), 10)
        .into_styled(fill)
        .draw(target)?;
    Rectangle::new(origin + Point::new(6, 9), Size::new(12, 6))
        .into_styled(fill)
        .draw(target)
}
