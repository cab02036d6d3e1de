use geo::{BoundingRect, Contains, Point};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::canvas::{Canvas, Line, Points};
use ratatui::widgets::{Block, Borders};

use crate::controller::LayerSet;
use crate::data::LatLng;
use crate::registry::{BuildingPolygon, Registry};

const HIGHLIGHT: Color = Color::LightYellow;

/// Terminal color for a category tag. Known web color names map directly,
/// `#rrggbb` values become RGB, anything else falls back to blue.
pub fn tag_color(tag: &str) -> Color {
    match tag {
        "blue" => Color::Blue,
        "green" => Color::Green,
        "red" => Color::Red,
        "orange" => Color::Rgb(255, 165, 0),
        "purple" => Color::Magenta,
        "yellow" => Color::Yellow,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        other => parse_hex(other).unwrap_or(Color::Blue),
    }
}

fn parse_hex(tag: &str) -> Option<Color> {
    let hex = tag.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Canvas-space bounds for the loaded buildings and the drawing itself.
pub struct MapView {
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl MapView {
    /// None when the registry holds no polygons to frame.
    pub fn new(registry: &Registry) -> Option<Self> {
        let (x, y) = registry.bounds()?;
        Some(Self {
            x_bounds: pad(x),
            y_bounds: pad(y),
        })
    }

    /// Draws every polygon currently on the map, colored by tag, with the
    /// selected category's outlines repainted in the highlight color.
    pub fn render(
        &self,
        f: &mut Frame,
        area: Rect,
        registry: &Registry,
        layers: &LayerSet,
        highlight: Option<&str>,
        dark: bool,
    ) {
        let border = if dark { Color::DarkGray } else { Color::White };
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title("Campus")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .x_bounds(self.x_bounds)
            .y_bounds(self.y_bounds)
            .paint(|ctx| {
                // 1) every building on the map, in its tag color
                for poly in registry.polygons() {
                    if !layers.contains(poly.id) {
                        continue;
                    }
                    draw_outline(ctx, poly, tag_color(&poly.tag));
                    draw_fill(ctx, poly, tag_color(&poly.tag));
                }

                // 2) repaint the selected category on top
                if let Some(tag) = highlight {
                    for poly in registry.polygons() {
                        if poly.tag == tag && layers.contains(poly.id) {
                            draw_outline(ctx, poly, HIGHLIGHT);
                        }
                    }
                }
            });
        f.render_widget(canvas, area);
    }

    /// Inverts the canvas transform: terminal cell -> map position.
    /// None for positions on the frame or outside the widget.
    pub fn hit_position(&self, column: u16, row: u16, area: Rect) -> Option<LatLng> {
        if area.width <= 2 || area.height <= 2 {
            return None;
        }
        let inner_x = area.x + 1;
        let inner_y = area.y + 1;
        let inner_w = area.width - 2;
        let inner_h = area.height - 2;
        if column < inner_x || column >= inner_x + inner_w || row < inner_y || row >= inner_y + inner_h
        {
            return None;
        }

        let fx = (f64::from(column - inner_x) + 0.5) / f64::from(inner_w);
        let fy = (f64::from(row - inner_y) + 0.5) / f64::from(inner_h);
        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        Some(LatLng {
            lat: y1 - fy * (y1 - y0),
            lng: x0 + fx * (x1 - x0),
        })
    }
}

fn draw_outline(
    ctx: &mut ratatui::widgets::canvas::Context<'_>,
    poly: &BuildingPolygon,
    color: Color,
) {
    for window in poly.ring.windows(2) {
        let a = window[0];
        let b = window[1];
        ctx.draw(&Line {
            x1: a.lng,
            y1: a.lat,
            x2: b.lng,
            y2: b.lat,
            color,
        });
    }
    if let (Some(first), Some(last)) = (poly.ring.first(), poly.ring.last()) {
        ctx.draw(&Line {
            x1: last.lng,
            y1: last.lat,
            x2: first.lng,
            y2: first.lat,
            color,
        });
    }
}

/// Interior dots standing in for fill, denser for more opaque styles.
fn draw_fill(
    ctx: &mut ratatui::widgets::canvas::Context<'_>,
    poly: &BuildingPolygon,
    color: Color,
) {
    if poly.style.fill_opacity <= 0.0 {
        return;
    }
    let Some(rect) = poly.shape.bounding_rect() else {
        return;
    };
    let steps = 3 + (poly.style.fill_opacity * 5.0) as usize;

    let mut dots: Vec<(f64, f64)> = Vec::new();
    for i in 0..steps {
        for j in 0..steps {
            let x = rect.min().x + rect.width() * (i as f64 + 0.5) / steps as f64;
            let y = rect.min().y + rect.height() * (j as f64 + 0.5) / steps as f64;
            if poly.shape.contains(&Point::new(x, y)) {
                dots.push((x, y));
            }
        }
    }
    ctx.draw(&Points {
        coords: &dots,
        color,
    });
}

/// Expands a coordinate span so outlines do not touch the frame.
fn pad(bounds: [f64; 2]) -> [f64; 2] {
    let [min, max] = bounds;
    let span = max - min;
    // degenerate spans still get a visible window, about a city block
    let margin = if span > 0.0 { span * 0.1 } else { 0.001 };
    [min - margin, max + margin]
}
