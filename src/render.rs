use ratatui::style::Color;
use ratatui::widgets::canvas::{Circle, Context, Line, Points};

use crate::snapshot::{Snapshot, AREA_SIZE};

/// Fraction of the viewport the simulation square may occupy, so the
/// drawing never touches the edge.
const MARGIN: f64 = 0.9;

const GATEWAY_RGB: (u8, u8, u8) = (0, 243, 255);
const FALLBACK_RGB: (u8, u8, u8) = (136, 146, 176);
const LINK_COLOR: Color = Color::Rgb(64, 64, 78);
const DEAD_MARK: Color = Color::White;

const NODE_RADIUS: f64 = 4.0;
const HEAD_RADIUS: f64 = 6.0;
const HEAD_RING_RADIUS: f64 = 8.0;
const HEAD_HALO_RADIUS: f64 = 12.0;
const GATEWAY_RADIUS: f64 = 8.0;
const DEAD_ARM: f64 = 3.0;

/// Pixel dimensions of the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Maps simulation space `[0, AREA_SIZE]²` onto the surface, scaled to fit
/// and centered. Surface coordinates grow downward; simulation `y` grows
/// upward, so `apply` inverts the vertical axis.
///
/// Holds no state beyond the fitted factors; rebuild it from the current
/// viewport before every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Transform {
    pub fn fit(view: Viewport) -> Self {
        let scale = (view.width / AREA_SIZE).min(view.height / AREA_SIZE) * MARGIN;
        Self {
            scale,
            offset_x: (view.width - AREA_SIZE * scale) / 2.0,
            offset_y: (view.height - AREA_SIZE * scale) / 2.0,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + x * self.scale,
            self.offset_y + (AREA_SIZE - y) * self.scale,
        )
    }

    /// Side length of the mapped simulation square, in surface pixels.
    pub fn side(&self) -> f64 {
        AREA_SIZE * self.scale
    }
}

/// Parses `#rrggbb` or `#rgb`.
pub fn hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    let expanded;
    let hex = match hex.len() {
        6 => hex,
        3 => {
            expanded = hex.chars().flat_map(|c| [c, c]).collect::<String>();
            expanded.as_str()
        }
        _ => return None,
    };
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some((
        ((v >> 16) & 0xff) as u8,
        ((v >> 8) & 0xff) as u8,
        (v & 0xff) as u8,
    ))
}

/// Approximates translucency on the dark background by scaling the
/// channels toward black.
fn dim((r, g, b): (u8, u8, u8), alpha: f64) -> Color {
    let alpha = alpha.clamp(0.0, 1.0);
    Color::Rgb(
        (r as f64 * alpha).round() as u8,
        (g as f64 * alpha).round() as u8,
        (b as f64 * alpha).round() as u8,
    )
}

fn fill_circle(ctx: &mut Context, cx: f64, cy: f64, radius: f64, color: Color) {
    let r = radius.ceil() as i32;
    let mut coords = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f64 <= radius * radius {
                coords.push((cx + dx as f64, cy + dy as f64));
            }
        }
    }
    ctx.draw(&Points {
        coords: &coords,
        color,
    });
}

/// Paints one complete frame: links, gateway, then nodes in snapshot
/// order. The canvas starts each frame empty, so every call is a full
/// redraw; all visual state comes from the snapshot and the transform.
pub fn paint(ctx: &mut Context, view: Viewport, snap: &Snapshot) {
    let transform = Transform::fit(view);
    // The canvas y axis grows upward; the transform's surface convention
    // grows downward. Flip once here.
    let project = |x: f64, y: f64| {
        let (sx, sy) = transform.apply(x, y);
        (sx, view.height - sy)
    };

    for link in &snap.links {
        let (x1, y1) = project(link.start[0], link.start[1]);
        let (x2, y2) = project(link.end[0], link.end[1]);
        ctx.draw(&Line {
            x1,
            y1,
            x2,
            y2,
            color: LINK_COLOR,
        });
    }

    let (gx, gy) = project(snap.gateway[0], snap.gateway[1]);
    for (extra, alpha) in [(6.0, 0.25), (3.0, 0.5)] {
        ctx.draw(&Circle {
            x: gx,
            y: gy,
            radius: GATEWAY_RADIUS + extra,
            color: dim(GATEWAY_RGB, alpha),
        });
    }
    fill_circle(ctx, gx, gy, GATEWAY_RADIUS, dim(GATEWAY_RGB, 1.0));

    for node in &snap.nodes {
        let (x, y) = project(node.x, node.y);
        let rgb = hex_color(&node.color).unwrap_or(FALLBACK_RGB);

        if node.is_head {
            fill_circle(ctx, x, y, HEAD_HALO_RADIUS, dim(rgb, 0.2));
            ctx.draw(&Circle {
                x,
                y,
                radius: HEAD_RING_RADIUS,
                color: dim(rgb, 1.0),
            });
        }

        let radius = if node.is_head { HEAD_RADIUS } else { NODE_RADIUS };
        fill_circle(ctx, x, y, radius, dim(rgb, 1.0));

        if node.dead {
            ctx.draw(&Line {
                x1: x - DEAD_ARM,
                y1: y - DEAD_ARM,
                x2: x + DEAD_ARM,
                y2: y + DEAD_ARM,
                color: DEAD_MARK,
            });
            ctx.draw(&Line {
                x1: x - DEAD_ARM,
                y1: y + DEAD_ARM,
                x2: x + DEAD_ARM,
                y2: y - DEAD_ARM,
                color: DEAD_MARK,
            });
        }
    }
}
