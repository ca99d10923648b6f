use crate::braille::BrailleCanvas;
use glam::DVec2;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Round a pixel position, saturating far-away coordinates
fn to_pixel(p: DVec2) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

/// Pixel rows and columns of the canvas inside the circle's bounding box
fn visible_bounds(
    canvas: &BrailleCanvas,
    cx: i64,
    cy: i64,
    r: i64,
) -> Option<(i64, i64, i64, i64)> {
    let x0 = cx.saturating_sub(r).max(0);
    let y0 = cy.saturating_sub(r).max(0);
    let x1 = cx.saturating_add(r).min(canvas.pixel_width() as i64 - 1);
    let y1 = cy.saturating_add(r).min(canvas.pixel_height() as i64 - 1);
    (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
}

/// Visit every on-canvas pixel whose squared distance from the centre is
/// in `(inner2, outer2]`
fn fill_annulus(canvas: &mut BrailleCanvas, center: DVec2, radius: f64, inner2: f64) {
    let (cx, cy) = to_pixel(center);
    let r = radius.ceil() as i64;
    let outer2 = radius * radius;
    let Some((x0, y0, x1, y1)) = visible_bounds(canvas, cx, cy, r) else {
        return;
    };
    for y in y0..=y1 {
        let dy = (y - cy) as f64;
        for x in x0..=x1 {
            let dx = (x - cx) as f64;
            let d2 = dx * dx + dy * dy;
            if d2 <= outer2 && d2 > inner2 {
                canvas.set_pixel(x as usize, y as usize);
            }
        }
    }
}

/// Filled disc. Radii under half a dot draw nothing; a tiny bubble still
/// gets its centre dot.
pub fn draw_disc(canvas: &mut BrailleCanvas, center: DVec2, radius: f64) {
    if !(radius >= 0.5) || !center.is_finite() {
        return;
    }
    fill_annulus(canvas, center, radius, -1.0);
}

/// One-dot circle outline
pub fn draw_ring(canvas: &mut BrailleCanvas, center: DVec2, radius: f64) {
    if !(radius >= 0.5) || !center.is_finite() {
        return;
    }
    let inner = (radius - 1.0).max(0.0);
    fill_annulus(canvas, center, radius, if inner > 0.0 { inner * inner } else { -1.0 });
}
