use unicode_segmentation::UnicodeSegmentation;

use crate::renderer::FrameBuffer;

/// CPU rasterizer for the storyboard shape set.
///
/// Everything draws with alpha blending so layer opacity (fades) and
/// translucent fills both work on the same path.
pub struct Compositor;

impl Compositor {
    /// Scale a color's alpha by a layer opacity in 0..=1.
    pub fn with_opacity(color: [u8; 4], opacity: f32) -> [u8; 4] {
        let a = (color[3] as f32 * opacity.clamp(0.0, 1.0)) as u8;
        [color[0], color[1], color[2], a]
    }

    /// Signed distance to a rounded-rectangle boundary centered at origin.
    fn rounded_rect_sdf(dx: f32, dy: f32, half_w: f32, half_h: f32, radius: f32) -> f32 {
        let r = radius.min(half_w).min(half_h);
        let qx = dx.abs() - (half_w - r);
        let qy = dy.abs() - (half_h - r);
        let ox = qx.max(0.0);
        let oy = qy.max(0.0);
        (ox * ox + oy * oy).sqrt() + qx.max(qy).min(0.0) - r
    }

    /// Fill a (possibly rounded) rectangle centered at (cx, cy)
    pub fn fill_rect(
        buffer: &mut FrameBuffer,
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
        color: [u8; 4],
    ) {
        if color[3] == 0 {
            return;
        }
        let (bw, bh) = buffer.dimensions();
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        let x0 = ((cx - half_w).floor().max(0.0)) as u32;
        let x1 = ((cx + half_w).ceil().min(bw as f32)) as u32;
        let y0 = ((cy - half_h).floor().max(0.0)) as u32;
        let y1 = ((cy + half_h).ceil().min(bh as f32)) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if Self::rounded_rect_sdf(dx, dy, half_w, half_h, corner_radius) <= 0.0 {
                    buffer.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Outline a (possibly rounded) rectangle centered at (cx, cy)
    pub fn stroke_rect(
        buffer: &mut FrameBuffer,
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
        stroke_width: f32,
        color: [u8; 4],
    ) {
        if color[3] == 0 {
            return;
        }
        let (bw, bh) = buffer.dimensions();
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        let pad = stroke_width / 2.0 + 1.0;
        let x0 = ((cx - half_w - pad).floor().max(0.0)) as u32;
        let x1 = ((cx + half_w + pad).ceil().min(bw as f32)) as u32;
        let y0 = ((cy - half_h - pad).floor().max(0.0)) as u32;
        let y1 = ((cy + half_h + pad).ceil().min(bh as f32)) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let d = Self::rounded_rect_sdf(dx, dy, half_w, half_h, corner_radius);
                if d.abs() <= stroke_width / 2.0 {
                    buffer.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Fill a circle centered at (cx, cy)
    pub fn fill_circle(buffer: &mut FrameBuffer, cx: f32, cy: f32, radius: f32, color: [u8; 4]) {
        if color[3] == 0 {
            return;
        }
        let (bw, bh) = buffer.dimensions();
        let x0 = ((cx - radius).floor().max(0.0)) as u32;
        let x1 = ((cx + radius).ceil().min(bw as f32)) as u32;
        let y0 = ((cy - radius).floor().max(0.0)) as u32;
        let y1 = ((cy + radius).ceil().min(bh as f32)) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    buffer.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Outline a circle centered at (cx, cy)
    pub fn stroke_circle(
        buffer: &mut FrameBuffer,
        cx: f32,
        cy: f32,
        radius: f32,
        stroke_width: f32,
        color: [u8; 4],
    ) {
        if color[3] == 0 {
            return;
        }
        let (bw, bh) = buffer.dimensions();
        let reach = radius + stroke_width / 2.0 + 1.0;
        let x0 = ((cx - reach).floor().max(0.0)) as u32;
        let x1 = ((cx + reach).ceil().min(bw as f32)) as u32;
        let y0 = ((cy - reach).floor().max(0.0)) as u32;
        let y1 = ((cy + reach).ceil().min(bh as f32)) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt() - radius;
                if d.abs() <= stroke_width / 2.0 {
                    buffer.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Draw a line segment by stamping discs along it. Widths under ~1.5px
    /// fall back to single pixels so hairlines stay hairlines.
    pub fn draw_line(
        buffer: &mut FrameBuffer,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        color: [u8; 4],
    ) {
        if color[3] == 0 {
            return;
        }
        let dx = x1 - x0;
        let dy = y1 - y0;
        let length_sq = dx * dx + dy * dy;
        let length = length_sq.sqrt();

        if width <= 1.5 {
            let steps = (length / 0.5).ceil().max(1.0) as u32;
            let mut last: Option<(u32, u32)> = None;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let px = (x0 + dx * t).round();
                let py = (y0 + dy * t).round();
                if px < 0.0 || py < 0.0 {
                    continue;
                }
                let p = (px as u32, py as u32);
                // Avoid double-blending the same pixel along shallow slopes
                if last != Some(p) {
                    buffer.blend_pixel(p.0, p.1, color);
                    last = Some(p);
                }
            }
            return;
        }

        // Wide lines blend each covered pixel exactly once so translucent
        // strokes do not over-darken where stamps would overlap.
        let (bw, bh) = buffer.dimensions();
        let half = width / 2.0;
        let min_x = ((x0.min(x1) - half).floor().max(0.0)) as u32;
        let max_x = ((x0.max(x1) + half).ceil().min(bw as f32)) as u32;
        let min_y = ((y0.min(y1) - half).floor().max(0.0)) as u32;
        let max_y = ((y0.max(y1) + half).ceil().min(bh as f32)) as u32;

        for py in min_y..max_y {
            for px in min_x..max_x {
                let fx = px as f32 + 0.5;
                let fy = py as f32 + 0.5;
                let t = if length_sq > f32::EPSILON {
                    (((fx - x0) * dx + (fy - y0) * dy) / length_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let ex = x0 + dx * t - fx;
                let ey = y0 + dy * t - fy;
                if ex * ex + ey * ey <= half * half {
                    buffer.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Draw a dashed line: `dash` pixels on, `dash` pixels off.
    pub fn draw_dashed_line(
        buffer: &mut FrameBuffer,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        dash: f32,
        color: [u8; 4],
    ) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON || dash <= 0.0 {
            Self::draw_line(buffer, x0, y0, x1, y1, width, color);
            return;
        }
        let mut pos = 0.0;
        let mut on = true;
        while pos < length {
            let seg_end = (pos + dash).min(length);
            if on {
                let t0 = pos / length;
                let t1 = seg_end / length;
                Self::draw_line(
                    buffer,
                    x0 + dx * t0,
                    y0 + dy * t0,
                    x0 + dx * t1,
                    y0 + dy * t1,
                    width,
                    color,
                );
            }
            pos = seg_end;
            on = !on;
        }
    }

    /// Draw an arrow: shaft plus a filled triangular head at the tip.
    pub fn draw_arrow(
        buffer: &mut FrameBuffer,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        color: [u8; 4],
    ) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            return;
        }
        let head = (width * 4.0).max(8.0).min(length * 0.4);
        let ux = dx / length;
        let uy = dy / length;
        // Shaft stops where the head begins
        let bx = x1 - ux * head;
        let by = y1 - uy * head;
        Self::draw_line(buffer, x0, y0, bx, by, width, color);

        // Head as a fan of lines from the tip to the base edge
        let half = head * 0.5;
        let (px, py) = (-uy, ux);
        let base_l = (bx + px * half, by + py * half);
        let base_r = (bx - px * half, by - py * half);
        let fan = 8;
        for i in 0..=fan {
            let t = i as f32 / fan as f32;
            let ex = base_l.0 + (base_r.0 - base_l.0) * t;
            let ey = base_l.1 + (base_r.1 - base_l.1) * t;
            Self::draw_line(buffer, x1, y1, ex, ey, width.max(1.0), color);
        }
    }

    /// Draw connected segments through the given points.
    pub fn draw_polyline(buffer: &mut FrameBuffer, points: &[(f32, f32)], width: f32, color: [u8; 4]) {
        for pair in points.windows(2) {
            Self::draw_line(
                buffer, pair[0].0, pair[0].1, pair[1].0, pair[1].1, width, color,
            );
        }
    }

    /// Draw a full-frame grid with lines every `spacing` pixels out from the
    /// frame center, the background plane of the clock scenes.
    pub fn draw_grid(buffer: &mut FrameBuffer, spacing: f32, width: f32, color: [u8; 4]) {
        if spacing < 1.0 {
            return;
        }
        let (bw, bh) = buffer.dimensions();
        let cx = bw as f32 / 2.0;
        let cy = bh as f32 / 2.0;

        let mut x = cx % spacing;
        while x < bw as f32 {
            Self::draw_line(buffer, x, 0.0, x, bh as f32 - 1.0, width, color);
            x += spacing;
        }
        let mut y = cy % spacing;
        while y < bh as f32 {
            Self::draw_line(buffer, 0.0, y, bw as f32 - 1.0, y, width, color);
            y += spacing;
        }
    }

    /// Draw text as placeholder glyph blocks, one cell per grapheme. Real
    /// typography belongs to the external-engine backend; this keeps native
    /// frames layout-accurate.
    pub fn draw_text(
        buffer: &mut FrameBuffer,
        text: &str,
        cx: f32,
        cy: f32,
        size: f32,
        color: [u8; 4],
    ) {
        let graphemes: Vec<&str> = text.graphemes(true).collect();
        if graphemes.is_empty() {
            return;
        }
        let cell_w = size * 0.5;
        let gap = size * 0.12;
        let advance = cell_w + gap;
        let total = advance * graphemes.len() as f32 - gap;
        let mut x = cx - total / 2.0 + cell_w / 2.0;

        for grapheme in graphemes {
            if !grapheme.trim().is_empty() {
                Self::fill_rect(buffer, x, cy, cell_w, size * 0.72, size * 0.1, color);
            }
            x += advance;
        }
    }

    /// Measured width in pixels of placeholder text at the given size.
    pub fn text_width(text: &str, size: f32) -> f32 {
        let n = text.graphemes(true).count() as f32;
        if n == 0.0 {
            return 0.0;
        }
        let cell_w = size * 0.5;
        let gap = size * 0.12;
        n * (cell_w + gap) - gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_centered() {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear([0, 0, 0, 255]);
        Compositor::fill_rect(&mut fb, 50.0, 50.0, 20.0, 20.0, 0.0, [255, 0, 0, 255]);

        assert_eq!(fb.get_pixel(50, 50), Some([255, 0, 0, 255]));
        assert_eq!(fb.get_pixel(42, 50), Some([255, 0, 0, 255]));
        assert_eq!(fb.get_pixel(30, 50), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_rounded_corner_is_cut() {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear([0, 0, 0, 255]);
        Compositor::fill_rect(&mut fb, 50.0, 50.0, 40.0, 40.0, 15.0, [255, 255, 255, 255]);

        // The extreme corner pixel lies outside the rounding radius
        assert_eq!(fb.get_pixel(31, 31), Some([0, 0, 0, 255]));
        // The center and edge midpoints are filled
        assert_eq!(fb.get_pixel(50, 50), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(31, 50), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_fill_circle() {
        let mut fb = FrameBuffer::new(60, 60);
        fb.clear([0, 0, 0, 255]);
        Compositor::fill_circle(&mut fb, 30.0, 30.0, 10.0, [0, 255, 0, 255]);
        assert_eq!(fb.get_pixel(30, 30), Some([0, 255, 0, 255]));
        assert_eq!(fb.get_pixel(30, 22), Some([0, 255, 0, 255]));
        assert_eq!(fb.get_pixel(30, 15), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_stroke_circle_leaves_center_empty() {
        let mut fb = FrameBuffer::new(60, 60);
        fb.clear([0, 0, 0, 255]);
        Compositor::stroke_circle(&mut fb, 30.0, 30.0, 12.0, 2.0, [0, 0, 255, 255]);
        assert_eq!(fb.get_pixel(30, 30), Some([0, 0, 0, 255]));
        assert_eq!(fb.get_pixel(42, 30), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_horizontal_line() {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear([0, 0, 0, 255]);
        Compositor::draw_line(&mut fb, 10.0, 50.0, 90.0, 50.0, 1.0, [255, 255, 0, 255]);
        assert_eq!(fb.get_pixel(50, 50), Some([255, 255, 0, 255]));
        assert_eq!(fb.get_pixel(50, 55), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_dashed_line_has_gaps() {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear([0, 0, 0, 255]);
        Compositor::draw_dashed_line(&mut fb, 0.0, 50.0, 99.0, 50.0, 1.0, 10.0, [255, 0, 0, 255]);
        let lit = (0..100)
            .filter(|&x| fb.get_pixel(x, 50) == Some([255, 0, 0, 255]))
            .count();
        assert!(lit > 30 && lit < 70, "roughly half the pixels lit, got {lit}");
    }

    #[test]
    fn test_text_blocks_scale_with_content() {
        let mut fb = FrameBuffer::new(200, 60);
        fb.clear([0, 0, 0, 255]);
        Compositor::draw_text(&mut fb, "abc", 100.0, 30.0, 16.0, [255, 255, 255, 255]);
        let short: usize = (0..200)
            .filter(|&x| fb.get_pixel(x, 30) != Some([0, 0, 0, 255]))
            .count();

        fb.clear([0, 0, 0, 255]);
        Compositor::draw_text(&mut fb, "abcdef", 100.0, 30.0, 16.0, [255, 255, 255, 255]);
        let long: usize = (0..200)
            .filter(|&x| fb.get_pixel(x, 30) != Some([0, 0, 0, 255]))
            .count();

        assert!(long > short);
        assert!(Compositor::text_width("abcdef", 16.0) > Compositor::text_width("abc", 16.0));
    }

    #[test]
    fn test_with_opacity() {
        assert_eq!(Compositor::with_opacity([10, 20, 30, 200], 0.5), [10, 20, 30, 100]);
        assert_eq!(Compositor::with_opacity([10, 20, 30, 200], 0.0)[3], 0);
        assert_eq!(Compositor::with_opacity([10, 20, 30, 200], 2.0)[3], 200);
    }

    #[test]
    fn test_grid_lines_on_spacing() {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear([0, 0, 0, 255]);
        Compositor::draw_grid(&mut fb, 25.0, 1.0, [80, 80, 80, 255]);
        // Center lines pass through 50,50
        assert_eq!(fb.get_pixel(50, 50), Some([80, 80, 80, 255]));
        assert_eq!(fb.get_pixel(50, 62), Some([80, 80, 80, 255]));
    }
}
