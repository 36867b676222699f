use crate::grid::GridMap;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Colour for a demand value: blue below nominal capacity, fading to red at
/// `saturation`.
fn heat_color(value: f64, saturation: f64) -> Rgb<u8> {
    if value <= 1.0 {
        let t = value.clamp(0.0, 1.0);
        Rgb([20, (40.0 + 140.0 * t) as u8, (120.0 + 100.0 * t) as u8])
    } else {
        let t = ((value - 1.0) / (saturation - 1.0).max(1e-9)).clamp(0.0, 1.0);
        Rgb([(180.0 + 75.0 * t) as u8, (180.0 * (1.0 - t)) as u8, 40])
    }
}

/// Renders channel `channel` of `map` with row 0 at the bottom, matching
/// placement coordinates.
pub fn draw_heatmap(
    map: &GridMap,
    channel: usize,
    filename: &str,
    width: u32,
    height: u32,
) -> image::ImageResult<()> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    let (rows, cols) = map.dims();
    let scale_x = width as f64 / cols as f64;
    let scale_y = height as f64 / rows as f64;
    let saturation = map.channel(channel).iter().copied().fold(1.0, f64::max);

    for y in 0..rows {
        for x in 0..cols {
            let px = (x as f64 * scale_x) as i32;
            let py = (height as f64 - (y + 1) as f64 * scale_y) as i32;
            let w = scale_x.ceil().max(1.0) as u32;
            let h = scale_y.ceil().max(1.0) as u32;
            let color = heat_color(map.get(channel, y, x), saturation);
            draw_filled_rect_mut(&mut img, ImageRect::at(px, py).of_size(w, h), color);
        }
    }

    img.save(Path::new(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_cells_are_red_dominant() {
        let Rgb([r, g, b]) = heat_color(2.0, 2.0);
        assert!(r > g && r > b);
        let Rgb([r, _, b]) = heat_color(0.5, 2.0);
        assert!(b > r);
    }
}
