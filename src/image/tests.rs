use std::f32::consts::FRAC_PI_2;

use nalgebra::Point2;

use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let mut image = Image::new(W as u32, H as u32);
    for (y, row) in data.iter().enumerate() {
        for (x, color) in row.iter().enumerate() {
            image.set(x as u32, y as u32, *color);
        }
    }
    image
}

#[test]
fn blend() {
    let mut image = mkimage([[C::RED]]);
    let overlay = mkimage([[C::GREEN.with_alpha(0)]]);
    image.blend_from(&overlay).mode(BlendMode::Alpha);
    assert_eq!(image.get(0, 0), C::RED); // no change

    let mut image = mkimage([[C::RED]]);
    let overlay = mkimage([[C::GREEN.with_alpha(0)]]);
    image.blend_from(&overlay).mode(BlendMode::Overwrite);
    assert_eq!(image.get(0, 0), C::GREEN.with_alpha(0)); // overwrite blending

    let mut image = mkimage([[C::RED]]);
    let overlay = mkimage([[C::GREEN]]);
    image.blend_from(&overlay).mode(BlendMode::Alpha);
    assert_eq!(image.get(0, 0), C::GREEN); // alpha overwrite

    let mut image = mkimage([[C::RED]]);
    let overlay = mkimage([[C::from_rgb8(127, 0, 100)]]);
    image.blend_from(&overlay).mode(BlendMode::Multiply);
    assert_eq!(image.get(0, 0), C::from_rgb8(127, 0, 0));
}

#[test]
fn half_transparent_alpha_blend() {
    let mut image = mkimage([[C::BLACK]]);
    let overlay = mkimage([[C::WHITE.with_alpha(128)]]);
    image.blend_from(&overlay);
    let pix = image.get(0, 0);
    assert_eq!(pix.a(), 255);
    // Blending happens in linear space, so half-covered white is brighter than 128.
    assert!(pix.r() > 160 && pix.r() < 200, "{pix:?}");
    assert_eq!(pix.r(), pix.g());
    assert_eq!(pix.g(), pix.b());
}

#[test]
fn multiply_keeps_destination_alpha() {
    let mut image = mkimage([[C::NULL, C::WHITE]]);
    let tint = Image::filled(1, 1, C::from_rgb8(100, 150, 255).with_alpha(51));
    image.blend_from(&tint).mode(BlendMode::Multiply);

    assert_eq!(image.get(0, 0), C::NULL);
    let tinted = image.get(1, 0);
    assert_eq!(tinted.a(), 255);
    assert_eq!(tinted.r(), 224); // 255 + (100 - 255) * 0.2
    assert_eq!(tinted.g(), 234);
    assert_eq!(tinted.b(), 255);
}

#[test]
fn blend_into_target_rect() {
    let mut image = Image::filled(4, 4, C::BLACK);
    let red = Image::filled(1, 1, C::RED);
    image
        .blend_from(&red)
        .target(Rect::from_top_left(1.0, 1.0, 2.0, 2.0));

    for y in 0..4 {
        for x in 0..4 {
            let inside = (1..3).contains(&x) && (1..3).contains(&y);
            let expected = if inside { C::RED } else { C::BLACK };
            assert_eq!(image.get(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn blend_target_outside_image() {
    let mut image = Image::filled(2, 2, C::BLACK);
    let red = Image::filled(1, 1, C::RED);
    image
        .blend_from(&red)
        .target(Rect::from_top_left(-10.0, -10.0, 5.0, 5.0));
    assert!(image.pixels().all(|pix| pix == C::BLACK));

    image
        .blend_from(&red)
        .target(Rect::from_top_left(1.0, -5.0, 10.0, 6.0));
    assert_eq!(image.get(0, 0), C::BLACK);
    assert_eq!(image.get(1, 0), C::RED);
    assert_eq!(image.get(1, 1), C::BLACK);
}

#[test]
fn rotated_blend() {
    // A 4x2 bar centered in a 6x6 image, rotated by 90° becomes a 2x4 bar.
    let mut image = Image::filled(6, 6, C::BLACK);
    let bar = mkimage([[C::RED, C::RED, C::GREEN, C::GREEN]]);
    image
        .blend_from(&bar)
        .target(Rect::from_center(3.0, 3.0, 4.0, 2.0))
        .rotate(FRAC_PI_2, Some(Point2::new(3.0, 3.0)));

    for y in 0..6 {
        for x in 0..6 {
            let expected = match (x, y) {
                (2 | 3, 1 | 2) => C::RED,
                (2 | 3, 3 | 4) => C::GREEN,
                _ => C::BLACK,
            };
            assert_eq!(image.get(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn resize_and_crop() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    let big = image.resized(Resolution::new(4, 4));
    assert_eq!(big.get(0, 0), C::RED);
    assert_eq!(big.get(1, 1), C::RED);
    assert_eq!(big.get(3, 0), C::GREEN);
    assert_eq!(big.get(0, 3), C::BLUE);
    assert_eq!(big.get(2, 2), C::WHITE);

    let crop = big.crop(Rect::from_top_left(1.0, 1.0, 2.0, 2.0)).unwrap();
    assert_eq!(crop.resolution(), Resolution::new(2, 2));
    assert_eq!(crop.get(0, 0), C::RED);
    assert_eq!(crop.get(1, 1), C::WHITE);

    let clipped = big.crop(Rect::from_top_left(3.0, 3.0, 10.0, 10.0)).unwrap();
    assert_eq!(clipped.resolution(), Resolution::new(1, 1));
    assert!(big.crop(Rect::from_top_left(5.0, 5.0, 1.0, 1.0)).is_none());
}

#[test]
fn mirror() {
    let mut image = mkimage([[C::RED, C::GREEN]]);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), C::GREEN);
    assert_eq!(image.get(1, 0), C::RED);
}

#[test]
fn unsupported_extension() {
    assert!(matches!(
        Image::load("overlay.gif"),
        Err(AssetError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        Image::load("/nonexistent/overlay.png"),
        Err(AssetError::Io { .. })
    ));
}
