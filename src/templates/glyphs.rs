//! Procedural glyph and suit-shape rasterization
//!
//! Templates are synthesized from embedded stroke tables and filled suit
//! shapes rather than TTF fonts, so generation is byte-deterministic and the
//! crate ships no binary assets. The three stroke faces stand in for font
//! faces: the same tables drawn plain, narrowed, or slanted.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::cards::{Rank, Suit};

/// Stroke-style variant applied to the glyph tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Face {
    Plain,
    Narrow,
    Slant,
}

impl Face {
    pub(crate) const ALL: [Face; 3] = [Face::Plain, Face::Narrow, Face::Slant];

    /// Map a point in the unit glyph box through this face's transform.
    fn apply(self, (x, y): (f32, f32)) -> (f32, f32) {
        match self {
            Face::Plain => (x, y),
            Face::Narrow => (x * 0.72 + 0.14, y),
            Face::Slant => (x * 0.85 + 0.18 * (1.0 - y), y),
        }
    }
}

/// Polylines for one glyph, in a unit box (x right, y down).
type Strokes = &'static [&'static [(f32, f32)]];

const S_0: Strokes = &[&[
    (0.32, 0.0),
    (0.68, 0.0),
    (0.95, 0.22),
    (0.95, 0.78),
    (0.68, 1.0),
    (0.32, 1.0),
    (0.05, 0.78),
    (0.05, 0.22),
    (0.32, 0.0),
]];
const S_1: Strokes = &[
    &[(0.22, 0.18), (0.52, 0.0), (0.52, 1.0)],
    &[(0.25, 1.0), (0.8, 1.0)],
];
const S_2: Strokes = &[&[
    (0.08, 0.22),
    (0.3, 0.0),
    (0.72, 0.0),
    (0.92, 0.22),
    (0.88, 0.45),
    (0.08, 1.0),
    (0.95, 1.0),
]];
const S_3: Strokes = &[
    &[(0.1, 0.08), (0.5, 0.0), (0.88, 0.18), (0.5, 0.44)],
    &[(0.5, 0.44), (0.93, 0.65), (0.6, 1.0), (0.12, 0.9)],
];
const S_4: Strokes = &[
    &[(0.68, 0.0), (0.08, 0.6), (0.95, 0.6)],
    &[(0.68, 0.2), (0.68, 1.0)],
];
const S_5: Strokes = &[&[
    (0.88, 0.0),
    (0.15, 0.0),
    (0.1, 0.42),
    (0.6, 0.38),
    (0.92, 0.6),
    (0.88, 0.82),
    (0.6, 1.0),
    (0.1, 0.92),
]];
const S_6: Strokes = &[&[
    (0.8, 0.0),
    (0.35, 0.12),
    (0.1, 0.45),
    (0.08, 0.75),
    (0.35, 1.0),
    (0.68, 1.0),
    (0.9, 0.78),
    (0.85, 0.56),
    (0.55, 0.45),
    (0.12, 0.55),
]];
const S_7: Strokes = &[&[(0.05, 0.0), (0.95, 0.0), (0.4, 1.0)]];
const S_8: Strokes = &[
    &[
        (0.5, 0.0),
        (0.85, 0.12),
        (0.85, 0.32),
        (0.5, 0.46),
        (0.15, 0.32),
        (0.15, 0.12),
        (0.5, 0.0),
    ],
    &[
        (0.5, 0.46),
        (0.92, 0.6),
        (0.92, 0.85),
        (0.5, 1.0),
        (0.08, 0.85),
        (0.08, 0.6),
        (0.5, 0.46),
    ],
];
const S_9: Strokes = &[&[
    (0.2, 1.0),
    (0.65, 0.88),
    (0.9, 0.55),
    (0.92, 0.25),
    (0.65, 0.0),
    (0.32, 0.0),
    (0.1, 0.22),
    (0.15, 0.44),
    (0.45, 0.55),
    (0.88, 0.45),
]];
const S_J: Strokes = &[
    &[(0.3, 0.0), (0.95, 0.0)],
    &[(0.65, 0.0), (0.65, 0.78), (0.42, 1.0), (0.1, 0.88)],
];
const S_Q: Strokes = &[
    &[
        (0.32, 0.0),
        (0.68, 0.0),
        (0.95, 0.22),
        (0.95, 0.78),
        (0.68, 1.0),
        (0.32, 1.0),
        (0.05, 0.78),
        (0.05, 0.22),
        (0.32, 0.0),
    ],
    &[(0.6, 0.68), (0.98, 1.0)],
];
const S_K: Strokes = &[
    &[(0.15, 0.0), (0.15, 1.0)],
    &[(0.9, 0.0), (0.15, 0.55)],
    &[(0.42, 0.42), (0.95, 1.0)],
];
const S_A: Strokes = &[
    &[(0.02, 1.0), (0.5, 0.0), (0.98, 1.0)],
    &[(0.22, 0.62), (0.78, 0.62)],
];

fn char_strokes(c: char) -> Option<Strokes> {
    match c {
        '0' => Some(S_0),
        '1' => Some(S_1),
        '2' => Some(S_2),
        '3' => Some(S_3),
        '4' => Some(S_4),
        '5' => Some(S_5),
        '6' => Some(S_6),
        '7' => Some(S_7),
        '8' => Some(S_8),
        '9' => Some(S_9),
        'J' => Some(S_J),
        'Q' => Some(S_Q),
        'K' => Some(S_K),
        'A' => Some(S_A),
        _ => None,
    }
}

/// Plausible on-screen colors per suit, primary first. Alternates cover
/// different client skins (four-color decks included).
pub(crate) fn suit_palette(suit: Suit) -> &'static [Rgb<u8>] {
    match suit {
        Suit::Spades => &[Rgb([15, 15, 20]), Rgb([70, 70, 80])],
        Suit::Hearts => &[Rgb([200, 30, 30]), Rgb([230, 20, 60]), Rgb([150, 25, 45])],
        Suit::Diamonds => &[Rgb([205, 35, 35]), Rgb([30, 70, 200]), Rgb([220, 90, 30])],
        Suit::Clubs => &[Rgb([15, 15, 20]), Rgb([25, 115, 50])],
    }
}

/// Draw one stroke segment with the requested weight.
fn draw_stroke(
    canvas: &mut RgbImage,
    (x0, y0): (f32, f32),
    (x1, y1): (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    if thickness <= 1 {
        draw_line_segment_mut(canvas, (x0, y0), (x1, y1), color);
        return;
    }
    // Stamp circles along the segment; half-pixel steps close any gaps.
    let length = (x1 - x0).hypot(y1 - y0);
    let steps = ((length * 2.0).ceil() as i32).max(1);
    let radius = (thickness - 1) as i32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let cx = x0 + (x1 - x0) * t;
        let cy = y0 + (y1 - y0) * t;
        draw_filled_circle_mut(canvas, (cx.round() as i32, cy.round() as i32), radius, color);
    }
}

/// Draw one glyph character into a box of `height` px at `origin`.
fn draw_glyph_char(
    canvas: &mut RgbImage,
    c: char,
    origin: (f32, f32),
    height: f32,
    face: Face,
    thickness: u32,
    color: Rgb<u8>,
) {
    let Some(strokes) = char_strokes(c) else {
        return;
    };
    let char_width = height * 0.62;
    for polyline in strokes {
        for pair in polyline.windows(2) {
            let (ax, ay) = face.apply(pair[0]);
            let (bx, by) = face.apply(pair[1]);
            draw_stroke(
                canvas,
                (origin.0 + ax * char_width, origin.1 + ay * height),
                (origin.0 + bx * char_width, origin.1 + by * height),
                thickness,
                color,
            );
        }
    }
}

/// Width in px of a glyph string at the given height.
fn glyph_text_width(text: &str, height: u32) -> u32 {
    let chars = text.chars().count().max(1) as u32;
    let char_width = (height as f32 * 0.62).ceil() as u32;
    let gap = (height / 8).max(1);
    chars * char_width + (chars - 1) * gap
}

/// Rasterize a rank glyph string (e.g. `"K"` or `"10"`) as a grayscale
/// template: dark ink on a light ground, or the inverse.
pub(crate) fn render_glyph_text(
    text: &str,
    height: u32,
    face: Face,
    thickness: u32,
    inverted: bool,
) -> GrayImage {
    let pad = thickness + 2;
    let width = glyph_text_width(text, height) + 2 * pad;
    let canvas_height = height + 2 * pad;
    let mut canvas = RgbImage::from_pixel(width, canvas_height, Rgb([255, 255, 255]));

    let char_width = (height as f32 * 0.62).ceil();
    let gap = (height / 8).max(1) as f32;
    let mut x = pad as f32;
    for c in text.chars() {
        draw_glyph_char(
            &mut canvas,
            c,
            (x, pad as f32),
            height as f32,
            face,
            thickness,
            Rgb([0, 0, 0]),
        );
        x += char_width + gap;
    }

    let mut gray = DynamicImage::ImageRgb8(canvas).to_luma8();
    if inverted {
        image::imageops::invert(&mut gray);
    }
    gray
}

/// Draw a filled polygon mapped from unit coordinates; degenerate point
/// lists (after rounding) are skipped.
fn draw_unit_polygon(
    canvas: &mut RgbImage,
    points: &[(f32, f32)],
    map: impl Fn((f32, f32)) -> (i32, i32),
    color: Rgb<u8>,
) {
    let mut mapped: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &p in points {
        let (x, y) = map(p);
        let point = Point::new(x, y);
        if mapped.last() != Some(&point) {
            mapped.push(point);
        }
    }
    if mapped.len() >= 3 && mapped.first() != mapped.last() {
        draw_polygon_mut(canvas, &mapped, color);
    }
}

/// Draw a filled suit shape into a box of `size` px at `origin`.
///
/// `weight` scales the silhouette around the box center, giving a regular
/// and a heavier template variant from the same shape.
pub(crate) fn draw_suit_shape(
    canvas: &mut RgbImage,
    suit: Suit,
    origin: (u32, u32),
    size: u32,
    color: Rgb<u8>,
    weight: f32,
) {
    let s = size as f32;
    let map = |(x, y): (f32, f32)| -> (i32, i32) {
        let wx = 0.5 + (x - 0.5) * weight;
        let wy = 0.5 + (y - 0.5) * weight;
        (
            (origin.0 as f32 + wx * s).round() as i32,
            (origin.1 as f32 + wy * s).round() as i32,
        )
    };
    let circle = |canvas: &mut RgbImage, center: (f32, f32), radius: f32| {
        let (cx, cy) = map(center);
        let r = ((radius * s * weight).round() as i32).max(1);
        draw_filled_circle_mut(canvas, (cx, cy), r, color);
    };
    let stem = |canvas: &mut RgbImage, x0: f32, y0: f32, x1: f32, y1: f32| {
        let (left, top) = map((x0, y0));
        let (right, bottom) = map((x1, y1));
        let w = (right - left).max(1);
        let h = (bottom - top).max(1);
        draw_filled_rect_mut(canvas, Rect::at(left, top).of_size(w as u32, h as u32), color);
    };

    match suit {
        Suit::Diamonds => {
            draw_unit_polygon(
                canvas,
                &[(0.5, 0.0), (0.97, 0.5), (0.5, 1.0), (0.03, 0.5)],
                map,
                color,
            );
        }
        Suit::Hearts => {
            circle(canvas, (0.3, 0.3), 0.25);
            circle(canvas, (0.7, 0.3), 0.25);
            draw_unit_polygon(
                canvas,
                &[(0.06, 0.42), (0.94, 0.42), (0.5, 0.98)],
                map,
                color,
            );
        }
        Suit::Spades => {
            circle(canvas, (0.3, 0.58), 0.22);
            circle(canvas, (0.7, 0.58), 0.22);
            draw_unit_polygon(
                canvas,
                &[(0.08, 0.62), (0.92, 0.62), (0.5, 0.02)],
                map,
                color,
            );
            stem(canvas, 0.44, 0.7, 0.56, 0.98);
        }
        Suit::Clubs => {
            circle(canvas, (0.5, 0.3), 0.22);
            circle(canvas, (0.28, 0.58), 0.22);
            circle(canvas, (0.72, 0.58), 0.22);
            stem(canvas, 0.45, 0.6, 0.55, 0.98);
        }
    }
}

/// Rasterize a suit glyph as a grayscale template, colored per skin palette
/// before conversion so alternate colors land on distinct gray levels.
pub(crate) fn render_suit_glyph(suit: Suit, size: u32, color: Rgb<u8>, weight: f32) -> GrayImage {
    let pad = 2;
    let side = size + 2 * pad;
    let mut canvas = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
    draw_suit_shape(&mut canvas, suit, (pad, pad), size, color, weight);
    DynamicImage::ImageRgb8(canvas).to_luma8()
}

/// Render a synthetic card face: rank glyph top-left with the suit below
/// it, on a uniform ground of the given brightness.
///
/// This is the sample generator used by the self-test command and the
/// integration tests; it shares the shape code with template generation so
/// output stays representative of what the matcher was built for.
pub fn render_card_sample(
    rank: Rank,
    suit: Suit,
    width: u32,
    height: u32,
    background: u8,
) -> DynamicImage {
    let width = width.max(16);
    let height = height.max(22);
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([background; 3]));

    let glyph_height = ((height as f32 * 0.28).round() as u32).max(8);
    let thickness = if glyph_height >= 24 { 2 } else { 1 };
    draw_glyph_char_string(
        &mut canvas,
        rank.glyph_text(),
        (width as f32 * 0.06, height as f32 * 0.05),
        glyph_height,
        thickness,
    );

    let suit_size = ((height as f32 * 0.18).round() as u32).max(6);
    draw_suit_shape(
        &mut canvas,
        suit,
        (
            (width as f32 * 0.06).round() as u32,
            (height as f32 * 0.36).round() as u32,
        ),
        suit_size,
        suit_palette(suit)[0],
        1.0,
    );

    DynamicImage::ImageRgb8(canvas)
}

fn draw_glyph_char_string(
    canvas: &mut RgbImage,
    text: &str,
    origin: (f32, f32),
    height: u32,
    thickness: u32,
) {
    let char_width = (height as f32 * 0.62).ceil();
    let gap = (height / 8).max(1) as f32;
    let mut x = origin.0;
    for c in text.chars() {
        draw_glyph_char(
            canvas,
            c,
            (x, origin.1),
            height as f32,
            Face::Plain,
            thickness,
            Rgb([20, 20, 20]),
        );
        x += char_width + gap;
    }
}
