//! Database and elastic searches on synthetic scenes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stachematch::classify::{classify_image, classify_matches, Category, Expectation};
use stachematch::image::resize::resize_bilinear;
use stachematch::{
    elastic_search, Database, Point, RasterImage, SearchConfig, Target, Template,
};

/// Position tolerance in pixels of the unscaled image.
const POSITION_TOLERANCE_PX: f64 = 4.0;

const PATCH: usize = 30;

/// A smooth bright pattern that stands out from a dim noisy background.
fn pattern_value(x: usize, y: usize) -> f32 {
    let (fx, fy) = (x as f32, y as f32);
    0.6 + 0.35 * (fx / 3.0).sin() * (fy / 4.0).cos()
}

/// A `width x height` scene with the pattern's top-left corner at `(x0, y0)`.
fn scene(width: usize, height: usize, x0: usize, y0: usize, seed: u64) -> RasterImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data: Vec<f32> = (0..width * height)
        .map(|_| rng.random_range(0.0..0.2))
        .collect();
    for y in 0..PATCH {
        for x in 0..PATCH {
            data[(y0 + y) * width + x0 + x] = pattern_value(x, y);
        }
    }
    RasterImage::new(data, width, height).unwrap()
}

fn pattern_db(strictness: f64) -> Database {
    let data = (0..PATCH * PATCH)
        .map(|i| pattern_value(i % PATCH, i / PATCH))
        .collect();
    let image = RasterImage::new(data, PATCH, PATCH).unwrap();
    let target = Target {
        center: Point::new(15.0, 20.0),
        angle_deg: 4.0,
        width: 24.0,
    };
    let mut db = Database::new(strictness).unwrap();
    db.add_template(Template::new(image, target, "pattern")).unwrap();
    db
}

#[test]
fn database_search_finds_embedded_pattern() {
    let image = scene(160, 120, 70, 40, 1);
    let db = pattern_db(0.95);
    let matches = db.search(&image, &SearchConfig::default());
    let best = matches.best().unwrap();
    assert!((best.score - 1.0).abs() < 1e-6);
    assert_eq!((best.x, best.y), (70.0, 40.0));
    assert_eq!(best.center, Point::new(85.0, 60.0));
    assert_eq!(best.target_width, 24.0);
    assert_eq!(best.angle_deg, 4.0);
    assert_eq!(best.tag, "pattern");
}

#[test]
fn elastic_search_maps_back_to_original_frame() {
    let base = scene(150, 100, 60, 35, 2);
    // Upscale so the pattern is found at a reduced scale.
    let image = resize_bilinear(&base, 300, 200).unwrap();
    let true_center = Point::new((60.0 + 15.0) * 2.0, (35.0 + 20.0) * 2.0);

    let db = pattern_db(0.9);
    let sizes = [150];
    let matches = elastic_search(&db, &image, Some(&sizes), &SearchConfig::default()).unwrap();
    let best = matches.best().unwrap();
    assert!(
        best.center.distance(true_center) < POSITION_TOLERANCE_PX,
        "{:?} vs {:?}",
        best.center,
        true_center
    );
    assert!((best.target_width - 48.0).abs() < 1e-9);
    assert!((best.width - 60.0).abs() < 1e-9);
}

#[test]
fn elastic_search_merges_scales() {
    let image = scene(150, 100, 60, 35, 3);
    let true_center = Point::new(75.0, 55.0);
    let db = pattern_db(0.9);

    let sizes = [150, 140, 130];
    let matches = elastic_search(&db, &image, Some(&sizes), &SearchConfig::default()).unwrap();
    let best = matches.best().unwrap();
    assert!(best.center.distance(true_center) < POSITION_TOLERANCE_PX);
    // Exact scale wins and the other scales' detections are suppressed.
    assert!((best.score - 1.0).abs() < 1e-6);
    let near = matches
        .iter()
        .filter(|m| m.center.distance(true_center) < 8.0)
        .count();
    assert_eq!(near, 1);
}

#[test]
fn classify_uses_expected_location() {
    let image = scene(200, 150, 80, 60, 4);
    let db = pattern_db(0.97);
    let cfg = SearchConfig::default();
    let hit = Expectation {
        center: Point::new(95.0, 80.0),
        max_distance: 10.0,
    };
    let far = Expectation {
        center: Point::new(10.0, 10.0),
        max_distance: 10.0,
    };

    let found = elastic_search(&db, &image, None, &cfg).unwrap();
    let near_hit = classify_matches(&found, &hit);
    assert!(matches!(near_hit, Category::TruePositive | Category::BothPositive));
    assert_eq!(classify_image(&db, &image, &hit, &cfg).unwrap(), near_hit);
    assert_eq!(classify_matches(&found, &far), Category::FalsePositive);

    let empty = Database::new(0.5).unwrap();
    assert_eq!(classify_image(&empty, &image, &far, &cfg).unwrap(), Category::Negative);
}
