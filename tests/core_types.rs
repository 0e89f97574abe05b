use stachematch::image::io::decode_image;
use stachematch::lowlevel::score_at;
use stachematch::{Point, RasterImage, StacheError, Target, Template, TemplateId};
use std::io::Cursor;

fn target(width: f64) -> Target {
    Target {
        center: Point::new(1.0, 1.0),
        angle_deg: 0.0,
        width,
    }
}

#[test]
fn raster_rejects_mismatched_buffers() {
    let err = RasterImage::new(vec![0.0; 7], 4, 2).unwrap_err();
    assert_eq!(err, StacheError::BufferLength { needed: 8, got: 7 });
    let err = RasterImage::new(vec![0.0; 9], 4, 2).unwrap_err();
    assert_eq!(err, StacheError::BufferLength { needed: 8, got: 9 });
}

#[test]
fn zero_sized_raster_is_valid_and_never_matches() {
    let empty = RasterImage::new(Vec::new(), 0, 5).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.magnitude(), 0.0);

    let tpl = Template::new(RasterImage::filled(2, 2, 0.5).unwrap(), target(2.0), "t");
    assert!(tpl.correlations(&empty, 0.0).is_empty());
    assert_eq!(tpl.max_correlation(&empty), 0.0);

    let empty_tpl = Template::new(empty.clone(), target(0.0), "empty");
    let image = RasterImage::filled(4, 4, 0.5).unwrap();
    assert!(empty_tpl.correlations(&image, 0.0).is_empty());
}

#[test]
fn decoded_brightness_is_mean_of_rgb() {
    let rgba = image::RgbaImage::from_fn(2, 1, |x, _| {
        if x == 0 {
            image::Rgba([255, 0, 0, 0])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let raster = decode_image(&bytes).unwrap();
    assert_eq!((raster.width(), raster.height()), (2, 1));
    assert!((raster.get(0, 0).unwrap() - 1.0 / 3.0).abs() < 1e-4);
    assert!((raster.get(1, 0).unwrap() - 1.0).abs() < 1e-6);
}

#[test]
fn sub_image_checks_bounds() {
    let img = RasterImage::filled(5, 4, 0.25).unwrap();
    assert!(img.sub_image(1, 1, 4, 3).is_ok());
    assert!(matches!(
        img.sub_image(2, 0, 4, 1),
        Err(StacheError::RoiOutOfBounds { .. })
    ));
}

#[test]
fn score_at_outside_placement_range_is_none() {
    let img = RasterImage::filled(6, 6, 0.5).unwrap();
    let tpl = Template::new(RasterImage::filled(3, 3, 0.5).unwrap(), target(3.0), "t");
    assert!(score_at(&img, &tpl, 3, 3).is_some());
    assert!(score_at(&img, &tpl, 4, 0).is_none());
    assert_eq!(tpl.correlation_at(&img, 0, 4), None);
}

#[test]
fn fresh_templates_have_unassigned_id_and_mirror_link() {
    let data = (0..6).map(|v| v as f32 / 6.0).collect();
    let tpl = Template::new(RasterImage::new(data, 3, 2).unwrap(), target(3.0), "src");
    assert_eq!(tpl.id(), TemplateId(0));
    assert_eq!(tpl.mirror_of(), None);
    let mirror = tpl.mirrored();
    assert_eq!(mirror.tag(), "src (mirror)");
    assert_eq!(mirror.mirror_of(), Some(tpl.id()));
    assert_eq!(mirror.image().get(0, 0), tpl.image().get(2, 0));
}
