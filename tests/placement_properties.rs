//! Placement properties checked through the public API
//!
//! Sweeps canvases, foreground sizes, policies and seeds and checks that
//! every composite keeps the foreground fully on the canvas.

use image::{DynamicImage, Rgba, RgbaImage};
use imgly_bgcomposite::{
    placement, BackgroundMode, CompositeConfig, CompositeProcessor, Offset, PassthroughSegmenter, PlacementMode,
    PlacementPolicy,
};
use rand::{rngs::StdRng, SeedableRng};

const POLICIES: [PlacementPolicy; 7] = [
    PlacementPolicy::Center,
    PlacementPolicy::Random { margin_ratio: 0.0 },
    PlacementPolicy::Random { margin_ratio: 0.2 },
    PlacementPolicy::Thirds { jitter_ratio: 0.0 },
    PlacementPolicy::Thirds { jitter_ratio: 0.1 },
    PlacementPolicy::Corners { margin_ratio: 0.0 },
    PlacementPolicy::Corners { margin_ratio: 0.2 },
];

fn plan(policy: PlacementPolicy, canvas: (u32, u32), foreground: (u32, u32), seed: u64) -> Offset {
    placement::plan(policy, canvas, foreground, &mut StdRng::seed_from_u64(seed))
}

#[test]
fn test_offsets_stay_on_canvas() {
    let canvases = [(1, 1), (2, 9), (100, 100), (1280, 720), (301, 17)];
    let foregrounds = [(1, 1), (7, 5), (100, 100), (640, 360), (17, 301)];

    for policy in POLICIES {
        for canvas in canvases {
            for foreground in foregrounds {
                for seed in 0..25 {
                    let offset = plan(policy, canvas, foreground, seed);
                    if foreground.0 <= canvas.0 && foreground.1 <= canvas.1 {
                        assert!(offset.x + foreground.0 <= canvas.0, "{policy} {canvas:?} {foreground:?} {offset}");
                        assert!(offset.y + foreground.1 <= canvas.1, "{policy} {canvas:?} {foreground:?} {offset}");
                    } else {
                        // an oversized axis has no travel and pins to zero
                        if foreground.0 > canvas.0 {
                            assert_eq!(offset.x, 0, "{policy} {canvas:?} {foreground:?}");
                        }
                        if foreground.1 > canvas.1 {
                            assert_eq!(offset.y, 0, "{policy} {canvas:?} {foreground:?}");
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_same_seed_same_offset() {
    for policy in POLICIES {
        for seed in [0, 7, 99, 123_456_789] {
            assert_eq!(
                plan(policy, (1024, 768), (200, 300), seed),
                plan(policy, (1024, 768), (200, 300), seed),
                "{policy}"
            );
        }
    }
}

#[test]
fn test_random_placement_varies_across_seeds() {
    let policy = PlacementPolicy::Random { margin_ratio: 0.05 };
    let distinct: std::collections::HashSet<Offset> =
        (0..50).map(|seed| plan(policy, (1024, 768), (100, 100), seed)).collect();
    assert!(distinct.len() > 40, "only {} distinct offsets", distinct.len());
}

#[test]
fn test_center_example() {
    assert_eq!(plan(PlacementPolicy::Center, (200, 100), (50, 20), 0), Offset::new(75, 40));
}

#[test]
fn test_thirds_without_jitter_lands_on_intersections() {
    // 600x300 canvas, 60x30 fg: (2kc - 3f) / 6 gives x in {170, 370}, y in {85, 185}
    let expected = [
        Offset::new(170, 85),
        Offset::new(370, 85),
        Offset::new(170, 185),
        Offset::new(370, 185),
    ];
    for seed in 0..40 {
        let offset = plan(PlacementPolicy::Thirds { jitter_ratio: 0.0 }, (600, 300), (60, 30), seed);
        assert!(expected.contains(&offset), "{offset}");
    }
}

#[test]
fn test_thirds_jitter_stays_near_intersections() {
    // jitter floor(300 * 0.1) = 30 pixels per axis
    let intersections = [(170i64, 85i64), (370, 85), (170, 185), (370, 185)];
    for seed in 0..40 {
        let offset = plan(PlacementPolicy::Thirds { jitter_ratio: 0.1 }, (600, 300), (60, 30), seed);
        let (x, y) = (i64::from(offset.x), i64::from(offset.y));
        assert!(
            intersections.iter().any(|&(cx, cy)| (x - cx).abs() <= 30 && (y - cy).abs() <= 30),
            "{offset}"
        );
    }
}

#[test]
fn test_corners_without_margin_touch_edges() {
    let expected = [
        Offset::new(0, 0),
        Offset::new(150, 0),
        Offset::new(0, 80),
        Offset::new(150, 80),
    ];
    for seed in 0..40 {
        let offset = plan(PlacementPolicy::Corners { margin_ratio: 0.0 }, (200, 100), (50, 20), seed);
        assert!(expected.contains(&offset), "{offset}");
    }
}

#[test]
fn test_foreground_larger_than_canvas_pins_origin() {
    for policy in POLICIES {
        assert_eq!(plan(policy, (50, 50), (80, 90), 3), Offset::new(0, 0), "{policy}");
    }
}

#[test]
fn test_processor_offsets_match_placed_size() {
    let foreground = DynamicImage::ImageRgba8(RgbaImage::from_pixel(90, 60, Rgba([200, 10, 10, 255])));

    for mode in [PlacementMode::Center, PlacementMode::Random, PlacementMode::Thirds, PlacementMode::Corners] {
        for seed in 0..5 {
            let config = CompositeConfig::builder()
                .background_mode(BackgroundMode::Color)
                .canvas_size(160, 120)
                .scale_factor(0.5)
                .placement_mode(mode)
                .seed(seed)
                .build()
                .unwrap();
            let mut processor = CompositeProcessor::with_segmenter(config, PassthroughSegmenter).unwrap();
            let result = processor.process_image(&foreground, None).unwrap();

            let (width, height) = result.metadata.placed_size.unwrap();
            let offset = result.metadata.offset.unwrap();
            assert_eq!((width, height), (45, 30));
            assert!(offset.x + width <= 160 && offset.y + height <= 120, "{mode} seed {seed}: {offset}");
            assert!(result.metadata.placement.starts_with(&mode.to_string()), "{}", result.metadata.placement);
        }
    }
}
