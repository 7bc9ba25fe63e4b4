//! End-to-end behaviour of the overlay driven through its public API.

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use lexi_draw::{ImageHandle, PixmapSurface, Point, Rect, RecordingSurface, Size, Surface};
use web_time::Instant;

use crate::{
    Annotation, AnnotationId, AnnotationKind, AnnotationOverlay, CoordinateMapper, DeviceKind,
    DirtyRegion, DirtyRegionTracker, HitTester, ImageCache, Layer, LayerId, LoadOutcome,
    MemoryFetcher, NormalizedBox, OverlayConfig, RawInput, SpatialIndexKind, SurfaceRect,
    Tolerance, ViewportState,
};

type Overlay = AnnotationOverlay<RecordingSurface>;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn overlay(width: u32, height: u32) -> Overlay {
    AnnotationOverlay::new(
        OverlayConfig::default(),
        RecordingSurface::new(width, height),
        RecordingSurface::new(width, height),
        RecordingSurface::new(width, height),
    )
}

fn load_blank(o: &mut Overlay, width: u32, height: u32) {
    let ticket = o.begin_image_load("owl.png");
    let handle = ImageHandle::from_rgba8(vec![255; (width * height * 4) as usize], width, height).unwrap();
    let outcome = o.complete_image_load_decoded(&ticket, Ok(handle));
    assert_eq!(outcome, LoadOutcome::Loaded(Size::new(width as f32, height as f32)));
}

fn eye() -> Annotation {
    Annotation::new(
        "eye",
        NormalizedBox::new(0.5, 0.4, 0.1, 0.1),
        AnnotationKind::Anatomical,
        "el ojo",
    )
}

fn drain_frames(o: &mut Overlay, now: Instant) -> usize {
    let mut frames = 0;
    while let Some(token) = o.poll_frame_request() {
        o.tick(token, now + Duration::from_millis(17 * frames as u64));
        frames += 1;
        assert!(frames < 10, "frame loop did not settle");
    }
    frames
}

fn surface() -> SurfaceRect {
    SurfaceRect::new(0.0, 0.0, 600.0, 450.0)
}

fn scaled_mapper() -> CoordinateMapper {
    let mut vp = ViewportState::new(Size::new(600.0, 450.0));
    vp.set_natural(Size::new(1200.0, 900.0));
    CoordinateMapper::new(&vp)
}

#[test]
fn scenario_a_normalized_box_maps_to_display() {
    let rect = scaled_mapper().to_display(&eye().bounding_box).unwrap();
    assert!(approx_eq(rect.x, 300.0));
    assert!(approx_eq(rect.y, 180.0));
    assert!(approx_eq(rect.width, 60.0));
    assert!(approx_eq(rect.height, 45.0));

    let mut o = overlay(600, 450);
    load_blank(&mut o, 1200, 900);
    o.set_annotations(vec![eye()]);
    let placed = o.hit_tester().rect_of(&AnnotationId::from("eye")).unwrap();
    assert!(approx_eq(placed.x, 300.0) && approx_eq(placed.bottom(), 225.0));
}

#[test]
fn scenario_b_touch_tolerance() {
    let mut o = overlay(600, 450);
    load_blank(&mut o, 1200, 900);
    o.set_annotations(vec![eye()]);
    let p = Point::new(295.0, 178.0);

    assert_eq!(o.annotation_at(p, DeviceKind::Touch).map(|a| a.label.as_str()), Some("el ojo"));
    assert!(o.annotation_at(p, DeviceKind::Mouse).is_none());

    let found = Rc::new(RefCell::new(0));
    let sink = found.clone();
    let mut o = o.on_discover(move |_| *sink.borrow_mut() += 1);
    let now = Instant::now();
    o.handle_input(
        RawInput::PointerClick {
            device: DeviceKind::Mouse,
            client: p,
        },
        &surface(),
        now,
    );
    assert_eq!(*found.borrow(), 0);
    o.handle_input(RawInput::TouchStart { client: p }, &surface(), now);
    o.handle_input(RawInput::TouchEnd { client: Some(p) }, &surface(), now);
    assert_eq!(*found.borrow(), 1);
}

#[test]
fn scenario_c_emptied_set_hits_nothing_and_draws_nothing() {
    let mut o = overlay(600, 450);
    load_blank(&mut o, 1200, 900);
    let records = (0..5)
        .map(|i| {
            Annotation::new(
                format!("a{}", i),
                NormalizedBox::new(0.1 + 0.15 * i as f32, 0.2, 0.1, 0.1),
                AnnotationKind::Color,
                "rojo",
            )
        })
        .collect();
    o.set_annotations(records);
    let now = Instant::now();
    drain_frames(&mut o, now);
    assert!(o.annotation_at(Point::new(90.0, 112.0), DeviceKind::Mouse).is_some());

    o.set_annotations(Vec::new());
    for x in (0..600).step_by(25) {
        for y in (0..450).step_by(25) {
            let p = Point::new(x as f32, y as f32);
            assert!(o.annotation_at(p, DeviceKind::Touch).is_none());
        }
    }

    let before = o.interactive_layer().surface().commands().len();
    drain_frames(&mut o, now + Duration::from_secs(1));
    let after = &o.interactive_layer().surface().commands()[before..];
    assert!(!after.is_empty());
    assert!(after.iter().all(|c| !c.is_paint()));
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[test]
fn scenario_d_decode_failure_reports_once() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    let mut o = overlay(600, 450).on_image_load_error(move |e| sink.borrow_mut().push(e.url().to_string()));

    let ticket = o.begin_image_load("broken.png");
    let outcome = o.complete_image_load(&ticket, Ok(b"\x89PNG truncated".to_vec()));
    assert_eq!(outcome, LoadOutcome::Failed);
    assert_eq!(o.complete_image_load(&ticket, Ok(png_bytes(2, 2))), LoadOutcome::Stale);

    let now = Instant::now();
    drain_frames(&mut o, now);
    let redraws = o.layer_stats(LayerId::Static).redraws;
    assert_eq!(redraws, 1);

    for i in 1..5 {
        o.poll_timers(now + Duration::from_secs(i));
        assert!(o.poll_frame_request().is_none());
    }
    assert_eq!(o.layer_stats(LayerId::Static).redraws, redraws);
    assert_eq!(*errors.borrow(), vec!["broken.png".to_string()]);
    assert!(o.current_image().is_none());
}

#[test]
fn load_through_fetcher_and_cache() {
    let mut fetcher = MemoryFetcher::new();
    fetcher.insert("mem://heron.png", png_bytes(40, 30));
    let mut cache = ImageCache::new(2);
    let mut o = overlay(80, 60);

    assert_eq!(
        o.load_image("mem://heron.png", &fetcher, &mut cache),
        LoadOutcome::Loaded(Size::new(40.0, 30.0))
    );
    assert_eq!(
        o.load_image("mem://heron.png", &fetcher, &mut cache),
        LoadOutcome::Loaded(Size::new(40.0, 30.0))
    );
    assert_eq!(cache.stats(), (1, 1));
    assert_eq!(o.load_image("mem://missing.png", &fetcher, &mut cache), LoadOutcome::Failed);
}

#[test]
fn round_trip_display_to_normalized() {
    let boxes = [
        NormalizedBox::new(0.0, 0.0, 1.0, 1.0),
        NormalizedBox::new(0.5, 0.4, 0.1, 0.1),
        NormalizedBox::new(0.123, 0.77, 0.3, 0.2),
    ];
    for (display, natural) in [
        (Size::new(600.0, 450.0), Size::new(1200.0, 900.0)),
        (Size::new(1024.0, 768.0), Size::new(640.0, 480.0)),
        (Size::new(333.0, 999.0), Size::new(4000.0, 3000.0)),
    ] {
        let mut vp = ViewportState::new(display);
        vp.set_natural(natural);
        let mapper = CoordinateMapper::new(&vp);
        for b in &boxes {
            let r = mapper.to_display(b).unwrap();
            let tl = mapper.to_normalized(Point::new(r.x, r.y)).unwrap();
            let br = mapper.to_normalized(Point::new(r.right(), r.bottom())).unwrap();
            assert!(approx_eq(tl.x, b.x) && approx_eq(tl.y, b.y));
            assert!(approx_eq(br.x, b.right()) && approx_eq(br.y, b.bottom()));
        }
    }
}

#[test]
fn full_dirty_is_idempotent() {
    let mut tracker = DirtyRegionTracker::default();
    tracker.set_bounds(Rect::new(0.0, 0.0, 600.0, 450.0));
    tracker.mark_dirty(Rect::new(10.0, 10.0, 5.0, 5.0));
    for _ in 0..4 {
        tracker.mark_full_dirty();
    }
    tracker.mark_dirty(Rect::new(100.0, 100.0, 5.0, 5.0));
    assert_eq!(tracker.drain(), vec![DirtyRegion::Full]);
    assert!(tracker.drain().is_empty());
}

#[test]
fn overlapping_hits_prefer_topmost_and_skip_hidden() {
    let (set, _) = crate::AnnotationSet::from_records(vec![
        Annotation::new("under", NormalizedBox::new(0.1, 0.1, 0.5, 0.5), AnnotationKind::Habitat, "la mesa"),
        Annotation::new("over", NormalizedBox::new(0.2, 0.2, 0.2, 0.2), AnnotationKind::Habitat, "el vaso"),
        Annotation::new("hidden", NormalizedBox::new(0.25, 0.25, 0.1, 0.1), AnnotationKind::Habitat, "la taza")
            .with_visible(false),
    ]);
    for kind in [SpatialIndexKind::Linear, SpatialIndexKind::Grid] {
        let mut hits = HitTester::new(kind, 32.0, Tolerance::default());
        hits.rebuild(&set, &scaled_mapper());
        let p = Point::new(180.0, 135.0);
        for _ in 0..3 {
            assert_eq!(hits.hit_test(p, DeviceKind::Mouse), Some(&AnnotationId::from("over")));
        }
        assert!(hits.placed().iter().all(|p| p.id.as_str() != "hidden"));
    }
}

#[test]
fn hover_redraws_only_the_hover_layer() {
    let hovers = Rc::new(RefCell::new(Vec::new()));
    let sink = hovers.clone();
    let mut o = overlay(600, 450).on_hover(move |a| sink.borrow_mut().push(a.map(|a| a.id.to_string())));
    load_blank(&mut o, 1200, 900);
    o.set_annotations(vec![eye()]);
    let mut now = Instant::now();
    drain_frames(&mut o, now);

    let static_cmds = o.static_layer().surface().commands().len();
    let interactive_cmds = o.interactive_layer().surface().commands().len();
    let static_redraws = o.layer_stats(LayerId::Static).redraws;
    let interactive_redraws = o.layer_stats(LayerId::Interactive).redraws;

    for target in [Point::new(320.0, 200.0), Point::new(10.0, 10.0), Point::new(330.0, 210.0)] {
        now += Duration::from_millis(50);
        o.handle_input(
            RawInput::PointerMove {
                device: DeviceKind::Mouse,
                client: target,
            },
            &surface(),
            now,
        );
        drain_frames(&mut o, now);
    }
    o.handle_input(RawInput::PointerLeave { device: DeviceKind::Mouse }, &surface(), now);
    drain_frames(&mut o, now + Duration::from_millis(50));

    assert_eq!(hovers.borrow().len(), 4);
    assert_eq!(o.layer_stats(LayerId::Static).redraws, static_redraws);
    assert_eq!(o.layer_stats(LayerId::Interactive).redraws, interactive_redraws);
    assert_eq!(o.static_layer().surface().commands().len(), static_cmds);
    assert_eq!(o.interactive_layer().surface().commands().len(), interactive_cmds);
    assert!(o.layer_stats(LayerId::Hover).redraws >= 4);
    assert!(o.hover_layer().drawn().is_empty());
}

#[test]
fn surface_offset_and_scale_are_applied_to_pointer_events() {
    let mut o = overlay(600, 450);
    load_blank(&mut o, 1200, 900);
    o.set_annotations(vec![eye()]);
    // laid out at half size, offset by the page margin
    let rect = SurfaceRect::new(40.0, 100.0, 300.0, 225.0);
    o.handle_input(
        RawInput::PointerMove {
            device: DeviceKind::Mouse,
            client: Point::new(40.0 + 165.0, 100.0 + 100.0),
        },
        &rect,
        Instant::now(),
    );
    assert_eq!(o.interaction().hovered_id(), Some(&AnnotationId::from("eye")));
}

#[test]
fn indeterminate_viewport_places_nothing() {
    let mut o = overlay(600, 450);
    o.set_annotations(vec![eye()]);
    assert!(o.hit_tester().placed().is_empty());
    assert!(o.mapper().to_display(&eye().bounding_box).is_none());
    assert!(o.annotation_at(Point::new(320.0, 200.0), DeviceKind::Touch).is_none());
    let _ = o.begin_image_load("slow.png");
    assert!(!o.viewport().is_determinate());
    assert_eq!(o.surfaces()[0].size(), (600, 450));
}

#[test]
fn raster_overlay_paints_inside_boxes_only() {
    let mut o = AnnotationOverlay::new(
        OverlayConfig::default(),
        PixmapSurface::new(600, 450),
        PixmapSurface::new(600, 450),
        PixmapSurface::new(600, 450),
    );
    let ticket = o.begin_image_load("owl.png");
    let handle = ImageHandle::from_rgba8(vec![255; 120 * 90 * 4], 120, 90).unwrap();
    o.complete_image_load_decoded(&ticket, Ok(handle));
    o.set_show_labels(false);
    o.set_annotations(vec![eye()]);

    let now = Instant::now();
    while let Some(token) = o.poll_frame_request() {
        o.tick(token, now);
    }

    let boxes = o.interactive_layer().surface();
    assert!(boxes.pixel_rgba(330, 202).is_some_and(|p| p[3] > 0));
    assert_eq!(boxes.pixel_rgba(550, 400).map(|p| p[3]), Some(0));
    let base = o.static_layer().surface().pixel_rgba(10, 10).unwrap();
    assert!(base.iter().all(|&c| c >= 250));
}
