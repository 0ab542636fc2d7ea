mod support;

use hunyclip_clip_model::{CropRegion, Drag, PreviewSize};
use hunyclip_export_engine::{plan, ClipSelection, ExportToggles, SelectionError};

use support::{info, registry_with, FakeSource};

fn two_clips() -> FakeSource {
    FakeSource::new()
        .with_clip("a.mp4", info(301, 30.0, 200, 200))
        .with_clip("b.mp4", info(40, 25.0, 320, 180))
}

#[test]
fn select_defaults_trim_to_the_middle_frame() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let source = two_clips();
    let mut selection = ClipSelection::new(Box::new(source.clone()));

    let info = selection.select(&mut registry, "a.mp4").unwrap();
    assert_eq!(info.frame_count, 301);
    assert_eq!(registry.trim("a.mp4"), Some(150));
    assert_eq!(selection.position(), Some(150));
    // Opening a clip is not an edit.
    assert!(!registry.entry("a.mp4").unwrap().export_enabled);
}

#[test]
fn select_keeps_an_existing_trim() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    registry.set_trim("a.mp4", 12).unwrap();
    let mut selection = ClipSelection::new(Box::new(two_clips()));

    selection.select(&mut registry, "a.mp4").unwrap();
    assert_eq!(selection.position(), Some(12));
    assert_eq!(registry.trim("a.mp4"), Some(12));
}

#[test]
fn switching_clips_releases_the_previous_handle() {
    let (_dir, mut registry) = registry_with(&["a.mp4", "b.mp4"]);
    let source = two_clips();
    let mut selection = ClipSelection::new(Box::new(source.clone()));

    selection.select(&mut registry, "a.mp4").unwrap();
    assert_eq!(source.open_handles(), 1);
    selection.select(&mut registry, "b.mp4").unwrap();
    assert_eq!(source.open_handles(), 1);
    assert_eq!(source.max_open_handles(), 1);
    assert_eq!(selection.active(), Some("b.mp4"));

    selection.release();
    assert_eq!(source.open_handles(), 0);
    assert_eq!(selection.active(), None);
}

#[test]
fn scrub_and_step_clamp_to_the_clip() {
    let (_dir, mut registry) = registry_with(&["b.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    selection.select(&mut registry, "b.mp4").unwrap();

    assert_eq!(selection.scrub(&mut registry, 1000).unwrap(), 39);
    assert_eq!(registry.trim("b.mp4"), Some(39));
    assert!(registry.entry("b.mp4").unwrap().export_enabled);

    assert_eq!(selection.step(&mut registry, -10).unwrap(), 29);
    assert_eq!(selection.step(&mut registry, -100).unwrap(), 0);
    assert_eq!(selection.step(&mut registry, 5).unwrap(), 5);
    assert_eq!(registry.trim("b.mp4"), Some(5));
}

#[test]
fn drag_is_mapped_into_source_pixels() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    selection.select(&mut registry, "a.mp4").unwrap();

    let preview = PreviewSize::new(100.0, 100.0);
    let region = selection
        .apply_drag(&mut registry, Drag::new((60.0, 60.0), (10.0, 10.0)), preview, None)
        .unwrap();
    assert_eq!(region, CropRegion::new(20, 20, 100, 100));
    assert_eq!(registry.crop("a.mp4"), Some(region));
    assert!(registry.entry("a.mp4").unwrap().export_enabled);

    let redraw = selection.preview_crop(&registry, preview).unwrap();
    assert!((redraw.x - 10.0).abs() < 1e-9);
    assert!((redraw.w - 50.0).abs() < 1e-9);
}

#[test]
fn aspect_lock_applies_to_drags() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    selection.select(&mut registry, "a.mp4").unwrap();

    let region = selection
        .apply_drag(
            &mut registry,
            Drag::new((0.0, 0.0), (80.0, 40.0)),
            PreviewSize::new(200.0, 200.0),
            Some(1.0),
        )
        .unwrap();
    assert_eq!(region, CropRegion::new(0, 0, 40, 40));
}

#[test]
fn tiny_drag_keeps_the_previous_crop() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    selection.select(&mut registry, "a.mp4").unwrap();
    registry
        .set_crop("a.mp4", Some(CropRegion::new(1, 2, 30, 40)))
        .unwrap();

    let err = selection
        .apply_drag(
            &mut registry,
            Drag::new((10.0, 10.0), (14.0, 50.0)),
            PreviewSize::new(200.0, 200.0),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, SelectionError::Rejected(_)));
    assert_eq!(registry.crop("a.mp4"), Some(CropRegion::new(1, 2, 30, 40)));
}

#[test]
fn current_frame_is_the_trim_frame() {
    let (_dir, mut registry) = registry_with(&["b.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    selection.select(&mut registry, "b.mp4").unwrap();
    selection.scrub(&mut registry, 17).unwrap();

    let frame = selection.current_frame().unwrap();
    assert_eq!((frame.width, frame.height), (320, 180));
    assert_eq!(frame.pixels[0], 17);
    // Reading again returns the same frame, not the next one.
    assert_eq!(selection.current_frame().unwrap().pixels[0], 17);
}

#[test]
fn operations_need_an_active_clip() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let mut selection = ClipSelection::new(Box::new(two_clips()));
    assert!(matches!(
        selection.scrub(&mut registry, 3),
        Err(SelectionError::NoActiveClip)
    ));
    assert!(matches!(
        selection.select(&mut registry, "missing.mp4"),
        Err(SelectionError::Registry(_))
    ));
}

#[test]
fn empty_clip_cannot_be_selected() {
    let (_dir, mut registry) = registry_with(&["empty.mp4"]);
    let source = FakeSource::new().with_clip("empty.mp4", info(0, 30.0, 64, 64));
    let mut selection = ClipSelection::new(Box::new(source.clone()));

    assert!(matches!(
        selection.select(&mut registry, "empty.mp4"),
        Err(SelectionError::EmptyClip { .. })
    ));
    assert_eq!(source.open_handles(), 0);
}

#[test]
fn scrubbing_to_the_first_frame_exports_from_frame_zero() {
    let (_dir, mut registry) = registry_with(&["a.mp4"]);
    let source = two_clips();
    let mut selection = ClipSelection::new(Box::new(source.clone()));
    selection.select(&mut registry, "a.mp4").unwrap();

    assert_eq!(selection.scrub(&mut registry, 0).unwrap(), 0);
    assert_eq!(registry.trim("a.mp4"), Some(0));

    // Selecting the clip again keeps the explicit trim.
    selection.select(&mut registry, "a.mp4").unwrap();
    assert_eq!(selection.position(), Some(0));

    let plan = plan(&registry, &ExportToggles::new(false, true, false), &source);
    assert_eq!(plan.jobs.len(), 1);
    assert_eq!(plan.jobs[0].trim_start, 0);
}
