//! End-to-end scenarios through the public world, camera and renderer API

use bloblets_world::consts::{WORLD_HEIGHT, WORLD_WIDTH};
use bloblets_world::renderer::{
    FrameRenderer, RecordedImage, RecordingSurface, RenderOptions, build_frame_set,
};
use bloblets_world::sim::{EntityRecord, parse_deltas, parse_snapshot};
use bloblets_world::{Camera, FocusOptions, Tuning, WorldEvent, WorldState};
use glam::Vec2;

fn world() -> WorldState {
    WorldState::new(Vec2::new(WORLD_WIDTH, WORLD_HEIGHT), Tuning::default(), 42)
}

const SNAPSHOT: &str = r#"[
    {"address": "0xaaa", "tier": 0},
    {"address": "0xbbb", "tier": 1, "custom_name": "Bee"},
    {"address": "0xccc", "tier": 2, "is_alive": false},
    {"address": "lm-1", "entity_type": "landmark", "prop_type": "tree",
     "anchor_x": 800.0, "anchor_y": 600.0, "last_owner": "0xAAA"}
]"#;

#[test]
fn test_snapshot_then_query() {
    let mut w = world();
    w.animate_entry = false;
    let records = parse_snapshot(SNAPSHOT).unwrap();
    w.apply_snapshot(&records, 0.0);

    assert_eq!(w.len(), 4);
    for address in ["0xaaa", "0xbbb", "0xccc", "lm-1"] {
        assert!(w.sprite(address).is_some(), "{address} not indexed");
    }
    let landmark = w.sprite("lm-1").unwrap();
    assert!(landmark.is_landmark());
    assert_eq!(landmark.target, Vec2::new(800.0, 600.0));
    assert_eq!(landmark.pos, landmark.target);

    assert_eq!(w.sprite("0xaaa").unwrap().tier, 0);
    assert_eq!(w.sprite("0xbbb").unwrap().tier, 1);
    assert!(!w.sprite("0xccc").unwrap().alive);
    assert_eq!(w.owned_landmark_count("0xaaa"), 1);

    let events = w.drain_events();
    assert!(events.contains(&WorldEvent::SpritesUpdated { count: 4 }));
}

#[test]
fn test_delta_toggles_alive_once() {
    let mut w = world();
    w.animate_entry = false;
    w.apply_snapshot(&parse_snapshot(SNAPSHOT).unwrap(), 0.0);
    w.drain_events();

    let dead = parse_deltas(r#"[{"address": "0xaaa", "is_alive": false}]"#).unwrap();
    assert_eq!(w.apply_deltas(&dead), 1);
    assert!(!w.sprite("0xaaa").unwrap().alive);
    assert_eq!(w.drain_events().len(), 1);

    // Re-applying the same value changes nothing and stays quiet
    assert_eq!(w.apply_deltas(&dead), 0);
    assert!(w.drain_events().is_empty());

    let alive = parse_deltas(r#"[{"address": "0xaaa", "is_alive": true}]"#).unwrap();
    assert_eq!(w.apply_deltas(&alive), 1);
    assert!(w.sprite("0xaaa").unwrap().alive);
}

#[test]
fn test_focus_on_missing_address_leaves_camera() {
    let mut w = world();
    w.animate_entry = false;
    w.apply_snapshot(&parse_snapshot(SNAPSHOT).unwrap(), 0.0);

    let mut camera = Camera::default();
    camera.set_viewport(Vec2::new(640.0, 360.0), 1.0, Vec2::ZERO);
    camera.position_to_world(w.size, true, None);
    let before = (camera.scale, camera.tx, camera.ty);

    assert!(!camera.focus_on_address(&w, "0xnobody", FocusOptions::default(), 0.0));
    assert!(!camera.is_animating());
    assert_eq!((camera.scale, camera.tx, camera.ty), before);

    assert!(camera.focus_on_address(&w, "lm-1", FocusOptions::default(), 0.0));
    assert!(camera.is_animating());
}

#[test]
fn test_fit_to_world_centers_small_canvas() {
    let w = world();
    let mut camera = Camera::default();
    camera.set_viewport(Vec2::new(640.0, 360.0), 1.0, Vec2::ZERO);
    camera.position_to_world(w.size, true, None);

    assert!((camera.scale - 1.0 / 6.0).abs() < 1e-4);
    let center = camera.world_to_screen(w.center());
    assert!((center - Vec2::new(320.0, 180.0)).length() < 1e-2);
}

#[test]
fn test_first_render_reports_ready() {
    let mut w = world();
    w.animate_entry = false;
    w.apply_snapshot(&parse_snapshot(SNAPSHOT).unwrap(), 0.0);
    w.drain_events();

    let mut camera = Camera::default();
    camera.set_viewport(Vec2::new(640.0, 360.0), 1.0, Vec2::ZERO);
    camera.position_to_world(w.size, true, None);

    let mut renderer = FrameRenderer::new(RenderOptions::default());
    let frames = |prefix: &str| {
        build_frame_set(|tier, size| {
            Ok::<_, ()>(RecordedImage {
                name: format!("{prefix}{tier}"),
                size,
            })
        })
        .unwrap()
    };
    renderer.atlas.set_defaults(frames("alive"), frames("dead"));
    let mut surface = RecordingSurface::new(640.0, 360.0);

    let stats = renderer.render(&mut surface, &mut w, &mut camera, 16.0, 16.0);
    assert_eq!(stats.drawn, 4);
    assert!(renderer.render_ready());
    assert_eq!(w.drain_events(), vec![WorldEvent::RenderReady]);

    renderer.render(&mut surface, &mut w, &mut camera, 32.0, 16.0);
    assert!(w.drain_events().is_empty());
}

#[test]
fn test_add_then_remove_round_trip() {
    let mut w = world();
    w.animate_entry = false;
    w.apply_snapshot(&parse_snapshot(SNAPSHOT).unwrap(), 0.0);

    let index = w
        .add_sprite(&EntityRecord::bloblet("0xnew", 3), false, 0.0)
        .unwrap();
    assert_eq!(w.sprites()[index].address, "0xnew");
    assert!(w.add_sprite(&EntityRecord::bloblet("0xnew", 3), false, 0.0).is_err());

    assert!(w.set_hovered(Some("0xnew")));
    assert!(w.remove_sprite("0xnew"));
    assert!(w.highlights.hovered.is_none());
    assert!(w.sprite("0xnew").is_none());
    assert_eq!(w.len(), 4);
}
