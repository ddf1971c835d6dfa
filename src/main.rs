//! Bloblets World entry point
//!
//! The browser build is driven by `WorldHandle` (see `platform::web`). Natively
//! this runs a headless demo: builds a random world, plays the entry animation
//! at 60 Hz and renders one frame into a recording surface.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Bloblets World (native) starting...");
    log::info!("The interactive view is web only - build for wasm32 and serve the page");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7_u64);
    let avatars = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(120_usize);
    demo::run(seed, avatars);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_start in the library, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use bloblets_world::consts::{PLACEHOLDER_ADDRESS, WORLD_HEIGHT, WORLD_WIDTH};
    use bloblets_world::platform::FrameClock;
    use bloblets_world::renderer::{
        FrameRenderer, FrameSet, RecordedImage, RecordingSurface, RenderOptions, build_frame_set,
    };
    use bloblets_world::sim::{EntityRecord, WorldState, math::seeded_rng};
    use bloblets_world::{Camera, Settings, Tuning};
    use glam::Vec2;
    use rand::Rng;

    const PROP_TYPES: [&str; 4] = ["tree", "rock", "statue", "fountain"];

    fn records(seed: u64, avatars: usize) -> Vec<EntityRecord> {
        let mut rng = seeded_rng(seed);
        let mut out: Vec<EntityRecord> = (0..avatars)
            .map(|i| EntityRecord {
                address: format!("0x{:08x}{i:04}", rng.random::<u32>()),
                balance: Some(10f64.powf(rng.random_range(0.0..7.0))),
                is_alive: rng.random::<f32>() > 0.1,
                custom_name: (i % 5 == 0).then(|| format!("blob {i}")),
                ..Default::default()
            })
            .collect();

        for (i, prop) in PROP_TYPES.iter().enumerate() {
            out.push(EntityRecord {
                prop_id: Some(i as u64),
                name: Some(format!("The {prop}")),
                last_owner: (i % 2 == 0).then(|| "0xowner".to_string()),
                ..EntityRecord::landmark(format!("landmark_{i}"), *prop)
            });
        }

        out.push(EntityRecord::bloblet(PLACEHOLDER_ADDRESS, 0));
        out
    }

    fn frames(prefix: &str) -> FrameSet<RecordedImage> {
        build_frame_set(|tier, size| {
            Ok::<_, std::convert::Infallible>(RecordedImage {
                name: format!("{prefix}{tier}"),
                size,
            })
        })
        .unwrap_or_default()
    }

    /// Smallest gap between any two sprite footprints (negative means overlap)
    fn min_clearance(world: &WorldState) -> f32 {
        let sprites = world.sprites();
        let mut best = f32::INFINITY;
        for (i, a) in sprites.iter().enumerate() {
            for b in &sprites[i + 1..] {
                best = best.min(a.pos.distance(b.pos) - a.radius - b.radius);
            }
        }
        best
    }

    pub fn run(seed: u64, avatars: usize) {
        let size = Vec2::new(WORLD_WIDTH, WORLD_HEIGHT);
        let mut world = WorldState::new(size, Tuning::default(), seed);

        let input = records(seed, avatars);
        world.apply_snapshot(&input, 0.0);
        let slots: usize = world.slot_pools().iter().map(Vec::len).sum();
        log::info!(
            "{} sprites placed into {} slots (pool generation {})",
            world.len(),
            slots,
            world.pools_generation()
        );

        // Entry animation at 60 Hz
        let mut clock = FrameClock::new();
        let mut now = 0.0;
        let mut frames_run = 0_u32;
        while world.entry_active() && now < 20_000.0 {
            now += 1000.0 / 60.0;
            let dt = clock.tick(now);
            world.step(now, dt);
            frames_run += 1;
        }
        log::info!(
            "entry settled after {frames_run} frames ({:.1}s simulated)",
            now / 1000.0
        );
        log::info!("min clearance between sprites: {:.2}px", min_clearance(&world));

        let mut camera = Camera::new(world.tuning.camera.clone());
        camera.set_viewport(Vec2::new(1280.0, 720.0), 1.0, Vec2::ZERO);
        camera.position_to_world(size, true, None);

        let mut renderer = FrameRenderer::new(RenderOptions::from(&Settings::default()));
        renderer.atlas.set_defaults(frames("alive"), frames("dead"));
        let mut surface = RecordingSurface::new(1280.0, 720.0);

        world.set_highlight_mode(true);
        world.set_self_address(Some("0xowner"));
        let stats = renderer.render(&mut surface, &mut world, &mut camera, now, 16.0);
        log::info!(
            "frame: {} drawn, {} culled, {} skipped, {} labels, {} draw calls",
            stats.drawn,
            stats.culled,
            stats.skipped,
            stats.labels,
            surface.calls.len()
        );
        log::info!(
            "{} landmarks owned by 0xowner",
            world.owned_landmark_count("0xowner")
        );
        for event in world.drain_events() {
            log::info!("event {}", event.name());
        }
    }
}
