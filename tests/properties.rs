//! Property tests for layout, separation, entry settling and label placement

use bloblets_world::consts::{
    PLACEHOLDER_ADDRESS, TIER_COUNT, TIER_RADII, WORLD_HEIGHT, WORLD_WIDTH,
};
use bloblets_world::renderer::labels::{LabelCandidate, PlacedLabel, pill_rect, select};
use bloblets_world::sim::{EntityRecord, SlotGenerator, SpriteDelta, WorldState, assign_sprites};
use bloblets_world::tuning::{LabelTuning, SlotTuning};
use bloblets_world::Tuning;
use glam::Vec2;
use proptest::prelude::*;

fn world_size() -> Vec2 {
    Vec2::new(WORLD_WIDTH, WORLD_HEIGHT)
}

/// Far apart from each other and from world center
const ANCHORS: [(f32, f32); 4] = [
    (600.0, 400.0),
    (3240.0, 400.0),
    (600.0, 1760.0),
    (3240.0, 1760.0),
];
const PROPS: [&str; 3] = ["tree", "rock", "statue"];

fn avatar_records(tiers: &[usize]) -> Vec<EntityRecord> {
    tiers
        .iter()
        .enumerate()
        .map(|(i, &t)| EntityRecord::bloblet(format!("0xa{i:05}"), t))
        .collect()
}

fn landmark_records(count: usize) -> Vec<EntityRecord> {
    (0..count)
        .map(|i| EntityRecord {
            anchor_x: Some(ANCHORS[i].0),
            anchor_y: Some(ANCHORS[i].1),
            ..EntityRecord::landmark(format!("lm{i}"), PROPS[i % PROPS.len()])
        })
        .collect()
}

fn assert_index_consistent(world: &WorldState) {
    assert_eq!(world.index_entries().count(), world.len());
    for (address, i) in world.index_entries() {
        assert_eq!(world.sprites()[i].address, address);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn slots_never_overlap(seed in any::<u64>(), scale in 1usize..4) {
        let counts: Vec<usize> = [4, 10, 24, 40, 60].iter().map(|c| c * scale).collect();
        let tuning = SlotTuning::default();
        let pools = SlotGenerator::new(world_size(), &counts, &TIER_RADII, seed, &tuning)
            .run_to_completion();

        let slots: Vec<_> = pools.iter().flatten().collect();
        for (i, a) in slots.iter().enumerate() {
            prop_assert!(a.pos.x >= a.r && a.pos.x <= WORLD_WIDTH - a.r);
            prop_assert!(a.pos.y >= a.r && a.pos.y <= WORLD_HEIGHT - a.r);
            for b in &slots[i + 1..] {
                prop_assert!(a.pos.distance(b.pos) >= a.r + b.r + tuning.min_gap - 1e-3);
            }
        }
        for (tier, pool) in pools.iter().enumerate() {
            prop_assert!(pool.len() <= counts[tier]);
            prop_assert!(pool.iter().all(|s| s.tier == tier));
        }
    }

    #[test]
    fn landmark_and_placeholder_clearance_holds(
        seed in any::<u64>(),
        tiers in prop::collection::vec(0..TIER_COUNT, 1..40),
        landmarks in 0usize..=4,
        with_placeholder in any::<bool>(),
    ) {
        let tuning = Tuning::default();
        let counts = vec![tiers.len() * 2; TIER_COUNT];
        let pools = SlotGenerator::new(world_size(), &counts, &TIER_RADII, seed, &tuning.slots)
            .run_to_completion();

        let mut records = avatar_records(&tiers);
        records.extend(landmark_records(landmarks));
        if with_placeholder {
            records.push(EntityRecord::bloblet(PLACEHOLDER_ADDRESS, 0));
        }
        let sprites = assign_sprites(&records, &pools, world_size(), &tuning);
        prop_assert_eq!(sprites.len(), records.len());

        let sep = &tuning.separation;
        let center = world_size() * 0.5;
        for avatar in sprites.iter().filter(|s| s.is_avatar()) {
            for other in &sprites {
                if other.is_landmark() {
                    let min = avatar.radius + other.radius + sep.landmark_padding;
                    prop_assert!(avatar.target.distance(other.target) >= min - 0.01);
                }
                if other.placeholder {
                    prop_assert_eq!(other.target, center);
                    let min = avatar.radius + other.radius + sep.placeholder_padding;
                    prop_assert!(avatar.target.distance(center) >= min - 0.01);
                }
            }
        }
        let avatars: Vec<_> = sprites.iter().filter(|s| s.is_avatar()).collect();
        for (i, a) in avatars.iter().enumerate() {
            for b in &avatars[i + 1..] {
                let min = a.radius + b.radius + sep.avatar_padding;
                prop_assert!(a.target.distance(b.target) >= min - 0.01);
            }
        }
        for (i, lm) in sprites.iter().filter(|s| s.is_landmark()).enumerate() {
            prop_assert_eq!(lm.target, Vec2::new(ANCHORS[i].0, ANCHORS[i].1));
        }
    }

    #[test]
    fn same_seed_same_layout(
        seed in any::<u64>(),
        tiers in prop::collection::vec(0..TIER_COUNT, 1..30),
    ) {
        let records = avatar_records(&tiers);
        let mut a = WorldState::new(world_size(), Tuning::default(), seed);
        let mut b = WorldState::new(world_size(), Tuning::default(), seed);
        a.animate_entry = false;
        b.animate_entry = false;
        a.apply_snapshot(&records, 0.0);
        b.apply_snapshot(&records, 0.0);
        for (x, y) in a.sprites().iter().zip(b.sprites()) {
            prop_assert_eq!(&x.address, &y.address);
            prop_assert_eq!(x.target, y.target);
        }
    }

    #[test]
    fn entry_always_settles(
        seed in any::<u64>(),
        tiers in prop::collection::vec(0..TIER_COUNT, 1..40),
    ) {
        let mut world = WorldState::new(world_size(), Tuning::default(), seed);
        world.apply_snapshot(&avatar_records(&tiers), 0.0);
        prop_assert!(world.entry_active());

        let mut now = 0.0;
        while world.entry_active() && now < 30_000.0 {
            now += 16.0;
            world.step(now, 16.0);
        }
        prop_assert!(!world.entry_active());
        for sprite in world.sprites() {
            prop_assert!(sprite.mode.is_idle());
            prop_assert_eq!(sprite.pos, sprite.target);
        }
    }

    #[test]
    fn index_tracks_mutations(
        seed in any::<u64>(),
        ops in prop::collection::vec((0u8..3, 0usize..12), 1..30),
    ) {
        let mut world = WorldState::new(world_size(), Tuning::default(), seed);
        world.animate_entry = false;
        world.apply_snapshot(&avatar_records(&[0, 1, 2, 3, 4, 2]), 0.0);

        for (op, n) in ops {
            let address = format!("0xa{n:05}");
            match op {
                0 => {
                    let record = EntityRecord::bloblet(address, n % TIER_COUNT);
                    let _ = world.add_sprite(&record, true, 0.0);
                }
                1 => {
                    world.remove_sprite(&address);
                }
                _ => {
                    let delta = SpriteDelta { address, removed: true, ..Default::default() };
                    world.apply_deltas(&[delta]);
                }
            }
            assert_index_consistent(&world);
        }
    }

    #[test]
    fn accepted_labels_never_overlap(
        points in prop::collection::vec(
            (0.0f32..800.0, 0.0f32..600.0, 1usize..20, any::<bool>()),
            0..60,
        ),
    ) {
        let tuning = LabelTuning::default();
        let measured: Vec<PlacedLabel> = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, chars, handle))| {
                let anchor = Vec2::new(x, y);
                let name_w = chars as f32 * 7.0;
                let handle_w = handle.then_some(60.0);
                PlacedLabel {
                    candidate: LabelCandidate {
                        address: format!("a{i}"),
                        tier: 0,
                        anchor,
                        name: "x".repeat(chars),
                        handle: handle.then(|| "@h".to_string()),
                    },
                    rect: pill_rect(anchor, name_w, handle_w, &tuning),
                }
            })
            .collect();

        let accepted = select(measured, tuning.margin);
        for (i, a) in accepted.iter().enumerate() {
            for b in &accepted[i + 1..] {
                prop_assert!(!a.rect.intersects(&b.rect, tuning.margin));
            }
        }
    }
}
