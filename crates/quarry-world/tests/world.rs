use std::fs;
use std::io::Read;
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use quarry_config::Config;
use quarry_voxel::block::{AIR, DIRT, GRASS, LOG, STONE};
use quarry_voxel::{
    BlockPos, ChunkPos, ItemSlot, LightPlanes, PAYLOAD_LEN, Sign, TileEntity, chunk_path,
};
use quarry_voxel::{Chest, Lock, MAX_LIGHT};
use quarry_world::{
    ChannelSink, ClientId, FixedPos, FlatGenerator, NullSink, Recipient, World, WorldError,
    WorldEvent,
};
use tempfile::TempDir;

fn config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.world_dir = dir.path().join("world").to_string_lossy().into_owned();
    config
}

fn open(config: &Config) -> World {
    World::open(config, Box::new(FlatGenerator::default()), Arc::new(NullSink))
        .expect("world opens")
}

#[test]
fn test_set_and_get_block_across_parity() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    world.set_block(5, 80, 7, STONE, 3).unwrap();
    world.set_block(5, 81, 7, DIRT, 12).unwrap();

    assert_eq!(world.get_block(5, 80, 7, false).unwrap(), (STONE, 3));
    assert_eq!(world.get_block(5, 81, 7, false).unwrap(), (DIRT, 12));
    assert_eq!(world.get_block(5, 63, 7, false).unwrap(), (GRASS, 0));
}

#[test]
fn test_negative_coordinates_map_to_the_right_chunk() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    world.set_block(-1, 70, -17, STONE, 0).unwrap();
    assert!(world.store().is_resident(ChunkPos::new(-1, -2)));
    assert_eq!(world.get_block(-1, 70, -17, false).unwrap().0, STONE);
}

#[test]
fn test_out_of_range_y_is_rejected() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    assert!(matches!(
        world.get_block(0, 128, 0, true),
        Err(WorldError::OutOfRange { y: 128 })
    ));
    assert!(matches!(
        world.set_block(0, -1, 0, STONE, 0),
        Err(WorldError::OutOfRange { y: -1 })
    ));
    assert_eq!(world.store().resident_count(), 0);
}

#[test]
fn test_read_without_generation_reports_unavailable() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    assert!(matches!(
        world.get_block(100, 10, 100, false),
        Err(WorldError::ChunkUnavailable { cx: 6, cz: 6 })
    ));
    assert!(world.store().positions().is_empty());
}

#[test]
fn test_generated_chunk_is_lit() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    assert_eq!(world.get_light(3, 100, 3, true).unwrap(), (MAX_LIGHT, 0));
    assert_eq!(world.get_light(3, 30, 3, true).unwrap(), (0, 0));
}

#[test]
fn test_set_light_touches_only_selected_plane() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    world.set_light(2, 90, 2, 4, 9, LightPlanes::Block).unwrap();
    assert_eq!(world.get_light(2, 90, 2, false).unwrap(), (MAX_LIGHT, 9));

    world.set_light(2, 90, 2, 4, 1, LightPlanes::Sky).unwrap();
    assert_eq!(world.get_light(2, 90, 2, false).unwrap(), (4, 9));
}

#[test]
fn test_spawn_lifts_onto_generated_ground() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let world = open(&config);
    assert_eq!(world.spawn().y, config.world.default_spawn.y);

    world.get_block(0, 0, 0, true).unwrap();
    assert_eq!(
        world.spawn(),
        BlockPos::new(0, i32::from(FlatGenerator::SURFACE_Y) + 1, 0)
    );

    drop(world);
    let reopened = open(&config);
    assert_eq!(reopened.spawn().y, i32::from(FlatGenerator::SURFACE_Y) + 1);
}

#[test]
fn test_level_file_created_and_time_persisted() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let world = open(&config);
    assert!(world.level_path().exists());
    let seed = world.seed();
    world.advance_time(250);
    world.shutdown().unwrap();
    drop(world);

    let reopened = open(&config);
    assert_eq!(reopened.seed(), seed);
    assert_eq!(reopened.time(), 250);
}

#[test]
fn test_shutdown_persists_edits() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let world = open(&config);
    world.set_block(20, 70, 20, STONE, 5).unwrap();
    world.shutdown().unwrap();
    assert_eq!(world.store().resident_count(), 0);
    drop(world);

    let reopened = open(&config);
    assert_eq!(reopened.get_block(20, 70, 20, false).unwrap(), (STONE, 5));
}

#[test]
fn test_save_all_writes_each_dirty_chunk_once() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    world.set_block(1, 70, 1, STONE, 0).unwrap();
    world.set_block(1601, 70, 1, STONE, 0).unwrap();
    assert_eq!(world.save_all().unwrap(), 2);
    assert_eq!(world.save_all().unwrap(), 0);
}

#[test]
fn test_corrupt_chunk_file_is_left_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let world = open(&config);

    let path = chunk_path(world.store().world_dir(), ChunkPos::new(2, 2));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"not a chunk").unwrap();

    assert!(matches!(
        world.get_block(32, 10, 32, true),
        Err(WorldError::ChunkUnavailable { cx: 2, cz: 2 })
    ));
    world.shutdown().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"not a chunk");
}

#[test]
fn test_chest_contents_survive_reload() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let pos = BlockPos::new(4, 64, 4);

    let world = open(&config);
    let mut chest = Chest::new(pos);
    chest.slots[3] = ItemSlot::new(280, 12, 0);
    world.set_tile_entity(TileEntity::Chest(chest), None).unwrap();
    world.shutdown().unwrap();
    drop(world);

    let reopened = open(&config);
    let Some(TileEntity::Chest(loaded)) = reopened.tile_entity_at(pos).unwrap() else {
        panic!("chest missing after reload");
    };
    assert_eq!(loaded.slots[3], ItemSlot::new(280, 12, 0));
    assert!(
        loaded
            .slots
            .iter()
            .enumerate()
            .all(|(i, slot)| i == 3 || slot.is_empty())
    );
}

#[test]
fn test_send_chunk_event_sequence() {
    let dir = TempDir::new().unwrap();
    let (sink, rx) = ChannelSink::new();
    let world = World::open(
        &config(&dir),
        Box::new(FlatGenerator::default()),
        Arc::new(sink),
    )
    .unwrap();

    let sign_pos = BlockPos::new(-14, 64, 3);
    world
        .set_tile_entity(
            TileEntity::Sign(Sign {
                pos: sign_pos,
                lines: ["a".into(), "b".into(), String::new(), "d".into()],
            }),
            None,
        )
        .unwrap();
    world.send_chunk(ClientId(7), -1, 0).unwrap();

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|(to, _)| *to == Recipient::Client(ClientId(7))));

    assert_eq!(
        events[0].1,
        WorldEvent::PreChunk {
            pos: ChunkPos::new(-1, 0)
        }
    );
    let WorldEvent::ChunkData {
        origin,
        size,
        payload,
    } = &events[1].1
    else {
        panic!("expected chunk data, got {:?}", events[1].1);
    };
    assert_eq!(*origin, BlockPos::new(-16, 0, 0));
    assert_eq!(*size, (16, 128, 16));
    let mut raw = Vec::new();
    ZlibDecoder::new(payload.as_slice())
        .read_to_end(&mut raw)
        .unwrap();
    assert_eq!(raw.len(), PAYLOAD_LEN);

    let WorldEvent::SignText { pos, lines } = &events[2].1 else {
        panic!("expected sign text, got {:?}", events[2].1);
    };
    assert_eq!(*pos, sign_pos);
    assert_eq!(lines[1], "b");
}

#[test]
fn test_block_change_only_for_resident_chunks() {
    let dir = TempDir::new().unwrap();
    let (sink, rx) = ChannelSink::new();
    let world = World::open(
        &config(&dir),
        Box::new(FlatGenerator::default()),
        Arc::new(sink),
    )
    .unwrap();

    assert!(!world.send_block_change(40, 64, 40, STONE, 0).unwrap());
    world.get_block(40, 64, 40, true).unwrap();
    assert!(world.send_block_change(40, 64, 40, STONE, 0).unwrap());

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![(
            Recipient::Watchers(ChunkPos::new(2, 2)),
            WorldEvent::BlockChange {
                pos: BlockPos::new(40, 64, 40),
                id: STONE,
                metadata: 0,
            }
        )]
    );
}

#[test]
fn test_pickup_falls_and_settles_when_support_removed() {
    let dir = TempDir::new().unwrap();
    let (sink, rx) = ChannelSink::new();
    let world = World::open(
        &config(&dir),
        Box::new(FlatGenerator::default()),
        Arc::new(sink),
    )
    .unwrap();

    let id = world.spawn_pickup(5, 90, 5, 4, 1, 5, 42).unwrap();
    let item = world.overlay().get(id).unwrap();
    assert_eq!(item.pos, FixedPos::new(5 * 32 + 15, 64 * 32, 5 * 32 + 15));
    assert_eq!(item.spawned_by, 42);

    let handle = world.store().resident(ChunkPos::new(0, 0)).unwrap();
    assert!(handle.lock().pending_items().contains(&id));

    let (to, event) = rx.try_iter().last().unwrap();
    assert_eq!(to, Recipient::Watchers(ChunkPos::new(0, 0)));
    assert!(matches!(event, WorldEvent::PickupSpawned { entity_id, .. } if entity_id == id));

    world.set_block(5, 63, 5, AIR, 0).unwrap();
    assert_eq!(world.overlay().get(id).unwrap().pos.y, 63 * 32);

    assert!(world.remove_item(id).is_some());
    assert!(!handle.lock().pending_items().contains(&id));
}

#[test]
fn test_mature_sapling_becomes_tree() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.world.sapling_growth_odds = 1;
    let world = open(&config);

    world.plant_sapling(8, 64, 8, 3).unwrap();
    assert_eq!(world.saplings().len(), 1);

    assert_eq!(world.tick_growth(), 1);
    assert!(world.saplings().is_empty());
    assert_eq!(world.get_block(8, 64, 8, false).unwrap().0, LOG);
    assert_eq!(world.get_block(8, 67, 8, false).unwrap().0, LOG);
}

#[test]
fn test_block_edits_at_the_grid_edge() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    world.set_block(i32::MAX, 70, 0, STONE, 0).unwrap();
    world.set_block(i32::MIN, 70, i32::MIN, STONE, 0).unwrap();
    assert_eq!(world.get_block(i32::MAX, 70, 0, false).unwrap().0, STONE);
    assert_eq!(world.save_all().unwrap(), 2);
}

#[test]
fn test_pickup_beyond_fixed_point_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));

    assert!(matches!(
        world.spawn_pickup(70_000_000, 90, 0, 4, 1, 5, 1),
        Err(WorldError::BeyondItemRange { x: 70_000_000, z: 0 })
    ));
    assert!(world.overlay().is_empty());
    assert!(matches!(
        world.send_chunk(ClientId(1), 1 << 27, 0),
        Err(WorldError::ChunkUnavailable { .. })
    ));
}

#[test]
fn test_player_placed_chest_is_owned_and_lock_is_enforced() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.world.chests_locked_by_default = true;
    let pos = BlockPos::new(6, 64, 6);

    let world = open(&config);
    world
        .set_tile_entity(TileEntity::Chest(Chest::new(pos)), Some("alice"))
        .unwrap();
    let placed = world.tile_entity_at(pos).unwrap().unwrap();
    assert_eq!(placed.lock(), Some(&Lock::new("alice", true)));

    let mut refill = Chest::new(pos);
    refill.slots[0] = ItemSlot::new(4, 10, 0);
    assert!(matches!(
        world.set_tile_entity(TileEntity::Chest(refill.clone()), Some("bob")),
        Err(WorldError::Locked { x: 6, y: 64, z: 6 })
    ));
    assert!(matches!(
        world.set_tile_entity(TileEntity::Chest(refill.clone()), None),
        Err(WorldError::Locked { .. })
    ));

    world
        .set_tile_entity(TileEntity::Chest(refill), Some("alice"))
        .unwrap();
    world.shutdown().unwrap();
    drop(world);

    let reopened = open(&config);
    let Some(TileEntity::Chest(stored)) = reopened.tile_entity_at(pos).unwrap() else {
        panic!("chest missing after reload");
    };
    assert_eq!(stored.slots[0], ItemSlot::new(4, 10, 0));
    assert_eq!(stored.lock, Some(Lock::new("alice", true)));
}

#[test]
fn test_unlocked_container_is_open_to_everyone() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));
    let pos = BlockPos::new(9, 64, 9);

    world
        .set_tile_entity(TileEntity::Chest(Chest::new(pos)), Some("alice"))
        .unwrap();
    let mut replacement = Chest::new(pos);
    replacement.slots[2] = ItemSlot::new(5, 1, 0);
    world
        .set_tile_entity(TileEntity::Chest(replacement), Some("bob"))
        .unwrap();

    let stored = world.tile_entity_at(pos).unwrap().unwrap();
    assert_eq!(stored.lock(), Some(&Lock::new("alice", false)));
}

#[test]
fn test_item_back_references_return_after_eviction() {
    let dir = TempDir::new().unwrap();
    let world = open(&config(&dir));
    let chunk = ChunkPos::new(3, 3);

    let id = world.spawn_pickup(50, 90, 50, 4, 1, 5, 7).unwrap();
    assert!(world.store().evict(chunk).unwrap());
    assert!(!world.store().is_resident(chunk));

    world.get_block(50, 64, 50, false).unwrap();
    let handle = world.store().resident(chunk).unwrap();
    assert_eq!(handle.lock().pending_items(), &[id]);
}

#[test]
fn test_saplings_survive_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let world = open(&config);
    world.advance_time(40);
    world.plant_sapling(12, 64, -3, 9).unwrap();
    world.save_all().unwrap();
    drop(world);

    let reopened = open(&config);
    let saplings = reopened.saplings();
    assert_eq!(saplings.len(), 1);
    assert_eq!(saplings[0].pos, BlockPos::new(12, 64, -3));
    assert_eq!(saplings[0].planted_at, 40);
    assert_eq!(saplings[0].planted_by, 9);
}
