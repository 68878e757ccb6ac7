use chrono::Utc;
use rusqlite::Connection;
use strata_primitives::{ChunkCoord, LocalPos, PlayerId};
use strata_store::store::{NewNode, RegisterPlayer};
use strata_store::{build_pool, run_migrations, PoolConfig, Store};
use tempfile::NamedTempFile;

fn open_store() -> (Store, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();
    {
        let mut conn = Connection::open(&path).unwrap();
        run_migrations(&mut conn).unwrap();
    }
    let pool = build_pool(&path, &PoolConfig::default()).unwrap();
    (Store::new(pool), file)
}

#[test_log::test]
fn ensure_chunk_is_idempotent() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let coord = ChunkCoord::new(3, -2);

    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();
    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM chunks WHERE chunk_x = ?1 AND chunk_z = ?2",
            rusqlite::params![coord.x, coord.z],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test_log::test]
fn create_and_fetch_node_round_trips() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let coord = ChunkCoord::new(0, 0);
    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

    let node = store
        .create_node(
            &conn,
            NewNode {
                chunk: coord,
                local: LocalPos::new(4, 5),
                node_type: 1,
                node_subtype: None,
                max_yield: 100,
                regeneration_rate: 1,
                spawn_type: 0,
                spawned_at: Utc::now(),
            },
            100,
        )
        .unwrap();

    assert_eq!(node.max_yield, 100);
    assert_eq!(node.current_yield, 100);
    assert!(node.is_active);

    let fetched = store.get_node(&conn, node.node_id).unwrap().unwrap();
    assert_eq!(fetched.local.x, 4);
    assert_eq!(fetched.local.z, 5);
}

#[test_log::test]
fn active_cell_uniqueness_is_enforced_by_schema() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let coord = ChunkCoord::new(0, 0);
    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

    let local = LocalPos::new(1, 1);
    let new_node = |t: i32| NewNode {
        chunk: coord,
        local,
        node_type: t,
        node_subtype: None,
        max_yield: 10,
        regeneration_rate: 1,
        spawn_type: 0,
        spawned_at: Utc::now(),
    };

    store.create_node(&conn, new_node(1), 10).unwrap();
    let second = store.create_node(&conn, new_node(2), 10);
    assert!(second.is_err(), "a second active node at the same cell must violate the partial unique index");
}

#[test_log::test]
fn deactivate_then_respawn_sweep_reactivates_node() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let coord = ChunkCoord::new(1, 1);
    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

    let node = store
        .create_node(
            &conn,
            NewNode {
                chunk: coord,
                local: LocalPos::new(0, 0),
                node_type: 1,
                node_subtype: None,
                max_yield: 50,
                regeneration_rate: 5,
                spawn_type: 0,
                spawned_at: Utc::now(),
            },
            50,
        )
        .unwrap();

    let now = Utc::now();
    let respawn_at = now - chrono::Duration::seconds(1); // already elapsed
    store.deactivate_node(&conn, node.node_id, respawn_at, now).unwrap();

    let due = store.get_nodes_to_respawn(&conn, coord, now).unwrap();
    assert_eq!(due, vec![node.node_id]);

    store.reactivate_node(&conn, node.node_id, node.max_yield).unwrap();
    let reactivated = store.get_node(&conn, node.node_id).unwrap().unwrap();
    assert!(reactivated.is_active);
    assert_eq!(reactivated.current_yield, node.max_yield);
}

#[test_log::test]
fn daily_harvest_count_is_scoped_to_calendar_day() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let coord = ChunkCoord::new(0, 0);
    store.ensure_chunk(&conn, coord, Utc::now()).unwrap();

    let node = store
        .create_node(
            &conn,
            NewNode {
                chunk: coord,
                local: LocalPos::new(2, 2),
                node_type: 1,
                node_subtype: None,
                max_yield: 20,
                regeneration_rate: 0,
                spawn_type: 0,
                spawned_at: Utc::now(),
            },
            20,
        )
        .unwrap();
    let player_id = PlayerId(1);
    let today = Utc::now();
    let yesterday = today - chrono::Duration::days(1);

    store.create_harvest_log(&conn, node.node_id, player_id, 5, 20, 15, yesterday).unwrap();
    store.create_harvest_log(&conn, node.node_id, player_id, 5, 15, 10, today).unwrap();

    let count = store
        .get_player_daily_harvest_count(&conn, player_id, node.node_id, today.date_naive())
        .unwrap();
    assert_eq!(count, 1);
}

#[test_log::test]
fn inventory_additions_accumulate() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let player = store
        .create_player(
            &conn,
            RegisterPlayer {
                username: "prospector".into(),
                password_hash: "hash".into(),
                salt: "salt".into(),
                email: None,
            },
            Utc::now(),
        )
        .unwrap();

    store.add_to_inventory(&conn, player.player_id, 1, 0, 10, Utc::now()).unwrap();
    store.add_to_inventory(&conn, player.player_id, 1, 0, 5, Utc::now()).unwrap();

    let inventory = store.get_inventory(&conn, player.player_id).unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].quantity, 15);
}

#[test_log::test]
fn duplicate_username_is_rejected_by_schema() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let register = |name: &str| RegisterPlayer {
        username: name.into(),
        password_hash: "hash".into(),
        salt: "salt".into(),
        email: None,
    };

    store.create_player(&conn, register("scout"), Utc::now()).unwrap();
    let dup = store.create_player(&conn, register("scout"), Utc::now());
    assert!(dup.is_err());
}

#[test_log::test]
fn expired_sessions_are_swept() {
    let (store, _file) = open_store();
    let conn = store.conn().unwrap();
    let player = store
        .create_player(
            &conn,
            RegisterPlayer {
                username: "wanderer".into(),
                password_hash: "hash".into(),
                salt: "salt".into(),
                email: None,
            },
            Utc::now(),
        )
        .unwrap();

    let now = Utc::now();
    store
        .create_session(&conn, "expired-token", player.player_id, now - chrono::Duration::hours(2), now - chrono::Duration::hours(1), None, None)
        .unwrap();
    store
        .create_session(&conn, "fresh-token", player.player_id, now, now + chrono::Duration::hours(1), None, None)
        .unwrap();

    let deleted = store.delete_expired_sessions(&conn, now).unwrap();
    assert_eq!(deleted, 1);
    assert!(store.get_session(&conn, "expired-token").unwrap().is_none());
    assert!(store.get_session(&conn, "fresh-token").unwrap().is_some());
}
