use shared_kv::{ConcurrencyMode, DefaultStore, Error, SyncStore};
use shardmap::ShardMap;
use std::collections::HashMap;

fn temp_store(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("store.json")
}

// ---- basic contract ---------------------------------------------------------

#[test]
fn open_creates_file_with_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_store(&dir);
    assert!(!path.exists());

    let db = SyncStore::<String, i32, ShardMap<String, i32>>::open(&path, ConcurrencyMode::Threaded)
        .unwrap();
    assert!(path.is_file());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(db.snapshot().unwrap().is_empty());
    assert_eq!(db.path(), path.as_path());
}

#[test]
fn get_on_never_set_key_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    assert_eq!(db.get(&"ghost".into()).unwrap(), None);
    assert!(!db.contains_key(&"ghost".into()).unwrap());
}

#[test]
fn set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.set("a".into(), 1).unwrap();
    assert_eq!(db.get(&"a".into()).unwrap(), Some(1));
    db.set("a".into(), 2).unwrap();
    assert_eq!(db.get(&"a".into()).unwrap(), Some(2));
    assert_eq!(db.len().unwrap(), 1);
}

#[test]
fn delete_present_and_absent() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.set("a".into(), 1).unwrap();

    let before = db.snapshot().unwrap();
    assert_eq!(db.delete(&"zzz".into()).unwrap(), None);
    assert_eq!(db.snapshot().unwrap(), before);

    assert_eq!(db.delete(&"a".into()).unwrap(), Some(1));
    assert!(db.is_empty().unwrap());
}

#[test]
fn writes_are_visible_to_a_second_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_store(&dir);
    let writer = DefaultStore::<String, String>::open(&path, ConcurrencyMode::Threaded).unwrap();
    let reader = DefaultStore::<String, String>::open(&path, ConcurrencyMode::Threaded).unwrap();

    writer.set("k".into(), "v".into()).unwrap();
    assert_eq!(reader.get(&"k".into()).unwrap(), Some("v".into()));

    writer.delete(&"k".into()).unwrap();
    assert_eq!(reader.get(&"k".into()).unwrap(), None);
}

#[test]
fn reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_store(&dir);
    {
        let db = DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded).unwrap();
        db.set(1, 10).unwrap();
        db.set(2, 20).unwrap();
    }
    let db = DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded).unwrap();
    let expected: HashMap<u32, i64> = [(1, 10), (2, 20)].into_iter().collect();
    assert_eq!(db.snapshot().unwrap(), expected);
}

#[test]
fn sequential_replay_matches_hashmap() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<u32, u32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    let mut model = HashMap::new();

    for i in 0..60u32 {
        let key = (i * 7) % 11;
        match i % 3 {
            0 => assert_eq!(db.delete(&key).unwrap(), model.remove(&key)),
            _ => {
                db.set(key, i).unwrap();
                model.insert(key, i);
            }
        }
        assert_eq!(db.get(&key).unwrap(), model.get(&key).copied());
    }
    assert_eq!(db.snapshot().unwrap(), model);
}

// ---- write-path extras --------------------------------------------------------

#[test]
fn clear_removes_all_entries() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.extend(vec![("a".into(), 1), ("b".into(), 2)]).unwrap();
    assert_eq!(db.len().unwrap(), 2);

    db.clear().unwrap();
    assert!(db.is_empty().unwrap());
    assert_eq!(std::fs::read_to_string(db.path()).unwrap(), "{}");
}

#[test]
fn extend_overwrites_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.set("a".into(), 1).unwrap();

    db.extend(vec![("a".into(), 99), ("b".into(), 2)]).unwrap();
    assert_eq!(db.get(&"a".into()).unwrap(), Some(99));
    assert_eq!(db.get(&"b".into()).unwrap(), Some(2));
}

#[test]
fn update_existing_key() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.set("counter".into(), 10).unwrap();

    assert!(db.update(&"counter".into(), |v| *v += 5).unwrap());
    assert_eq!(db.get(&"counter".into()).unwrap(), Some(15));
}

#[test]
fn update_missing_key_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();

    assert!(!db.update(&"nope".into(), |v| *v += 1).unwrap());
    assert!(db.is_empty().unwrap());
}

#[test]
fn transaction_persists_and_returns() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::open(temp_store(&dir), ConcurrencyMode::Threaded).unwrap();
    db.set("a".into(), 1).unwrap();

    let prev = db
        .transaction(|mem| {
            let prev = mem.delete(&"a".to_string());
            mem.set("b".into(), 2);
            prev
        })
        .unwrap();
    assert_eq!(prev, Some(1));
    assert_eq!(db.get(&"a".into()).unwrap(), None);
    assert_eq!(db.get(&"b".into()).unwrap(), Some(2));
}

// ---- builder ----------------------------------------------------------------

#[test]
fn builder_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::builder(temp_store(&dir))
        .pretty(true)
        .build()
        .unwrap();
    db.set("hello".into(), 1).unwrap();

    let raw = std::fs::read_to_string(db.path()).unwrap();
    assert!(raw.contains('\n'));
    assert!(raw.contains("  "));
}

#[test]
fn builder_compact_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::builder(temp_store(&dir))
        .build()
        .unwrap();
    db.set("hello".into(), 1).unwrap();

    let raw = std::fs::read_to_string(db.path()).unwrap();
    assert!(!raw.contains('\n'));
}

#[test]
fn builder_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let db = DefaultStore::<String, i32>::builder(temp_store(&dir))
        .build()
        .unwrap();
    assert_eq!(db.mode(), ConcurrencyMode::Threaded);
    assert_eq!(db.reader_slots(), shared_kv::DEFAULT_READER_SLOTS);
    assert!(db.lock_names().is_none());
}

#[test]
fn zero_reader_slots_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let res = DefaultStore::<String, i32>::builder(temp_store(&dir))
        .reader_slots(0)
        .build();
    assert!(matches!(res, Err(Error::Config(_))));
}

// ---- debug ------------------------------------------------------------------

#[test]
fn debug_impls_dont_panic() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_store(&dir);
    let db = DefaultStore::<String, i32>::open(&path, ConcurrencyMode::Threaded).unwrap();

    let dbg_store = format!("{:?}", db);
    assert!(dbg_store.contains("SyncStore"));
    assert!(dbg_store.contains("path"));

    let builder = DefaultStore::<String, i32>::builder(&path);
    assert!(format!("{:?}", builder).contains("SyncStoreBuilder"));
}
