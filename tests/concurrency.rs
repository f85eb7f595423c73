use shared_kv::{ConcurrencyMode, DefaultStore};
use std::sync::Arc;
use std::thread;

const KEYS: u32 = 100;
const INCREMENTS: i64 = 10;

fn open(dir: &tempfile::TempDir) -> Arc<DefaultStore<u32, i64>> {
    let path = dir.path().join("threads.json");
    Arc::new(DefaultStore::<u32, i64>::open(path, ConcurrencyMode::Threaded).unwrap())
}

#[test]
fn populate_increment_then_delete_everything() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    for key in 0..KEYS {
        db.set(key, 0).unwrap();
    }

    let mut handles = Vec::new();
    for key in 0..KEYS {
        let updater = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            for _ in 0..INCREMENTS {
                updater.update(&key, |v| *v += 1).unwrap();
            }
        }));
        let reader = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            let v = reader.get(&key).unwrap().unwrap();
            assert!((0..=INCREMENTS).contains(&v));
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for key in 0..KEYS {
        assert_eq!(db.get(&key).unwrap(), Some(INCREMENTS));
    }

    let handles: Vec<_> = (0..KEYS)
        .map(|key| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                assert_eq!(db.delete(&key).unwrap(), Some(INCREMENTS));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(db.snapshot().unwrap().is_empty());
}

#[test]
fn many_writers_per_key_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    let keys = 4u32;
    let writers_per_key = 8;
    let rounds = 15;
    db.extend((0..keys).map(|k| (k, 0))).unwrap();

    let mut handles = Vec::new();
    for key in 0..keys {
        for _ in 0..writers_per_key {
            let db = Arc::clone(&db);
            handles.push(thread::spawn(move || {
                for _ in 0..rounds {
                    db.transaction(|mem| {
                        let v = mem.get(&key).unwrap_or(0);
                        mem.set(key, v + 1);
                    })
                    .unwrap();
                }
            }));
        }
    }
    for h in handles {
        h.join().unwrap();
    }

    let snap = db.snapshot().unwrap();
    for key in 0..keys {
        assert_eq!(snap[&key], writers_per_key * rounds);
    }
}

#[test]
fn readers_never_see_a_torn_snapshot() {
    // Each write keeps both keys equal; a reader overlapping a write would
    // be the only way to see them differ.
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    db.extend(vec![(0, 0), (1, 0)]).unwrap();

    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for i in 1..=100 {
                db.extend(vec![(0, i), (1, i)]).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..6)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..100 {
                    let snap = db.snapshot().unwrap();
                    assert_eq!(snap[&0], snap[&1]);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(db.get(&0).unwrap(), Some(100));
}

#[test]
fn separate_handles_on_one_file_exclude_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handles.json");
    let big_a = "a".repeat(200 * 1024);
    let big_b = "b".repeat(50 * 1024);
    DefaultStore::<u32, String>::open(&path, ConcurrencyMode::Threaded)
        .unwrap()
        .set(0, String::new())
        .unwrap();

    let writers: Vec<_> = [big_a.clone(), big_b.clone()]
        .into_iter()
        .map(|value| {
            let path = path.clone();
            thread::spawn(move || {
                let db = DefaultStore::<u32, String>::open(&path, ConcurrencyMode::Threaded).unwrap();
                for _ in 0..50 {
                    db.set(0, value.clone()).unwrap();
                }
            })
        })
        .collect();
    let reader = {
        let path = path.clone();
        thread::spawn(move || {
            let db = DefaultStore::<u32, String>::open(&path, ConcurrencyMode::Threaded).unwrap();
            for _ in 0..50 {
                let len = db.get(&0).unwrap().map_or(0, |v| v.len());
                assert!([0, 200 * 1024, 50 * 1024].contains(&len));
            }
        })
    };
    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    let db = DefaultStore::<u32, String>::open(&path, ConcurrencyMode::Threaded).unwrap();
    let last = db.get(&0).unwrap().unwrap();
    assert!(last == big_a || last == big_b);
}

#[test]
fn separate_handles_count_every_increment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handle_counts.json");
    DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded)
        .unwrap()
        .set(0, 0)
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let db = DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded).unwrap();
                for _ in 0..INCREMENTS {
                    db.update(&0, |v| *v += 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let db = DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded).unwrap();
    assert_eq!(db.get(&0).unwrap(), Some(8 * INCREMENTS));
}

#[test]
fn handles_with_different_slot_counts_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.json");
    let _first = DefaultStore::<u32, i64>::builder(&path)
        .reader_slots(10)
        .build()
        .unwrap();
    let second = DefaultStore::<u32, i64>::builder(&path).reader_slots(2).build();
    assert!(matches!(second, Err(shared_kv::Error::Config(_))));
}
