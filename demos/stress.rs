//! Populate a store, hammer it from many threads, check the totals, then
//! delete everything from many threads and check it's empty.

use shared_kv::{ConcurrencyMode, DefaultStore};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const KEYS: u32 = 100;
const INCREMENTS: i64 = 10;

fn main() -> Result<(), shared_kv::Error> {
    let path = std::env::temp_dir().join("shared_kv_example_stress.json");
    let _ = std::fs::remove_file(&path);
    let db = Arc::new(DefaultStore::<u32, i64>::open(&path, ConcurrencyMode::Threaded)?);

    let start = Instant::now();
    db.extend((0..KEYS).map(|k| (k, 0)))?;

    let mut handles = Vec::new();
    for key in 0..KEYS {
        let updater = Arc::clone(&db);
        handles.push(thread::spawn(move || -> shared_kv::Result<()> {
            for _ in 0..INCREMENTS {
                updater.update(&key, |v| *v += 1)?;
            }
            Ok(())
        }));
        let reader = Arc::clone(&db);
        handles.push(thread::spawn(move || reader.get(&key).map(drop)));
    }
    for h in handles {
        h.join().expect("worker thread panicked")?;
    }

    let snapshot = db.snapshot()?;
    assert!(snapshot.values().all(|&v| v == INCREMENTS));
    println!("after populating: {} keys, all = {INCREMENTS}", snapshot.len());

    let handles: Vec<_> = (0..KEYS)
        .map(|key| {
            let db = Arc::clone(&db);
            thread::spawn(move || db.delete(&key).map(drop))
        })
        .collect();
    for h in handles {
        h.join().expect("worker thread panicked")?;
    }

    assert!(db.snapshot()?.is_empty());
    println!("after deleting: empty ({:?} total)", start.elapsed());

    let _ = std::fs::remove_file(&path);
    Ok(())
}
