use dashmap::DashMap;
use shared_kv::{ConcurrencyMode, SyncStore};

fn main() -> Result<(), shared_kv::Error> {
    let path = std::env::temp_dir().join("shared_kv_example_dashmap.json");
    let _ = std::fs::remove_file(&path);

    let db = SyncStore::<String, u64, DashMap<String, u64>>::builder(&path)
        .mode(ConcurrencyMode::MultiProcess)
        .pretty(true)
        .build()?;

    db.set("counter".into(), 0)?;
    for _ in 0..10 {
        db.update(&"counter".into(), |v| *v += 1)?;
    }
    println!("counter = {:?}", db.get(&"counter".into())?);
    println!("lock objects = {:?}", db.lock_names());

    if let Some(names) = db.lock_names().cloned() {
        drop(db);
        names.unlink()?;
    }
    let _ = std::fs::remove_file(&path);
    Ok(())
}
