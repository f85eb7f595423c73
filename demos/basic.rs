use shared_kv::{ConcurrencyMode, DefaultStore};

fn main() -> Result<(), shared_kv::Error> {
    let path = std::env::temp_dir().join("shared_kv_example_basic.json");
    let _ = std::fs::remove_file(&path);
    let db = DefaultStore::<String, i32>::open(&path, ConcurrencyMode::Threaded)?;

    // set / get / delete
    db.set("apples".into(), 3)?;
    db.set("bananas".into(), 5)?;
    println!("apples  = {:?}", db.get(&"apples".into())?);
    println!("bananas = {:?}", db.get(&"bananas".into())?);
    println!("cherries (never set) = {:?}", db.get(&"cherries".into())?);

    // atomic read-modify-write
    db.update(&"apples".into(), |n| *n += 1)?;
    println!("apples after update = {:?}", db.get(&"apples".into())?);

    // bulk insert, one file write
    db.extend(vec![("grapes".into(), 12), ("lemons".into(), 7)])?;

    println!("removed bananas = {:?}", db.delete(&"bananas".into())?);
    println!("snapshot = {:?}", db.snapshot()?);
    println!("on disk  = {}", std::fs::read_to_string(&path).unwrap_or_default());

    db.clear()?;
    println!("after clear: len = {}", db.len()?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
