use crossbeam_utils::thread;
use kvstore::drivers::{InstanceCache, MemoryDriver, MemoryFactory};
use kvstore::{Driver, DriverConfig, DriverExt, DriverFactory, Result, Value};
use serde_json::json;
use std::sync::Arc;

fn factory() -> MemoryFactory {
    MemoryFactory::new(Arc::new(InstanceCache::default()))
}

#[test]
fn get_set_delete() -> Result<()> {
    let store = factory().open(&DriverConfig::new())?;

    assert_eq!(store.get("name")?, None);

    store.set("name", "Fredrik".into())?;
    assert_eq!(store.get("name")?, Some(Value::from("Fredrik")));

    store.delete("name")?;
    assert_eq!(store.get("name")?, None);
    Ok(())
}

#[test]
fn get_set_structured() -> Result<()> {
    let store = MemoryDriver::new();

    store.set("profile", Value::Structured(json!({"city": "Stockholm"})))?;
    let profile = store.get("profile")?.expect("profile should be present");
    assert_eq!(
        profile.as_structured().and_then(|v| v["city"].as_str()),
        Some("Stockholm")
    );
    Ok(())
}

#[test]
fn get_set_bytes() -> Result<()> {
    let store = MemoryDriver::new();

    store.set("blob", b"Fredrik".to_vec().into())?;
    assert_eq!(store.get("blob")?, Some(Value::Bytes(b"Fredrik".to_vec())));
    Ok(())
}

#[test]
fn overwrite_keeps_count() -> Result<()> {
    let store = MemoryDriver::new();

    store.set("name", "Fredrik".into())?;
    store.set("name", "Anna".into())?;
    assert_eq!(store.count()?, 1);
    assert_eq!(store.get("name")?, Some(Value::from("Anna")));
    Ok(())
}

#[test]
fn count_tracks_distinct_keys() -> Result<()> {
    let store = MemoryDriver::new();
    assert_eq!(store.count()?, 0);

    for i in 0..10 {
        store.set(&format!("key{}", i), format!("value{}", i).into())?;
    }
    assert_eq!(store.count()?, 10);

    store.delete("key3")?;
    store.delete("key7")?;
    assert_eq!(store.count()?, 8);
    Ok(())
}

#[test]
fn delete_missing_key_is_noop() -> Result<()> {
    let store = MemoryDriver::new();
    store.set("name", "Fredrik".into())?;

    store.delete("missing")?;
    assert_eq!(store.count()?, 1);
    Ok(())
}

#[test]
fn exists_follows_get() -> Result<()> {
    let store = MemoryDriver::new();
    assert!(!store.exists("name")?);

    store.set("name", b"Fredrik".to_vec().into())?;
    assert!(store.exists("name")?);

    store.set("empty", "".into())?;
    assert!(store.exists("empty")?);

    store.set("null", Value::Structured(json!(null)))?;
    assert!(store.exists("null")?);
    Ok(())
}

#[test]
fn keys_and_flush() -> Result<()> {
    let store = MemoryDriver::new();
    assert!(store.keys()?.is_empty());

    store.set("name", "Fredrik".into())?;
    assert_eq!(store.keys()?, vec!["name".to_owned()]);

    store.set("city", "Stockholm".into())?;
    let mut keys = store.keys()?;
    keys.sort();
    assert_eq!(keys, vec!["city".to_owned(), "name".to_owned()]);

    store.flush()?;
    assert_eq!(store.count()?, 0);
    assert!(store.keys()?.is_empty());
    Ok(())
}

#[test]
fn close_is_idempotent_and_keeps_data() -> Result<()> {
    let store = MemoryDriver::new();
    store.set("name", "Fredrik".into())?;

    store.close()?;
    store.close()?;
    assert_eq!(store.get("name")?, Some(Value::from("Fredrik")));
    Ok(())
}

#[test]
fn named_instances_are_shared_and_isolated() -> Result<()> {
    let factory = factory();

    assert_eq!(factory.open(&DriverConfig::new())?.count()?, 0);
    assert_eq!(factory.open(&DriverConfig::instance("cache"))?.count()?, 0);

    factory
        .open(&DriverConfig::instance("cache"))?
        .set("x", "1".into())?;

    assert_eq!(factory.open(&DriverConfig::new())?.count()?, 0);
    assert_eq!(factory.open(&DriverConfig::instance("cache"))?.count()?, 1);
    assert_eq!(factory.cache().names(), vec!["cache".to_owned(), "default".to_owned()]);
    Ok(())
}

#[test]
fn same_name_returns_same_instance() {
    let cache = InstanceCache::default();
    let a = cache.get_or_create("a");
    let again = cache.get_or_create("a");
    let b = cache.get_or_create("b");

    assert!(Arc::ptr_eq(&a, &again));
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);
}

#[test]
fn concurrent_first_open_creates_one_instance() -> Result<()> {
    let cache = InstanceCache::default();

    let instances = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| s.spawn(|_| cache.get_or_create("race")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("open thread panicked"))
            .collect::<Vec<_>>()
    })
    .expect("scope panicked");

    assert_eq!(cache.len(), 1);
    for instance in &instances {
        assert!(Arc::ptr_eq(instance, &instances[0]));
    }
    Ok(())
}

#[test]
fn concurrent_writers_and_readers() -> Result<()> {
    let store = MemoryDriver::new();

    thread::scope(|s| {
        for t in 0..8 {
            let store = &store;
            s.spawn(move |_| {
                for i in 0..100 {
                    let key = format!("t{}-{}", t, i);
                    store.set(&key, Value::from(key.as_str())).expect("set failed");
                    assert!(store.exists(&key).expect("exists failed"));
                    store.count().expect("count failed");
                }
            });
        }
    })
    .expect("scope panicked");

    assert_eq!(store.count()?, 800);
    Ok(())
}

#[test]
fn typed_helpers() -> Result<()> {
    let store = MemoryDriver::new();

    let mut city = String::new();
    assert!(!store.get_into("city", &mut city)?);

    store.set_serialized("profile", &json!({"city": "Stockholm"}))?;
    let mut profile = serde_json::Value::Null;
    assert!(store.get_into("profile", &mut profile)?);
    assert_eq!(profile["city"], "Stockholm");
    Ok(())
}
