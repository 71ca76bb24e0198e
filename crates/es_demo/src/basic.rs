//! Single-entity walkthrough.

use es_storage::Storage;
use tracing::info;

pub fn run(mut storage: Storage) -> anyhow::Result<()> {
    let health = storage.register_flat::<i32>("health")?;
    let name = storage.register_boxed::<String>("name")?;

    let timmy = storage.create()?;
    storage.set(timmy, health, 20i32)?;
    storage.set(timmy, name, String::from("Timmy"))?;
    info!(
        entity = %timmy,
        health = *storage.get::<i32>(timmy, health)?,
        name = storage.get::<String>(timmy, name)?.as_str(),
        dirty = storage.is_dirty(timmy)?,
        "entity populated"
    );

    let bytes = storage.serialize(timmy)?;
    info!(entity = %timmy, len = bytes.len(), "serialized entity");

    let copy = storage.create()?;
    storage.deserialize(copy, &bytes)?;
    info!(
        entity = %copy,
        health = *storage.get::<i32>(copy, health)?,
        name = storage.get::<String>(copy, name)?.as_str(),
        "restored entity"
    );

    let twin = storage.clone_entity(timmy)?;
    storage.get_mut::<String>(twin, name)?.push_str(" II");
    info!(
        original = storage.get::<String>(timmy, name)?.as_str(),
        clone = storage.get::<String>(twin, name)?.as_str(),
        "cloned entity"
    );

    storage.delete(timmy)?;
    info!(entities = storage.len(), "deleted original");
    Ok(())
}
