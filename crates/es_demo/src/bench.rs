//! Position/velocity speed run.

use std::time::Instant;

use es_storage::{Changed, Storage};
use glam::Vec2;
use tracing::info;

pub fn run(mut storage: Storage, entities: u32, iterations: u32) -> anyhow::Result<()> {
    let position = storage.register_flat::<Vec2>("position")?;
    let velocity = storage.register_flat::<Vec2>("velocity")?;

    let started = Instant::now();
    let range = storage.create_batch(entities)?;
    for entity in range {
        let i = entity.id() as f32;
        storage.set(entity, position, Vec2::new(i, 0.0))?;
        storage.set(entity, velocity, Vec2::new(1.0, 0.5))?;
    }
    info!(entities, elapsed_ms = started.elapsed().as_millis() as u64, "populated");

    let started = Instant::now();
    let mut visits = 0;
    for _ in 0..iterations {
        visits += storage.for_each2(
            position,
            velocity,
            |_, p: &mut Vec2, v: &mut Vec2| {
                *p += *v;
                Changed::arg(0)
            },
        )?;
    }
    let elapsed = started.elapsed();
    info!(
        iterations,
        visits,
        elapsed_ms = elapsed.as_millis() as u64,
        ns_per_visit = elapsed.as_nanos() as f64 / visits.max(1) as f64,
        "updated"
    );

    if let Some(first) = range.iter().next() {
        let p = storage.get::<Vec2>(first, position)?;
        info!(entity = %first, x = p.x, y = p.y, "final position");
    }
    Ok(())
}
