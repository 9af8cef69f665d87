//! Initial population.

use crate::ecosystem::Ecosystem;
use crate::pool::WorkerPool;
use crate::scheduler::task_rng;
use isle_core::{Phase, Result, SpeciesId};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// How many organisms seeding created and how many of them found room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub placed: usize,
}

impl SeedReport {
    pub fn rejected(&self) -> usize {
        self.created - self.placed
    }
}

/// Scatters every species' starting population over random cells, one
/// pool task per species.
#[derive(Debug, Default)]
pub struct PopulationSeeder;

impl PopulationSeeder {
    pub fn seed(eco: &Arc<Ecosystem>, pool: &WorkerPool) -> Result<SeedReport> {
        let created = Arc::new(AtomicUsize::new(0));
        let placed = Arc::new(AtomicUsize::new(0));
        let species = eco.registry().len();

        let world = Arc::clone(eco);
        let (created_count, placed_count) = (Arc::clone(&created), Arc::clone(&placed));
        pool.fan_out(Phase::Seed, 0, species, eco.stats(), move |index, cancel| {
            let Some(species) = world.registry().ids().nth(index) else {
                return Ok(());
            };
            let mut rng = task_rng(world.config().engine.seed, 0, Phase::Seed, index);
            let (made, kept) = seed_species(&world, species, &mut rng, cancel)?;
            created_count.fetch_add(made, Ordering::Relaxed);
            placed_count.fetch_add(kept, Ordering::Relaxed);
            Ok(())
        })?;

        let report = SeedReport {
            created: created.load(Ordering::Relaxed),
            placed: placed.load(Ordering::Relaxed),
        };
        info!(
            event = "population_seeded",
            species = species,
            created = report.created,
            placed = report.placed,
            rejected = report.rejected(),
            "Initial population placed"
        );
        Ok(report)
    }
}

fn seed_species(
    eco: &Ecosystem,
    species: SpeciesId,
    rng: &mut ChaCha8Rng,
    cancel: &AtomicBool,
) -> Result<(usize, usize)> {
    let registry = eco.registry();
    let grid = eco.grid();
    let amount = registry.start_amount(species, grid.width, grid.height);
    let (mut created, mut placed) = (0, 0);

    for _ in 0..amount {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let cell = rng.gen_range(0..grid.len());
        let age = random_fraction(rng, registry.max_age(species));
        let saturation = random_fraction(rng, registry.max_saturation(species));

        let organism = eco.spawn(species, cell, age, saturation, 0)?;
        created += 1;
        if organism.is_alive() {
            placed += 1;
        }
    }
    Ok((created, placed))
}

/// Uniform in `[0, bound)` rounded to two decimals; zero for a non-positive bound
fn random_fraction(rng: &mut ChaCha8Rng, bound: f64) -> f64 {
    if bound <= 0.0 {
        return 0.0;
    }
    (rng.gen_range(0.0..bound) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use isle_core::DeathCause;
    use rand::SeedableRng;

    #[test]
    fn test_seed_places_start_amounts() {
        let eco = testing::ecosystem(3, 3);
        let pool = WorkerPool::new(2).unwrap();

        let report = PopulationSeeder::seed(&eco, &pool).unwrap();
        let registry = eco.registry();
        let expected: usize = registry.ids().map(|s| registry.start_amount(s, 3, 3)).sum();
        assert_eq!(report.created, expected);

        let census: usize = eco.census().values().sum();
        assert_eq!(census, report.placed);

        let overcrowded: u64 = registry
            .ids()
            .map(|s| eco.stats().deaths_of(s, DeathCause::Overcrowding))
            .sum();
        assert_eq!(overcrowded as usize, report.rejected());
    }

    #[test]
    fn test_seeded_values_are_in_range() {
        let eco = testing::ecosystem(2, 2);
        let pool = WorkerPool::new(1).unwrap();
        PopulationSeeder::seed(&eco, &pool).unwrap();

        let registry = eco.registry();
        for cell in eco.grid().cells() {
            let population = cell.lock();
            for organism in population.members() {
                let species = organism.species();
                assert!(organism.age() >= 0.0 && organism.age() <= registry.max_age(species));
                assert!(organism.saturation() <= registry.max_saturation(species));
                assert_eq!(organism.cell_index(), cell.index());
            }
        }
    }

    #[test]
    fn test_random_fraction() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(random_fraction(&mut rng, 0.0), 0.0);
        for _ in 0..100 {
            let value = random_fraction(&mut rng, 0.01);
            assert!(value == 0.0 || value == 0.01);
            let value = random_fraction(&mut rng, 30.0);
            assert!((0.0..=30.0).contains(&value));
            assert_eq!(value, (value * 100.0).round() / 100.0);
        }
    }
}
