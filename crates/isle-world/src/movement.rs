//! Moving an organism between two cells.
//!
//! Both cells are locked in ascending index order with a bounded wait on each,
//! so two movers heading opposite ways can never wait on each other forever.
//! A move that cannot get both locks in time is abandoned for this cycle.

use crate::cell::Admission;
use crate::ecosystem::Ecosystem;
use crate::organism::Organism;
use isle_core::DeathCause;
use std::sync::Arc;
use tracing::trace;

/// What happened to one move attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: usize, to: usize },
    /// The walk ended where it started
    Stayed,
    /// A lock was not acquired within the timeout
    Contended,
    /// The destination bucket was full; the organism died
    Overcrowded,
    /// The organism was no longer in its source cell
    Vanished,
}

pub fn relocate(eco: &Ecosystem, organism: &Arc<Organism>, destination: usize) -> MoveOutcome {
    let source = organism.cell_index();
    if source == destination {
        return MoveOutcome::Stayed;
    }

    let grid = eco.grid();
    let timeout = eco.config().engine.lock_timeout();
    let (low, high) = if source < destination {
        (source, destination)
    } else {
        (destination, source)
    };

    let Some(mut first) = grid.cell(low).try_lock_for(timeout) else {
        trace!(organism_id = %organism.id(), cell = low, "move abandoned, lock busy");
        return MoveOutcome::Contended;
    };
    let Some(mut second) = grid.cell(high).try_lock_for(timeout) else {
        drop(first);
        trace!(organism_id = %organism.id(), cell = high, "move abandoned, lock busy");
        return MoveOutcome::Contended;
    };

    let (from, to) = if source == low {
        (&mut *first, &mut *second)
    } else {
        (&mut *second, &mut *first)
    };

    if !from.remove(organism) {
        return MoveOutcome::Vanished;
    }
    organism.set_cell(destination);

    let capacity = eco.registry().max_per_cell(organism.species());
    let outcome = match to.insert(Arc::clone(organism), capacity) {
        Admission::Admitted => MoveOutcome::Moved {
            from: source,
            to: destination,
        },
        Admission::Overcrowded => {
            organism.die_detached(eco, DeathCause::Overcrowding);
            MoveOutcome::Overcrowded
        }
    };

    drop(second);
    drop(first);
    outcome
}
