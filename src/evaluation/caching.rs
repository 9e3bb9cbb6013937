//! # Makespan Caches
//!
//! Elites are carried over as bare chromosomes and re-evaluated every
//! generation, and tournament winners are often cloned unchanged. Caching the
//! makespan by chromosome avoids decoding the same sequence twice.
//!
//! Two flavors are provided: [`CachedEvaluator`] shares one map behind a mutex,
//! [`ThreadLocalCachedEvaluator`] keeps one map per rayon worker to avoid
//! contention during parallel evaluation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::chromosome::{Chromosome, Makespan};
use crate::error::{GeneticError, Result};
use crate::evaluation::FitnessEvaluator;

/// A wrapper around an evaluator that caches makespans in a shared map.
#[derive(Debug, Clone)]
pub struct CachedEvaluator<E: FitnessEvaluator> {
    evaluator: E,
    cache: Arc<Mutex<HashMap<Chromosome, Makespan>>>,
}

impl<E: FitnessEvaluator> CachedEvaluator<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a reference to the wrapped evaluator.
    pub fn inner(&self) -> &E {
        &self.evaluator
    }

    /// Returns the number of cached makespans.
    pub fn cache_size(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl<E: FitnessEvaluator> FitnessEvaluator for CachedEvaluator<E> {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan> {
        let cached = self
            .cache
            .lock()
            .map_err(|_| GeneticError::Other("makespan cache lock poisoned".to_string()))?
            .get(chromosome)
            .copied();
        if let Some(makespan) = cached {
            return Ok(makespan);
        }

        // Decode outside the lock; errors are never cached.
        let makespan = self.evaluator.makespan(chromosome)?;
        self.cache
            .lock()
            .map_err(|_| GeneticError::Other("makespan cache lock poisoned".to_string()))?
            .insert(chromosome.clone(), makespan);
        Ok(makespan)
    }
}

/// A wrapper around an evaluator with one cache per thread.
#[derive(Debug)]
pub struct ThreadLocalCachedEvaluator<E: FitnessEvaluator> {
    evaluator: E,
    cache: thread_local::ThreadLocal<RefCell<HashMap<Chromosome, Makespan>>>,
}

impl<E: FitnessEvaluator> ThreadLocalCachedEvaluator<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            cache: thread_local::ThreadLocal::new(),
        }
    }

    pub fn inner(&self) -> &E {
        &self.evaluator
    }

    /// Number of makespans cached by the calling thread.
    pub fn local_cache_size(&self) -> usize {
        self.cache
            .get()
            .and_then(|cell| cell.try_borrow().ok())
            .map_or(0, |cache| cache.len())
    }

    fn local(&self) -> &RefCell<HashMap<Chromosome, Makespan>> {
        self.cache.get_or(|| RefCell::new(HashMap::new()))
    }
}

impl<E: FitnessEvaluator> FitnessEvaluator for ThreadLocalCachedEvaluator<E> {
    fn makespan(&self, chromosome: &Chromosome) -> Result<Makespan> {
        let cell = self.local();
        if let Some(makespan) = cell.try_borrow().ok().and_then(|c| c.get(chromosome).copied()) {
            return Ok(makespan);
        }

        let makespan = self.evaluator.makespan(chromosome)?;
        if let Ok(mut cache) = cell.try_borrow_mut() {
            cache.insert(chromosome.clone(), makespan);
        }
        Ok(makespan)
    }
}
