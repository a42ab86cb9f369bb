//! Provider Pool
//!
//! Working set of live providers for a single `answer` call. Selection is
//! uniformly random; a provider that fails is dropped for the rest of the
//! call only. The pool copies the agent's list, so discards never touch the
//! agent's configuration and a fresh pool starts with every provider again.

use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::provider::Provider;

#[derive(Clone, Debug)]
pub struct ProviderPool {
    live: Vec<Arc<Provider>>,
}

impl ProviderPool {
    pub fn new(providers: &[Arc<Provider>]) -> Self {
        Self {
            live: providers.to_vec(),
        }
    }

    /// Pick a live provider at random without removing it
    pub fn pick_one(&self) -> Option<Arc<Provider>> {
        self.pick_one_with(&mut rand::thread_rng())
    }

    pub fn pick_one_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Provider>> {
        self.live.choose(rng).cloned()
    }

    /// Remove `provider` from the working set.
    ///
    /// Matches by identity, so two providers with identical settings are
    /// still discarded one at a time. Returns false if it was not live.
    pub fn discard(&mut self, provider: &Arc<Provider>) -> bool {
        match self.live.iter().position(|p| Arc::ptr_eq(p, provider)) {
            Some(index) => {
                self.live.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }
}
