//! Create, list, edit and delete pendulum records.
//!
//! Single-record edits bypass the coordinator's transition lock; the next
//! collision pass simply re-snapshots. Population-wide start/stop goes through
//! the coordinator instead.

use pendulum_shared::{NewPendulum, Pendulum, PendulumPatch};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::error::CoreError;
use crate::store::PendulumStore;

/// UUID v4 strings from a ChaCha stream. Seedable for reproducible runs.
pub struct IdGenerator {
    rng: ChaCha8Rng,
}

impl IdGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        bytes[6] = (bytes[6] & 0x0f) | 0x40; // version 4
        bytes[8] = (bytes[8] & 0x3f) | 0x80; // RFC 4122 variant

        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

pub struct Registry<S> {
    store: Arc<S>,
    clock: Clock,
    ids: Mutex<IdGenerator>,
}

impl<S: PendulumStore> Registry<S> {
    pub fn new(store: Arc<S>, clock: Clock, ids: IdGenerator) -> Self {
        Self {
            store,
            clock,
            ids: Mutex::new(ids),
        }
    }

    pub async fn list(&self) -> Result<Vec<Pendulum>, CoreError> {
        Ok(self.store.load_all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Pendulum, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// New records start moving, with their phase beginning now.
    pub async fn create(&self, params: NewPendulum) -> Result<Pendulum, CoreError> {
        params.validate()?;
        let id = self.next_id();
        let pendulum = Pendulum::create(id, &params, self.clock.now_ms())?;
        self.store.insert(pendulum.clone()).await?;
        tracing::info!("Created pendulum {}", pendulum.id);
        Ok(pendulum)
    }

    /// Merge `patch` into the stored record. Motion state is left alone.
    pub async fn update(&self, id: &str, patch: PendulumPatch) -> Result<Pendulum, CoreError> {
        patch.validate()?;
        self.store
            .update(id, |p| patch.apply(p))
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Deleting an unknown id is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        if self.store.remove(id).await? {
            tracing::info!("Deleted pendulum {}", id);
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<usize, CoreError> {
        let removed = self.store.clear().await?;
        tracing::info!("Deleted all {} pendulums", removed);
        Ok(removed)
    }

    fn next_id(&self) -> String {
        // A poisoned generator is still a valid RNG state
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.next_id()
    }
}
