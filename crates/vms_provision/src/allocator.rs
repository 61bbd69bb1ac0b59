//! Tenant identity allocation.
//!
//! Candidates are drawn at random and probed against the store one by one. The
//! check is read-then-act: nothing is reserved, and the store's uniqueness
//! constraint on the tenant record is what finally decides.

use rand::Rng;
use vms_ids::{TenantId, DEFAULT_TENANT_ID_LEN, MAX_TENANT_ID_LEN};
use vms_store::{CollectionStore, StoreError};

use crate::error::ProvisionError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Result of an allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Allocated(TenantId),
    /// Every candidate was already taken.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantIdAllocator {
    max_attempts: u32,
    length: usize,
}

impl Default for TenantIdAllocator {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            length: DEFAULT_TENANT_ID_LEN,
        }
    }
}

impl TenantIdAllocator {
    /// Allocator producing ids of exactly `length` characters.
    ///
    /// Fails if `length` is zero or above [`MAX_TENANT_ID_LEN`].
    pub fn new(max_attempts: u32, length: usize) -> Result<Self, ProvisionError> {
        if !(1..=MAX_TENANT_ID_LEN).contains(&length) {
            return Err(ProvisionError::InvalidIdLength {
                length,
                max: MAX_TENANT_ID_LEN,
            });
        }
        Ok(Self {
            max_attempts,
            length,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Probe up to `max_attempts` random candidates and return the first free one.
    ///
    /// A probe that fails is returned as an error; exhaustion is not an error.
    pub async fn allocate<R>(
        &self,
        store: &dyn CollectionStore,
        rng: &mut R,
    ) -> Result<Allocation, StoreError>
    where
        R: Rng + Send + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = TenantId::generate(rng, self.length);
            if store.identifier_in_use(&candidate).await? {
                tracing::debug!(
                    "Tenant ID candidate {} already in use (attempt {}/{})",
                    candidate,
                    attempt,
                    self.max_attempts
                );
                continue;
            }
            tracing::info!("Allocated tenant ID {} after {} attempt(s)", candidate, attempt);
            return Ok(Allocation::Allocated(candidate));
        }

        tracing::warn!(
            "Tenant ID allocation exhausted after {} attempts",
            self.max_attempts
        );
        Ok(Allocation::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
