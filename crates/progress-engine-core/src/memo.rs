use std::convert::Infallible;

use tracing::{debug, warn};

use crate::SnapshotVersion;

/// Single-slot cache keyed on the snapshot version.
///
/// A value is reused while the version is unchanged and recomputed on any other
/// version. An older version than the cached one still recomputes, and is logged.
#[derive(Debug, Clone)]
pub struct VersionedMemo<T> {
    slot: Option<(SnapshotVersion, T)>,
    hits: u64,
    recomputes: u64,
}

impl<T> Default for VersionedMemo<T> {
    fn default() -> Self {
        Self { slot: None, hits: 0, recomputes: 0 }
    }
}

impl<T> VersionedMemo<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, version: SnapshotVersion, compute: impl FnOnce() -> T) -> &T {
        match self.try_get_or_compute(version, || Ok::<T, Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`Self::get_or_compute`], for fallible computations.
    ///
    /// # Errors
    /// Returns the error from `compute`; the previously cached value stays in place.
    pub fn try_get_or_compute<E>(
        &mut self,
        version: SnapshotVersion,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let entry = match self.slot.take() {
            Some((cached, value)) if cached == version => {
                self.hits += 1;
                debug!(%version, "memo hit");
                (cached, value)
            }
            previous => {
                if let Some((cached, _)) = previous.as_ref().filter(|(cached, _)| *cached > version) {
                    warn!(%version, %cached, "snapshot version moved backwards");
                }
                match compute() {
                    Ok(value) => {
                        self.recomputes += 1;
                        debug!(%version, "memo recompute");
                        (version, value)
                    }
                    Err(err) => {
                        self.slot = previous;
                        return Err(err);
                    }
                }
            }
        };
        let (_, value) = self.slot.insert(entry);
        Ok(value)
    }

    #[must_use]
    pub fn cached_version(&self) -> Option<SnapshotVersion> {
        self.slot.as_ref().map(|(version, _)| *version)
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
