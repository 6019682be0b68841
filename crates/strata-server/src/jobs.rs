//! Resumable server jobs

use glam::IVec2;
use strata_core::protocol::{ClientId, ServerMessage};
use strata_core::schedule::{Job, JobStatus, TickBudget};

use crate::helpers::{activate_chunk, build_payload, ensure_chunk, store_generated};
use crate::state::{WorldCore, chunk_distance};
use crate::transport::Outbox;

/// Resolves one `RequestChunks` batch and delivers it as a single message
///
/// Every generation costs one budget unit; stored chunks are free. Once all
/// coordinates are resolved the payloads go out together and the chunks still
/// near the client become active for it. The rest are remembered so they activate
/// once the client moves close.
pub struct ChunkBatchJob {
    client: ClientId,
    coordinates: Vec<IVec2>,
    failed: Vec<IVec2>,
}

impl ChunkBatchJob {
    pub fn new(client: ClientId, mut coordinates: Vec<IVec2>) -> Self {
        let mut seen = ahash::AHashSet::new();
        coordinates.retain(|coord| seen.insert(*coord));
        Self {
            client,
            coordinates,
            failed: Vec::new(),
        }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    fn missing<O: Outbox>(&self, core: &WorldCore<O>) -> Vec<IVec2> {
        self.coordinates
            .iter()
            .copied()
            .filter(|coord| !core.state.store.contains(*coord) && !self.failed.contains(coord))
            .collect()
    }

    fn resolve<O: Outbox>(&mut self, core: &mut WorldCore<O>, coords: &[IVec2]) {
        if core.config.parallel_generation {
            let mut batch = core.state.generator.generate_batch(coords);
            for &coord in coords {
                match batch.remove(&coord) {
                    Some(generated) => store_generated(core, generated),
                    None => self.failed.push(coord),
                }
            }
        } else {
            for &coord in coords {
                if ensure_chunk(core, coord).is_err() {
                    self.failed.push(coord);
                }
            }
        }
    }

    fn deliver<O: Outbox>(&self, core: &mut WorldCore<O>) {
        let Some(origin) = core.windows.origin(self.client) else {
            log::debug!("[STREAM] {} left before its batch finished", self.client);
            return;
        };
        let radius = core.config.activation_radius;

        let mut payloads = Vec::with_capacity(self.coordinates.len());
        for &coord in &self.coordinates {
            let Some(payload) = build_payload(core, coord) else {
                continue;
            };
            payloads.push(payload);

            core.windows.deliver(self.client, coord);
            if chunk_distance(coord, origin) <= radius && core.windows.hold(self.client, coord) {
                activate_chunk(core, coord);
            }
        }

        if !self.failed.is_empty() {
            log::warn!(
                "[STREAM] {} chunk(s) for {} could not be generated",
                self.failed.len(),
                self.client
            );
        }
        log::debug!("[STREAM] Delivering {} chunk(s) to {}", payloads.len(), self.client);
        core.outbox
            .send(self.client, &ServerMessage::DeliverChunks { payloads });
    }
}

impl<O: Outbox> Job<WorldCore<O>> for ChunkBatchJob {
    fn step(&mut self, core: &mut WorldCore<O>, budget: &mut TickBudget) -> JobStatus {
        let missing = self.missing(core);
        if !missing.is_empty() {
            let wanted = u32::try_from(missing.len()).unwrap_or(u32::MAX);
            let granted = budget.take(wanted) as usize;
            if granted == 0 {
                return JobStatus::Pending;
            }
            self.resolve(core, &missing[..granted]);
            if granted < missing.len() {
                return JobStatus::Pending;
            }
        }

        self.deliver(core);
        JobStatus::Done
    }

    fn label(&self) -> &str {
        "chunk batch"
    }
}
