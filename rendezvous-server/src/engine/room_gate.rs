use dashmap::DashMap;
use rendezvous_core::RoomId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async locks serializing read-modify-write sequences per room.
///
/// Entries exist only while someone holds or waits on them; the last
/// [`RoomPass`] out removes its room's entry, including a pass whose
/// `enter` was dropped before the lock was granted.
#[derive(Default)]
pub(crate) struct RoomGate {
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RoomGate {
    pub(crate) async fn enter(&self, room_id: &RoomId) -> RoomPass<'_> {
        // Declared before the lock clone so a cancelled wait drops the clone
        // first and the pass then sees whether anyone else still needs the entry.
        let mut pass = RoomPass {
            gate: self,
            room_id: room_id.clone(),
            guard: None,
        };
        let lock = self.locks.entry(room_id.clone()).or_default().clone();
        pass.guard = Some(lock.lock_owned().await);
        pass
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

pub(crate) struct RoomPass<'a> {
    gate: &'a RoomGate,
    room_id: RoomId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomPass<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are only taken under the shard lock, so a count of one means
        // nobody is queued behind us.
        self.gate
            .locks
            .remove_if(&self.room_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
