use crate::error::StoreError;
use crate::storage::RoomStore;
use crate::storage::durable::room_unit::{Reply, RoomUnit, UnitCommand};
use async_trait::async_trait;
use dashmap::DashMap;
use rendezvous_core::{Participant, ParticipantId, Room, RoomId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const UNIT_MAILBOX_CAPACITY: usize = 100;

/// A unit can stop between our lookup and our send; this bounds how often
/// we chase a fresh one before giving up.
const MAX_DELIVERY_ATTEMPTS: usize = 4;

const RECORD_EXTENSION: &str = "json";

#[derive(Clone)]
struct UnitHandle {
    tx: mpsc::Sender<UnitCommand>,
    generation: u64,
}

/// Room store that gives every room its own serialized, file-backed unit.
///
/// All operations against one room go through that room's mailbox, so they
/// are applied strictly in arrival order. Rooms survive process restarts:
/// a store opened on the same directory sees every room written before.
pub struct DurableRoomStore {
    dir: PathBuf,
    units: Arc<DashMap<RoomId, UnitHandle>>,
    generations: AtomicU64,
}

impl DurableRoomStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Durable room store opened at {}", dir.display());

        Ok(Self {
            dir,
            units: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, room_id: &RoomId) -> PathBuf {
        self.dir
            .join(format!("{}.{RECORD_EXTENSION}", room_id.as_str()))
    }

    fn spawn_unit(&self, room_id: &RoomId) -> UnitHandle {
        let (tx, rx) = mpsc::channel(UNIT_MAILBOX_CAPACITY);
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);

        let unit = RoomUnit::new(room_id.clone(), self.record_path(room_id), rx);
        let units = Arc::clone(&self.units);
        let key = room_id.clone();
        tokio::spawn(unit.run(move || {
            units.remove_if(&key, |_, handle| handle.generation == generation);
        }));

        UnitHandle { tx, generation }
    }

    fn unit_sender(&self, room_id: &RoomId) -> mpsc::Sender<UnitCommand> {
        let mut entry = self
            .units
            .entry(room_id.clone())
            .or_insert_with(|| self.spawn_unit(room_id));
        if entry.tx.is_closed() {
            *entry = self.spawn_unit(room_id);
        }
        entry.tx.clone()
    }

    async fn call<T>(
        &self,
        room_id: &RoomId,
        make: impl Fn(Reply<T>) -> UnitCommand,
    ) -> Result<T, StoreError> {
        if !room_id.is_well_formed() {
            return Err(StoreError::Unavailable(format!(
                "room id {room_id:?} cannot be stored"
            )));
        }

        for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
            let tx = self.unit_sender(room_id);
            let (reply_tx, reply_rx) = oneshot::channel();

            if tx.send(make(reply_tx)).await.is_err() {
                debug!("Room unit {} closed before delivery (attempt {})", room_id, attempt);
                continue;
            }
            match reply_rx.await {
                Ok(result) => return result,
                Err(_) => {
                    debug!("Room unit {} stopped before replying (attempt {})", room_id, attempt);
                }
            }
        }

        warn!("Gave up delivering to room unit {}", room_id);
        Err(StoreError::Unavailable(format!(
            "room unit for {room_id} kept shutting down"
        )))
    }
}

#[async_trait]
impl RoomStore for DurableRoomStore {
    async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        let room_id = room.id.clone();
        self.call(&room_id, |reply| UnitCommand::Create {
            room: room.clone(),
            reply,
        })
        .await
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        self.call(room_id, |reply| UnitCommand::Get { reply }).await
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        self.call(room_id, |reply| UnitCommand::Delete { reply })
            .await
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError> {
        self.call(room_id, |reply| UnitCommand::Add {
            participant: participant.clone(),
            reply,
        })
        .await
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Room, StoreError> {
        self.call(room_id, |reply| UnitCommand::Remove {
            participant_id: participant_id.clone(),
            reply,
        })
        .await
    }

    async fn get_room_list(&self) -> Result<Vec<RoomId>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()).and_then(RoomId::parse) {
                Some(id) => ids.push(id),
                None => warn!("Ignoring stray file {} in room store", path.display()),
            }
        }

        Ok(ids)
    }
}
