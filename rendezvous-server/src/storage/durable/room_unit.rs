use crate::error::StoreError;
use crate::storage::durable::record;
use rendezvous_core::{Participant, ParticipantId, Room, RoomId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Commands processed one at a time by a room unit.
#[derive(Debug)]
pub(crate) enum UnitCommand {
    Create { room: Room, reply: Reply<()> },
    Get { reply: Reply<Option<Room>> },
    Delete { reply: Reply<bool> },
    Add { participant: Participant, reply: Reply<()> },
    Remove { participant_id: ParticipantId, reply: Reply<Room> },
}

impl UnitCommand {
    fn fail(self, err: StoreError) {
        match self {
            Self::Create { reply, .. } | Self::Add { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::Get { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::Delete { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::Remove { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

/// Sole owner of one room's durable state.
///
/// Loads the room file on start, applies each mutation to a copy, writes
/// it out, and only then adopts the copy. Exits as soon as the room is
/// absent so idle ids do not hold a task.
pub(crate) struct RoomUnit {
    room_id: RoomId,
    path: PathBuf,
    state: Option<Room>,
    commands: mpsc::Receiver<UnitCommand>,
}

impl RoomUnit {
    pub(crate) fn new(room_id: RoomId, path: PathBuf, commands: mpsc::Receiver<UnitCommand>) -> Self {
        Self {
            room_id,
            path,
            state: None,
            commands,
        }
    }

    pub(crate) async fn run(mut self, on_exit: impl FnOnce()) {
        debug!("Room unit {} starting", self.room_id);

        match load(&self.path, &self.room_id).await {
            Ok(state) => {
                self.state = state;
                while let Some(cmd) = self.commands.recv().await {
                    self.handle(cmd).await;
                    if self.state.is_none() {
                        break;
                    }
                }
            }
            Err(e) => {
                error!("Failed to load room {}: {}", self.room_id, e);
                if let Some(cmd) = self.commands.recv().await {
                    cmd.fail(e);
                }
            }
        }

        // Queued commands are dropped here; their senders retry on a fresh unit.
        self.commands.close();
        on_exit();
        debug!("Room unit {} stopped", self.room_id);
    }

    async fn handle(&mut self, cmd: UnitCommand) {
        match cmd {
            UnitCommand::Create { room, reply } => {
                let result = if self.state.is_some() {
                    Err(StoreError::RoomExists(self.room_id.clone()))
                } else {
                    self.commit(room).await
                };
                if result.is_ok() {
                    info!("Room {} persisted", self.room_id);
                }
                let _ = reply.send(result);
            }

            UnitCommand::Get { reply } => {
                let _ = reply.send(Ok(self.state.clone()));
            }

            UnitCommand::Delete { reply } => {
                let result = if self.state.is_none() {
                    Ok(false)
                } else {
                    erase(&self.path).await.map(|()| {
                        self.state = None;
                        info!("Room {} erased", self.room_id);
                        true
                    })
                };
                let _ = reply.send(result);
            }

            UnitCommand::Add { participant, reply } => {
                let result = match self.state.clone() {
                    None => Err(StoreError::RoomNotFound(self.room_id.clone())),
                    Some(mut next) => {
                        next.seat(participant);
                        self.commit(next).await
                    }
                };
                let _ = reply.send(result);
            }

            UnitCommand::Remove {
                participant_id,
                reply,
            } => {
                let result = match self.state.clone() {
                    None => Err(StoreError::RoomNotFound(self.room_id.clone())),
                    Some(mut next) => {
                        if next.unseat(&participant_id).is_some() {
                            let snapshot = next.clone();
                            self.commit(next).await.map(|()| snapshot)
                        } else {
                            Ok(next)
                        }
                    }
                };
                let _ = reply.send(result);
            }
        }
    }

    async fn commit(&mut self, next: Room) -> Result<(), StoreError> {
        persist(&self.path, &next).await?;
        self.state = Some(next);
        Ok(())
    }
}

async fn load(path: &Path, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let room = record::decode(&bytes)?;
    if room.id != *room_id {
        return Err(StoreError::Corrupt(format!(
            "file for room {room_id} holds room {}",
            room.id
        )));
    }
    Ok(Some(room))
}

/// Write-then-rename so a crash mid-write never leaves a torn record.
async fn persist(path: &Path, room: &Room) -> Result<(), StoreError> {
    let bytes = record::encode(room)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn erase(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
