use crate::trackers::registry::SharedIdentityRegistry;
use crate::trackers::stabilizer::options::StabilizerOptions;
use crate::trackers::stabilizer::{Detection, StabilizedSymbol, TrackingSession};
use crate::Errors;
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender};
use log::{debug, warn};
use std::thread::{Builder, JoinHandle};

type ReplySender = Sender<Result<FrameResult, Errors>>;
type ReplyReceiver = Receiver<Result<FrameResult, Errors>>;

enum WorkerCommands {
    Frame {
        frame_id: u64,
        detections: Vec<Detection>,
        channel: ReplySender,
    },
    Reset,
    Exit,
}

/// Stabilized output of one submitted frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub frame_id: u64,
    /// Session epoch the frame was processed at
    pub epoch: usize,
    pub symbols: Vec<StabilizedSymbol>,
}

/// Handle to the result of a submitted frame
///
#[derive(Debug)]
pub struct FrameTicket {
    frame_id: u64,
    receiver: ReplyReceiver,
}

impl FrameTicket {
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Blocks until the worker has processed the frame
    ///
    pub fn get(&self) -> Result<FrameResult> {
        let res = self.receiver.recv().map_err(|_| Errors::WorkerGone)?;
        Ok(res?)
    }
}

fn worker_thread(mut session: TrackingSession, rx: Receiver<WorkerCommands>) {
    let mut last_frame: Option<u64> = None;
    while let Ok(command) = rx.recv() {
        match command {
            WorkerCommands::Frame {
                frame_id,
                detections,
                channel,
            } => {
                let res = match last_frame {
                    Some(last) if frame_id <= last => {
                        debug!("Frame {} arrived after frame {}, skipped", frame_id, last);
                        Err(Errors::StaleFrame {
                            frame: frame_id,
                            last,
                        })
                    }
                    _ => {
                        last_frame = Some(frame_id);
                        let symbols = session.update(&detections);
                        Ok(FrameResult {
                            frame_id,
                            epoch: session.epoch(),
                            symbols,
                        })
                    }
                };
                if let Err(e) = channel.send(res) {
                    warn!("Unable to send results to a caller, likely the caller already closed the channel. Error is: {:?}", e);
                }
            }
            WorkerCommands::Reset => {
                session.reset();
                last_frame = None;
            }
            WorkerCommands::Exit => break,
        }
    }
}

/// Tracking session running on a dedicated thread.
///
/// Detection results produced by a pool of detector threads are submitted from any thread and
/// processed one by one in arrival order, which keeps the session a single-writer object.
/// A frame whose id is not greater than the id of the last processed frame is rejected with
/// [`Errors::StaleFrame`]: a newer frame has already moved the tracks forward.
///
pub struct StabilizerWorker {
    sender: Sender<WorkerCommands>,
    handle: Option<JoinHandle<()>>,
    registry: SharedIdentityRegistry,
}

impl Drop for StabilizerWorker {
    fn drop(&mut self) {
        if self.sender.send(WorkerCommands::Exit).is_err() {
            warn!("Stabilizer worker has already stopped");
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Stabilizer worker terminated abnormally");
            }
        }
    }
}

impl StabilizerWorker {
    pub fn new(opts: StabilizerOptions) -> Result<Self> {
        Self::with_session(TrackingSession::new(opts)?)
    }

    /// Moves an existing session to the worker thread
    ///
    pub fn with_session(session: TrackingSession) -> Result<Self> {
        let registry = session.registry();
        let (sender, rx) = crossbeam::channel::unbounded();
        let handle = Builder::new()
            .name("stabilizer".to_string())
            .spawn(move || worker_thread(session, rx))?;

        Ok(Self {
            sender,
            handle: Some(handle),
            registry,
        })
    }

    /// Queues the detections of a frame
    ///
    /// # Parameters
    /// * `frame_id` - increasing frame number assigned by the producer
    /// * `detections` - detections of the frame
    ///
    pub fn submit(&self, frame_id: u64, detections: Vec<Detection>) -> Result<FrameTicket> {
        let (channel, receiver) = crossbeam::channel::bounded(1);
        self.sender
            .send(WorkerCommands::Frame {
                frame_id,
                detections,
                channel,
            })
            .map_err(|_| Errors::WorkerGone)?;
        Ok(FrameTicket { frame_id, receiver })
    }

    /// Drops all tracks of the session and forgets the last frame id
    ///
    pub fn reset(&self) -> Result<()> {
        self.sender
            .send(WorkerCommands::Reset)
            .map_err(|_| Errors::WorkerGone)?;
        Ok(())
    }

    pub fn registry(&self) -> SharedIdentityRegistry {
        self.registry.clone()
    }
}
