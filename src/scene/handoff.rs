//! Scene hand-off from the scene builder thread to the render thread.
//!
//! The builder publishes complete snapshots; the render thread polls once per
//! frame and only ever cares about the newest one. When the queue is full the
//! builder drops the stale snapshots itself instead of blocking.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::scene::SceneDescription;

/// Builder side of the hand-off
#[derive(Debug, Clone)]
pub struct SceneSender {
    tx: Sender<Arc<SceneDescription>>,
    drop_rx: Receiver<Arc<SceneDescription>>,
}

impl SceneSender {
    /// Publish a snapshot, replacing any the render thread hasn't picked up
    /// when the queue is full. Returns false if it could not be queued.
    pub fn publish(&self, scene: SceneDescription) -> bool {
        let scene = Arc::new(scene);
        match self.tx.try_send(scene) {
            Ok(()) => true,
            Err(TrySendError::Full(scene)) => {
                while self.drop_rx.try_recv().is_ok() {}
                self.tx.try_send(scene).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Render side of the hand-off
#[derive(Debug)]
pub struct SceneReceiver {
    rx: Receiver<Arc<SceneDescription>>,
}

impl SceneReceiver {
    /// The newest published snapshot, if any arrived since the last call.
    pub fn latest(&self) -> Option<Arc<SceneDescription>> {
        let mut latest = None;
        while let Ok(scene) = self.rx.try_recv() {
            latest = Some(scene);
        }
        latest
    }
}

/// Create a bounded scene hand-off queue.
pub fn scene_channel(depth: usize) -> (SceneSender, SceneReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
    let sender = SceneSender {
        tx,
        drop_rx: rx.clone(),
    };
    (sender, SceneReceiver { rx })
}
