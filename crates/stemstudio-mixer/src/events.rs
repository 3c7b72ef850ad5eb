//! Change notifications for UI layers.
//!
//! Observers register with [`Subscribers::subscribe`] at session start and
//! call [`Subscribers::unsubscribe`] at session end. Delivery never blocks
//! the coordinator; receivers that have been dropped are pruned on the next
//! emit.

use crate::transport::PlaybackState;
use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum MixEvent {
    Transport {
        state: PlaybackState,
        current_time: f64,
    },
    Seeked(f64),
    /// Playback reached the end of the project.
    Ended,
    MasterVolume(f32),
    /// A stem's own parameters changed (volume, pan, effects).
    StemChanged(String),
    /// Mute or solo changed. Carries the audibility of every stem, in order.
    Audibility(Vec<(String, bool)>),
    DurationChanged(f64),
    PresetApplied(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
pub struct Subscribers {
    next_id: u64,
    senders: BTreeMap<SubscriptionId, Sender<MixEvent>>,
}

impl Subscribers {
    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<MixEvent>) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.insert(id, tx);
        (id, rx)
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.senders.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn emit(&mut self, event: MixEvent) {
        if self.senders.is_empty() {
            return;
        }
        trace!(?event, "Mix event");
        self.senders
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}
