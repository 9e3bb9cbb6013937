//! In-process communicator: one thread per island, one unbounded crossbeam
//! channel per island as its mailbox.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::trace;

use super::{Communicator, Envelope, Payload, Source, Tag, TagKind};
use crate::error::{GeneticError, Result};

/// Creates `size` connected communicators, one per rank.
///
/// ```rust
/// use islandga::comm::{local_cluster, Communicator, Payload, Source, Tag, TagKind};
///
/// let mut cluster = local_cluster(2);
/// let mut second = cluster.pop().unwrap();
/// let mut first = cluster.pop().unwrap();
///
/// let tag = Tag::new(TagKind::Migration, 1);
/// first.send(1, tag, Payload::Destination(7)).unwrap();
/// let (from, payload) = second.receive(Source::Any, tag).unwrap();
/// assert_eq!(from, 0);
/// assert_eq!(payload, Payload::Destination(7));
/// ```
pub fn local_cluster(size: usize) -> Vec<ChannelCommunicator> {
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();

    receivers
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| {
            // No sender to our own mailbox: once every peer is gone the inbox
            // disconnects instead of blocking forever.
            let outboxes = senders
                .iter()
                .enumerate()
                .map(|(dest, sender)| (dest != rank).then(|| sender.clone()))
                .collect();
            ChannelCommunicator {
                rank,
                size,
                outboxes,
                inbox,
                pending: VecDeque::new(),
            }
        })
        .collect()
}

/// A [`Communicator`] backed by crossbeam channels.
///
/// Messages that arrive before anyone asks for them are parked in `pending`
/// and matched by sender and tag on later receives.
#[derive(Debug)]
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    pending: VecDeque<Envelope>,
}

impl ChannelCommunicator {
    /// Number of parked messages.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// A handle that can abort on this rank's behalf after the communicator
    /// itself is gone, e.g. when the island owning it panics.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            rank: self.rank,
            outboxes: self.outboxes.iter().flatten().cloned().collect(),
        }
    }

    fn take_pending(&mut self, source: Source, tag: Tag) -> Result<Option<(usize, Payload)>> {
        if let Some(aborted) = self.pending.iter().find(|e| e.tag.kind == TagKind::Abort) {
            return Err(GeneticError::PeerAborted(aborted.source));
        }
        self.pending.retain(|e| !e.tag.is_stale_for(&tag));
        let position = self
            .pending
            .iter()
            .position(|e| e.tag == tag && source.accepts(e.source));
        Ok(position
            .and_then(|i| self.pending.remove(i))
            .map(|e| (e.source, e.payload)))
    }

    /// Files one incoming envelope; returns it if it answers the current receive.
    fn route(&mut self, envelope: Envelope, source: Source, tag: Tag) -> Result<Option<(usize, Payload)>> {
        if envelope.tag.kind == TagKind::Abort {
            let source = envelope.source;
            // kept so every later receive fails the same way
            self.pending.push_back(envelope);
            return Err(GeneticError::PeerAborted(source));
        }
        if envelope.tag == tag && source.accepts(envelope.source) {
            return Ok(Some((envelope.source, envelope.payload)));
        }
        if envelope.tag.is_stale_for(&tag) {
            trace!(rank = self.rank, from = envelope.source, tag = ?envelope.tag, "Dropping stale message");
        } else {
            self.pending.push_back(envelope);
        }
        Ok(None)
    }

    /// A send to `dest` failed. A peer that aborted before leaving has
    /// already told us, so report that instead of the broken channel.
    fn lost_peer(&mut self, dest: usize) -> GeneticError {
        self.pending.extend(self.inbox.try_iter());
        match self.pending.iter().find(|e| e.tag.kind == TagKind::Abort) {
            Some(aborted) => GeneticError::PeerAborted(aborted.source),
            None => GeneticError::Communication(format!("island {} is no longer receiving", dest)),
        }
    }

    fn disconnected(&self) -> GeneticError {
        GeneticError::Communication(format!(
            "island {} lost every peer while waiting for a message",
            self.rank
        ))
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&mut self, dest: usize, tag: Tag, payload: Payload) -> Result<()> {
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload,
        };
        if dest == self.rank {
            self.pending.push_back(envelope);
            return Ok(());
        }
        let outbox = self
            .outboxes
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                GeneticError::Communication(format!(
                    "rank {} is outside the cluster of size {}",
                    dest, self.size
                ))
            })?;
        if outbox.send(envelope).is_err() {
            return Err(self.lost_peer(dest));
        }
        Ok(())
    }

    fn receive(&mut self, source: Source, tag: Tag) -> Result<(usize, Payload)> {
        if let Some(found) = self.take_pending(source, tag)? {
            return Ok(found);
        }
        loop {
            let envelope = self.inbox.recv().map_err(|_| self.disconnected())?;
            if let Some(found) = self.route(envelope, source, tag)? {
                return Ok(found);
            }
        }
    }

    fn receive_timeout(
        &mut self,
        source: Source,
        tag: Tag,
        timeout: Duration,
    ) -> Result<Option<(usize, Payload)>> {
        if let Some(found) = self.take_pending(source, tag)? {
            return Ok(Some(found));
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(envelope) => {
                    if let Some(found) = self.route(envelope, source, tag)? {
                        return Ok(Some(found));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(self.disconnected()),
            }
        }
    }

    fn abort(&mut self) {
        broadcast_abort(self.rank, self.outboxes.iter().flatten());
    }
}

/// Aborts a rank from outside its thread.
///
/// Holding a handle keeps the peers' mailboxes connected, so drop it once the
/// island it guards has finished.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    rank: usize,
    outboxes: Vec<Sender<Envelope>>,
}

impl AbortHandle {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Tells every peer that this rank aborted.
    pub fn abort(&self) {
        broadcast_abort(self.rank, self.outboxes.iter());
    }
}

fn broadcast_abort<'a>(rank: usize, outboxes: impl Iterator<Item = &'a Sender<Envelope>>) {
    let tag = Tag::new(TagKind::Abort, 0);
    for outbox in outboxes {
        // A peer that already left does not need to hear about it.
        let _ = outbox.send(Envelope {
            source: rank,
            tag,
            payload: Payload::Abort,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::{Chromosome, EvaluatedIndividual};
    use std::thread;

    fn tag(kind: TagKind, epoch: usize) -> Tag {
        Tag::new(kind, epoch)
    }

    #[test]
    fn test_out_of_order_messages_are_parked() {
        let mut cluster = local_cluster(2);
        let mut b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();

        a.send(1, tag(TagKind::Gather, 0), Payload::Arrive).unwrap();
        a.send(1, tag(TagKind::Migration, 1), Payload::Destination(3)).unwrap();

        let (_, payload) = b.receive(Source::Rank(0), tag(TagKind::Migration, 1)).unwrap();
        assert_eq!(payload, Payload::Destination(3));
        assert_eq!(b.pending_len(), 1);

        let (_, payload) = b.receive(Source::Rank(0), tag(TagKind::Gather, 0)).unwrap();
        assert_eq!(payload, Payload::Arrive);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn test_stale_epoch_is_discarded() {
        let mut cluster = local_cluster(2);
        let mut b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();

        a.send(1, tag(TagKind::Migration, 1), Payload::Migrants(vec![])).unwrap();
        a.send(1, tag(TagKind::Migration, 2), Payload::Destination(1)).unwrap();

        let (_, payload) = b.receive(Source::Any, tag(TagKind::Migration, 2)).unwrap();
        assert_eq!(payload, Payload::Destination(1));
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn test_simultaneous_exchange_does_not_deadlock() {
        let cluster = local_cluster(4);
        let handles: Vec<_> = cluster
            .into_iter()
            .map(|mut comm| {
                thread::spawn(move || {
                    let rank = comm.rank();
                    let size = comm.size();
                    let migrant = EvaluatedIndividual::new(Chromosome::new(vec![rank]), rank as u64);
                    let received = comm
                        .exchange(
                            (rank + 1) % size,
                            (rank + size - 1) % size,
                            tag(TagKind::Migration, 1),
                            Payload::Migrants(vec![migrant]),
                        )
                        .unwrap()
                        .into_migrants()
                        .unwrap();
                    (rank, received[0].makespan)
                })
            })
            .collect();

        for handle in handles {
            let (rank, from) = handle.join().unwrap();
            assert_eq!(from as usize, (rank + 3) % 4);
        }
    }

    #[test]
    fn test_gather_and_barrier() {
        let cluster = local_cluster(3);
        let handles: Vec<_> = cluster
            .into_iter()
            .map(|mut comm| {
                thread::spawn(move || {
                    comm.barrier(0).unwrap();
                    let rank = comm.rank();
                    comm.gather(0, 0, Payload::Destination(rank * 10)).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(
            results[0],
            Some(vec![
                Payload::Destination(0),
                Payload::Destination(10),
                Payload::Destination(20)
            ])
        );
        assert!(results[1].is_none());
        assert!(results[2].is_none());
    }

    #[test]
    fn test_abort_wakes_waiting_peer() {
        let mut cluster = local_cluster(2);
        let mut b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();

        let waiter = thread::spawn(move || b.receive(Source::Rank(0), tag(TagKind::Migration, 1)));
        a.abort();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(GeneticError::PeerAborted(0))));
    }

    #[test]
    fn test_abort_handle_outlives_communicator() {
        let mut cluster = local_cluster(3);
        let mut c = cluster.pop().unwrap();
        let mut b = cluster.pop().unwrap();
        let a = cluster.pop().unwrap();

        let handle = a.abort_handle();
        assert_eq!(handle.rank(), 0);
        drop(a);

        let waiter = thread::spawn(move || b.receive(Source::Rank(2), tag(TagKind::Migration, 1)));
        handle.abort();
        drop(handle);

        assert!(matches!(waiter.join().unwrap(), Err(GeneticError::PeerAborted(0))));
        assert!(matches!(
            c.receive(Source::Any, tag(TagKind::Barrier, 0)),
            Err(GeneticError::PeerAborted(0))
        ));
    }

    #[test]
    fn test_receive_timeout_expires() {
        let mut cluster = local_cluster(2);
        let _b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();

        let result = a
            .receive_timeout(Source::Rank(1), tag(TagKind::Migration, 1), Duration::from_millis(20))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_lost_peers_disconnect() {
        let mut cluster = local_cluster(2);
        let b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();
        drop(b);

        let result = a.receive(Source::Any, tag(TagKind::Barrier, 0));
        assert!(matches!(result, Err(GeneticError::Communication(_))));
        assert!(a.send(1, tag(TagKind::Barrier, 0), Payload::Arrive).is_err());
    }

    #[test]
    fn test_send_to_aborted_peer_reports_abort() {
        let mut cluster = local_cluster(2);
        let mut b = cluster.pop().unwrap();
        let mut a = cluster.pop().unwrap();
        b.abort();
        drop(b);

        let result = a.send(1, tag(TagKind::Migration, 4), Payload::Migrants(vec![]));
        assert!(matches!(result, Err(GeneticError::PeerAborted(1))));
    }

    #[test]
    fn test_send_to_unknown_rank() {
        let mut cluster = local_cluster(1);
        let mut only = cluster.pop().unwrap();
        assert!(only.send(5, tag(TagKind::Gather, 0), Payload::Arrive).is_err());
        only.send(0, tag(TagKind::Gather, 0), Payload::Arrive).unwrap();
        assert!(only.receive(Source::Rank(0), tag(TagKind::Gather, 0)).is_ok());
    }
}
