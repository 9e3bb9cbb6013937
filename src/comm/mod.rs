//! # Communicator
//!
//! Islands only talk through the [`Communicator`] trait: point-to-point tagged
//! messages plus a few collectives (exchange, gather, barrier) built on top of
//! them. Every island holds its own communicator; nothing is shared.
//!
//! Sends are buffered and never block, so the paired "send, then receive"
//! exchange used by migration cannot deadlock even when every island sends at
//! the same time.
//!
//! A failing island calls [`Communicator::abort`], after which any peer waiting
//! on it gets [`GeneticError::PeerAborted`](crate::error::GeneticError::PeerAborted)
//! instead of blocking forever.

pub mod local;

use std::time::Duration;

use crate::chromosome::EvaluatedIndividual;
use crate::error::{GeneticError, Result};

pub use local::{local_cluster, AbortHandle, ChannelCommunicator};

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Destination announcement of a RANDOM migration.
    Announce,
    Migration,
    Gather,
    Barrier,
    Abort,
}

/// Message tag. `epoch` separates rounds of the same kind, so a message left
/// over from an earlier round is never mistaken for a current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub epoch: usize,
}

impl Tag {
    pub fn new(kind: TagKind, epoch: usize) -> Self {
        Self { kind, epoch }
    }

    /// Older round of the same kind.
    pub fn is_stale_for(&self, current: &Tag) -> bool {
        self.kind == current.kind && self.epoch < current.epoch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Destination(usize),
    Migrants(Vec<EvaluatedIndividual>),
    Best(Option<EvaluatedIndividual>),
    Arrive,
    Release,
    Abort,
}

impl Payload {
    /// Unwraps a migrant batch, failing on any other payload.
    pub fn into_migrants(self) -> Result<Vec<EvaluatedIndividual>> {
        match self {
            Payload::Migrants(migrants) => Ok(migrants),
            other => Err(unexpected("migrants", &other)),
        }
    }

    pub fn into_destination(self) -> Result<usize> {
        match self {
            Payload::Destination(rank) => Ok(rank),
            other => Err(unexpected("destination", &other)),
        }
    }

    pub fn into_best(self) -> Result<Option<EvaluatedIndividual>> {
        match self {
            Payload::Best(best) => Ok(best),
            other => Err(unexpected("best individual", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Payload) -> GeneticError {
    GeneticError::Communication(format!("expected {} payload, got {:?}", expected, got))
}

/// A message in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: usize,
    pub tag: Tag,
    pub payload: Payload,
}

/// Which sender a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Rank(usize),
    Any,
}

impl Source {
    pub fn accepts(&self, rank: usize) -> bool {
        match self {
            Source::Rank(expected) => *expected == rank,
            Source::Any => true,
        }
    }
}

/// Point-to-point and collective messaging between islands.
pub trait Communicator: Send {
    /// Rank of this island, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of islands in the run.
    fn size(&self) -> usize;

    /// Sends a message. Never blocks.
    fn send(&mut self, dest: usize, tag: Tag, payload: Payload) -> Result<()>;

    /// Blocks until a message with `tag` from `source` arrives and returns its
    /// sender and payload.
    fn receive(&mut self, source: Source, tag: Tag) -> Result<(usize, Payload)>;

    /// Like [`receive`](Communicator::receive) but gives up after `timeout`,
    /// returning `None`.
    fn receive_timeout(
        &mut self,
        source: Source,
        tag: Tag,
        timeout: Duration,
    ) -> Result<Option<(usize, Payload)>>;

    /// Tells every peer this island is gone.
    fn abort(&mut self);

    /// Sends `payload` to `dest` and receives the matching message from `source`.
    fn exchange(&mut self, dest: usize, source: usize, tag: Tag, payload: Payload) -> Result<Payload> {
        self.send(dest, tag, payload)?;
        self.receive(Source::Rank(source), tag).map(|(_, payload)| payload)
    }

    /// Collects one payload per island at `root`, ordered by rank.
    ///
    /// Returns `Some` on the root and `None` everywhere else.
    fn gather(&mut self, root: usize, epoch: usize, payload: Payload) -> Result<Option<Vec<Payload>>> {
        let tag = Tag::new(TagKind::Gather, epoch);
        if self.rank() != root {
            self.send(root, tag, payload)?;
            return Ok(None);
        }

        let mut own = Some(payload);
        let mut gathered = Vec::with_capacity(self.size());
        for rank in 0..self.size() {
            if rank == root {
                if let Some(payload) = own.take() {
                    gathered.push(payload);
                }
            } else {
                let (_, payload) = self.receive(Source::Rank(rank), tag)?;
                gathered.push(payload);
            }
        }
        Ok(Some(gathered))
    }

    /// Returns once every island has entered the barrier with the same epoch.
    fn barrier(&mut self, epoch: usize) -> Result<()> {
        let tag = Tag::new(TagKind::Barrier, epoch);
        let coordinator = 0;
        if self.rank() == coordinator {
            for rank in 1..self.size() {
                self.receive(Source::Rank(rank), tag)?;
            }
            for rank in 1..self.size() {
                self.send(rank, tag, Payload::Release)?;
            }
        } else {
            self.send(coordinator, tag, Payload::Arrive)?;
            self.receive(Source::Rank(coordinator), tag)?;
        }
        Ok(())
    }
}

impl<C: Communicator + ?Sized> Communicator for Box<C> {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn send(&mut self, dest: usize, tag: Tag, payload: Payload) -> Result<()> {
        (**self).send(dest, tag, payload)
    }

    fn receive(&mut self, source: Source, tag: Tag) -> Result<(usize, Payload)> {
        (**self).receive(source, tag)
    }

    fn receive_timeout(
        &mut self,
        source: Source,
        tag: Tag,
        timeout: Duration,
    ) -> Result<Option<(usize, Payload)>> {
        (**self).receive_timeout(source, tag, timeout)
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}
