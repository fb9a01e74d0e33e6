//! Batch mutation types

use crate::error::Error;
use crate::types::RemoteId;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// Kind of batch mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    /// Create new entities
    Create,
    /// Update existing entities (each must carry an `id`)
    Update,
    /// Delete entities by ID
    Delete,
}

impl BatchOperation {
    /// Key of the operation in the batch body and response
    pub fn key(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Acknowledgement of one applied chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAck {
    /// Zero-based chunk index
    pub index: usize,
    /// Position of the chunk's first entity in the input
    pub offset: usize,
    /// Number of entities sent in the chunk
    pub entities: usize,
    /// Per-entity results returned by the remote, in input order
    pub items: Vec<Value>,
    /// Positions within the chunk whose result carried an error
    pub failed: Vec<usize>,
}

impl ChunkAck {
    /// Entities of this chunk that were applied
    pub fn confirmed(&self) -> usize {
        self.entities.saturating_sub(self.failed.len())
    }

    /// Remote ID of the entity at `position` within the chunk.
    ///
    /// Failed items report `None`, as does an item whose ID is `0`.
    pub fn id_at(&self, position: usize) -> Option<RemoteId> {
        if self.failed.contains(&position) {
            return None;
        }
        self.items
            .get(position)
            .and_then(|item| item.get("id"))
            .and_then(Value::as_u64)
            .filter(|id| *id != 0)
    }
}

/// Outcome streams of one batch run.
///
/// Both receivers close after every worker has exited.
#[derive(Debug)]
pub struct BatchRun {
    /// One acknowledgement per applied chunk
    pub acks: mpsc::Receiver<ChunkAck>,
    /// Worker failures and per-item errors
    pub errors: mpsc::Receiver<Error>,
    /// Number of entities submitted
    pub total: usize,
}

impl BatchRun {
    /// Drain both streams concurrently and summarise
    pub async fn drain(self) -> BatchSummary {
        let Self {
            mut acks,
            mut errors,
            total,
        } = self;

        let drain_acks = async {
            let mut out = Vec::new();
            while let Some(ack) = acks.recv().await {
                out.push(ack);
            }
            out
        };
        let drain_errors = async {
            let mut out = Vec::new();
            while let Some(err) = errors.recv().await {
                out.push(err);
            }
            out
        };

        let (mut acks, errors) = tokio::join!(drain_acks, drain_errors);
        acks.sort_by_key(|ack| ack.index);
        let confirmed = acks.iter().map(ChunkAck::confirmed).sum();

        BatchSummary {
            confirmed,
            unconfirmed: total.saturating_sub(confirmed),
            acks,
            errors,
        }
    }
}

/// Drained result of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Entities acknowledged without an item error
    pub confirmed: usize,
    /// Entities never acknowledged
    pub unconfirmed: usize,
    /// Chunk acknowledgements ordered by chunk index
    pub acks: Vec<ChunkAck>,
    /// Errors reported during the run
    pub errors: Vec<Error>,
}

impl BatchSummary {
    /// Input positions whose item failed inside an applied chunk
    pub fn failed_positions(&self) -> Vec<usize> {
        self.acks
            .iter()
            .flat_map(|ack| ack.failed.iter().map(move |p| ack.offset + p))
            .collect()
    }

    /// Input positions paired with the remote ID they were assigned
    pub fn assigned_ids(&self) -> Vec<(usize, RemoteId)> {
        self.acks
            .iter()
            .flat_map(|ack| {
                (0..ack.entities).filter_map(move |p| ack.id_at(p).map(|id| (ack.offset + p, id)))
            })
            .collect()
    }
}
