use ledger::LedgerEntry;
use uuid::Uuid;

use crate::{
    distribution::DistributionRun,
    notification::Notification,
    request::{Request, Resolution},
};

/// A single write inside an [`ExecutionPlan`]. Each variant carries the guard
/// the adapter must check before applying it.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Fails with `Conflict` if the account already has a pending request of
    /// the same kind on the same track.
    InsertRequest { request: Request },
    /// Compare-and-set: only applies while the stored state is still pending.
    TransitionRequest { id: Uuid, resolution: Resolution },
    /// Only deletes a pending request owned by `owner`.
    DeleteRequest { id: Uuid, owner: Uuid },
    AppendEntry { entry: LedgerEntry },
    Notify { notification: Notification },
    /// Fails with `Conflict` if the run id has already been recorded.
    RecordRun { run: DistributionRun },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::InsertRequest { .. } => "insert_request",
            Operation::TransitionRequest { .. } => "transition_request",
            Operation::DeleteRequest { .. } => "delete_request",
            Operation::AppendEntry { .. } => "append_entry",
            Operation::Notify { .. } => "notify",
            Operation::RecordRun { .. } => "record_run",
        }
    }
}

/// Ordered writes that must commit together or not at all.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    operations: Vec<Operation>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub fn add(&mut self, op: Operation) -> &mut Self {
        self.operations.push(op);
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
