//! Keyed state access grouped by collection.

use core::fmt;

use crate::context::{ChaincodeStub, StubError, TransactionContextInterface};

/// Name of the world state collection
pub const WORLD_STATE_IDENTIFIER: &str = "worldstate";

/// Collections of the ledger visible to a transaction
#[derive(Clone, Copy)]
pub struct Ledger<'ctx> {
    stub: Option<&'ctx dyn ChaincodeStub>,
}

impl fmt::Debug for Ledger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("attached", &self.stub.is_some())
            .finish()
    }
}

impl<'ctx> Ledger<'ctx> {
    /// Ledger of the transaction `ctx` belongs to
    pub fn new(ctx: &'ctx dyn TransactionContextInterface) -> Self {
        Self {
            stub: ctx.get_stub(),
        }
    }

    /// Collection called `name`; anything but [`WORLD_STATE_IDENTIFIER`] is
    /// a private data collection
    pub fn collection(&self, name: impl Into<String>) -> Collection<'ctx> {
        Collection {
            name: name.into(),
            stub: self.stub,
        }
    }

    /// The world state
    pub fn default_collection(&self) -> Collection<'ctx> {
        self.collection(WORLD_STATE_IDENTIFIER)
    }
}

/// Operation on a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    /// Read
    Get,
    /// Write of a new key
    Create,
    /// Write of an existing key
    Update,
    /// Removal
    Delete,
}

impl fmt::Display for StateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "get",
            Self::Create => "create new",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Why a state operation was refused
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum StateFailure {
    /// State already exists for key
    Exists,
    /// State does not exist for key
    Missing,
    /// Transaction context has no ledger access
    Detached,
    /// {0}
    Stub(#[from] StubError),
}

/// Failed to {operation} state {key} in collection {collection}. {reason}
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct LedgerError {
    /// What was attempted
    pub operation: StateOperation,
    /// State key
    pub key: String,
    /// Collection name
    pub collection: String,
    /// Why it failed
    #[source]
    pub reason: StateFailure,
}

/// States stored under one collection
#[derive(Clone)]
pub struct Collection<'ctx> {
    name: String,
    stub: Option<&'ctx dyn ChaincodeStub>,
}

impl fmt::Debug for Collection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Collection<'_> {
    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at `key`, `None` when absent.
    ///
    /// # Errors
    /// If the ledger can't be read.
    pub fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.read(key).map_err(|reason| self.error(StateOperation::Get, key, reason))
    }

    /// Store `value` at `key`, which must not be in use.
    ///
    /// # Errors
    /// If `key` already holds a state or the write is rejected.
    pub fn create_state(&self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        let fail = |reason| self.error(StateOperation::Create, key, reason);
        if self.read(key).map_err(fail)?.is_some() {
            return Err(fail(StateFailure::Exists));
        }
        self.write(key, value).map_err(fail)
    }

    /// Replace the state at `key`, which must be in use.
    ///
    /// # Errors
    /// If `key` holds no state or the write is rejected.
    pub fn update_state(&self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        let fail = |reason| self.error(StateOperation::Update, key, reason);
        if self.read(key).map_err(fail)?.is_none() {
            return Err(fail(StateFailure::Missing));
        }
        self.write(key, value).map_err(fail)
    }

    /// Remove the state at `key`.
    ///
    /// # Errors
    /// If the delete is rejected.
    pub fn delete_state(&self, key: &str) -> Result<(), LedgerError> {
        let stub = self
            .stub()
            .map_err(|reason| self.error(StateOperation::Delete, key, reason))?;
        let deleted = if self.is_world_state() {
            stub.del_state(key)
        } else {
            stub.del_private_data(&self.name, key)
        };
        deleted.map_err(|err| self.error(StateOperation::Delete, key, err.into()))
    }

    fn is_world_state(&self) -> bool {
        self.name == WORLD_STATE_IDENTIFIER
    }

    fn stub(&self) -> Result<&dyn ChaincodeStub, StateFailure> {
        self.stub.ok_or(StateFailure::Detached)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StateFailure> {
        let stub = self.stub()?;
        let value = if self.is_world_state() {
            stub.get_state(key)?
        } else {
            stub.get_private_data(&self.name, key)?
        };
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StateFailure> {
        let stub = self.stub()?;
        if self.is_world_state() {
            stub.put_state(key, value)?;
        } else {
            stub.put_private_data(&self.name, key, value)?;
        }
        Ok(())
    }

    fn error(&self, operation: StateOperation, key: &str, reason: StateFailure) -> LedgerError {
        LedgerError {
            operation,
            key: key.to_owned(),
            collection: self.name.clone(),
            reason,
        }
    }
}
