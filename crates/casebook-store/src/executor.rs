//! Executes validated actions against the store.

use crate::{FactStore, QueryRows, StoreError};
use casebook_action::{Action, InsertAction, QueryAction};

/// Result of executing an action.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// Rows from a query action, in store order.
    Rows(QueryRows),
    /// Number of records stored by an insert action.
    Inserted(usize),
}

/// Runs validated actions. Performs no further trust decisions.
pub struct Executor<'a> {
    store: &'a FactStore,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a FactStore) -> Self {
        Self { store }
    }

    pub fn execute(&self, action: &Action) -> Result<ExecOutcome, StoreError> {
        match action {
            Action::Query(query) => Ok(ExecOutcome::Rows(self.query(query)?)),
            Action::Insert(insert) => Ok(ExecOutcome::Inserted(self.insert(insert)?)),
        }
    }

    pub fn query(&self, action: &QueryAction) -> Result<QueryRows, StoreError> {
        self.store.query(action.sql())
    }

    pub fn insert(&self, action: &InsertAction) -> Result<usize, StoreError> {
        self.store.insert(action.records())
    }
}
