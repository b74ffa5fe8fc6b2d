//! Session controller.
//!
//! Turns operator input (scanned codes, typed quantities, menu actions) into
//! engine operations. It keeps the per-session UI state the engine does not
//! own: the selected item, the current view query and the export directory.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use thiserror::Error;

use stocktake_core::{DomainError, ItemCode};
use stocktake_infra::{InventoryStore, Outcome, PersistenceStatus, ReconciliationEngine, StoreError};
use stocktake_inventory::{
    DiscrepancyRow, Item, ItemView, QuantityEntry, SortKey, StatusFilter, ViewQuery, discrepancies,
    project,
};
use stocktake_io::{SpreadsheetError, default_report_file_name, export_report, import_workbook, write_report};

use crate::notice::Notice;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no item selected; scan or enter a code first")]
    NoItemSelected,

    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),

    #[error("cancelled")]
    Cancelled,

    #[error("this action needs explicit confirmation")]
    ConfirmationRequired,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),
}

/// Result of looking up a scanned code.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeLookup {
    /// The item exists and is now selected.
    Found(Item),
    /// No item has this code; the caller may offer to create one.
    Missing(ItemCode),
}

/// Explicit answer required by destructive operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

pub struct SessionController<S>
where
    S: InventoryStore + ?Sized + 'static,
{
    engine: ReconciliationEngine<S>,
    selected: Option<ItemCode>,
    query: ViewQuery,
    export_dir: PathBuf,
}

impl<S> SessionController<S>
where
    S: InventoryStore + ?Sized + 'static,
{
    pub fn new(engine: ReconciliationEngine<S>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            selected: None,
            query: ViewQuery::default(),
            export_dir: export_dir.into(),
        }
    }

    /// Restore the previous session from the store.
    pub async fn load(&mut self) -> Result<usize, SessionError> {
        Ok(self.engine.load().await?)
    }

    pub fn engine(&self) -> &ReconciliationEngine<S> {
        &self.engine
    }

    pub fn selected(&self) -> Option<&Item> {
        self.selected
            .as_ref()
            .and_then(|code| self.engine.find_by_code(code))
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Look up a scanned or typed code. A hit selects the item; a miss clears
    /// the selection.
    pub fn submit_code(&mut self, raw: &str) -> Result<CodeLookup, SessionError> {
        if raw.trim().is_empty() {
            return Err(SessionError::EmptyInput("code"));
        }
        let code = ItemCode::new(raw)?;

        match self.engine.find_by_code(&code) {
            Some(item) => {
                let item = item.clone();
                self.selected = Some(code);
                Ok(CodeLookup::Found(item))
            }
            None => {
                self.selected = None;
                Ok(CodeLookup::Missing(code))
            }
        }
    }

    /// Create an item for a code that was not found, and select it.
    ///
    /// A blank name means the operator backed out of the prompt.
    pub async fn create_item(&mut self, code: ItemCode, name: &str) -> Result<Outcome<Item>, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::Cancelled);
        }
        let outcome = self.engine.create_item(code.clone(), name).await?;
        self.selected = Some(code);
        Ok(outcome)
    }

    /// Add a typed quantity to the selected item.
    pub async fn submit_quantity(&mut self, raw: &str) -> Result<Outcome<Item>, SessionError> {
        let code = self.selected.clone().ok_or(SessionError::NoItemSelected)?;
        if raw.trim().is_empty() {
            return Err(SessionError::EmptyInput("quantity"));
        }
        let entry = QuantityEntry::parse(raw)?;
        Ok(self.engine.accumulate_quantity(&code, entry.delta()).await?)
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.query.status = status;
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.query.text = text.into();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.query.sort = sort;
    }

    pub fn view(&self) -> ItemView<'_> {
        project(self.engine.collection(), &self.query)
    }

    pub fn discrepancies(&self) -> Vec<DiscrepancyRow> {
        discrepancies(self.engine.collection())
    }

    /// Replace the session with the contents of a workbook.
    ///
    /// Nothing changes if the file cannot be read or holds no usable rows.
    pub async fn import_workbook(&mut self, path: &Path) -> Result<Outcome<usize>, SessionError> {
        let dataset = import_workbook(path, Utc::now())?;
        let outcome = self.engine.bulk_replace(dataset.items, dataset.metadata).await;
        self.selected = None;
        Ok(outcome)
    }

    /// Write the reconciliation report and return where it went.
    ///
    /// Without an explicit path the file goes to the export directory under a
    /// timestamped name.
    pub fn export_report(&self, path: Option<&Path>) -> Result<PathBuf, SessionError> {
        let collection = self.engine.collection();
        let doc = export_report(collection.items(), collection.metadata(), Utc::now())?;
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self.export_dir.join(default_report_file_name(&Local::now())),
        };
        write_report(&doc, &target)?;
        Ok(target)
    }

    /// Drop every item and the import metadata, here and in the store.
    pub async fn clear_all(&mut self, confirmation: Confirmation) -> Result<Outcome<()>, SessionError> {
        if confirmation != Confirmation::Confirmed {
            return Err(SessionError::ConfirmationRequired);
        }
        let outcome = self.engine.clear_all().await;
        self.selected = None;
        Ok(outcome)
    }

    /// Wait for queued store writes.
    pub async fn flush(&self) {
        self.engine.flush().await;
    }

    /// Background write failures as warning notices.
    pub fn drain_persistence_failures(&mut self) -> Vec<Notice> {
        self.engine
            .drain_failures()
            .into_iter()
            .map(|f| Notice::warning(format!("could not save ({}): {}", f.operation, f.error)))
            .collect()
    }

    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }
}

/// Warning for an applied change whose store write failed.
pub fn persistence_notice<T>(outcome: &Outcome<T>) -> Option<Notice> {
    match &outcome.persistence {
        PersistenceStatus::Failed(err) => Some(Notice::warning(format!(
            "change kept for this session but not saved: {err}"
        ))),
        PersistenceStatus::Written | PersistenceStatus::Queued => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stocktake_infra::InMemoryInventoryStore;
    use stocktake_inventory::ItemStatus;

    fn session() -> SessionController<InMemoryInventoryStore> {
        let engine = ReconciliationEngine::new(Arc::new(InMemoryInventoryStore::opened()));
        SessionController::new(engine, ".")
    }

    #[tokio::test]
    async fn quantity_without_selection_is_rejected() {
        let mut s = session();
        assert!(matches!(s.submit_quantity("3").await, Err(SessionError::NoItemSelected)));
    }

    #[tokio::test]
    async fn blank_code_is_empty_input() {
        let mut s = session();
        assert!(matches!(s.submit_code("  "), Err(SessionError::EmptyInput("code"))));
    }

    #[tokio::test]
    async fn missing_code_then_create_selects_new_item() {
        let mut s = session();
        let lookup = s.submit_code(" 42 ").unwrap();
        let CodeLookup::Missing(code) = lookup else {
            panic!("expected a miss");
        };
        assert_eq!(code.as_str(), "42");
        assert!(s.selected().is_none());

        let outcome = s.create_item(code, "Gasket").await.unwrap();
        assert_eq!(outcome.value.status(), ItemStatus::Unchecked);
        assert_eq!(s.selected().unwrap().name(), "Gasket");

        let counted = s.submit_quantity("2").await.unwrap();
        assert_eq!(counted.value.status(), ItemStatus::Excess);
    }

    #[tokio::test]
    async fn blank_name_cancels_creation() {
        let mut s = session();
        let code = ItemCode::new("9").unwrap();
        assert!(matches!(s.create_item(code, "  ").await, Err(SessionError::Cancelled)));
        assert!(s.engine().collection().is_empty());
    }

    #[tokio::test]
    async fn shorthand_quantity_subtracts() {
        let mut s = session();
        s.create_item(ItemCode::new("1").unwrap(), "One").await.unwrap();
        s.submit_quantity("10").await.unwrap();
        let outcome = s.submit_quantity("03").await.unwrap();
        assert_eq!(outcome.value.actual_quantity(), Some(7));
    }

    #[tokio::test]
    async fn bad_quantity_is_parse_failure() {
        let mut s = session();
        s.create_item(ItemCode::new("1").unwrap(), "One").await.unwrap();
        let err = s.submit_quantity("3 boxes").await.unwrap_err();
        assert!(matches!(err, SessionError::Domain(DomainError::ParseFailure(_))));
        assert_eq!(s.selected().unwrap().actual_quantity(), None);
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let mut s = session();
        s.create_item(ItemCode::new("1").unwrap(), "One").await.unwrap();
        assert!(matches!(
            s.clear_all(Confirmation::Declined).await,
            Err(SessionError::ConfirmationRequired)
        ));
        assert_eq!(s.engine().collection().len(), 1);

        s.clear_all(Confirmation::Confirmed).await.unwrap();
        assert!(s.engine().collection().is_empty());
        assert!(s.selected().is_none());
    }

    #[tokio::test]
    async fn export_of_empty_session_is_rejected() {
        let s = session();
        let err = s.export_report(None).unwrap_err();
        assert!(matches!(err, SessionError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn failed_write_becomes_warning_notice() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut s = SessionController::new(ReconciliationEngine::new(store.clone()), ".");
        store.set_fail_writes(true);
        let outcome = s.create_item(ItemCode::new("1").unwrap(), "One").await.unwrap();
        let notice = persistence_notice(&outcome).unwrap();
        assert_eq!(notice.level, crate::NoticeLevel::Warning);
        assert!(s.selected().is_some());
    }
}
