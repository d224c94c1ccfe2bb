use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::checklist::{Checklist, ChecklistItem};
use crate::storage::{LocalStore, StoreError};

/// The side of the application that owns the authoritative list.
pub trait ChecklistHost: Send + Sync {
    /// Current contents of the live list.
    fn items(&self) -> Checklist;
    /// Replaces the live list with a remote copy.
    fn replace_items(&self, items: Checklist);
    /// One-line progress or failure message for the user.
    fn status(&self, message: &str);
}

impl<H: ChecklistHost + ?Sized> ChecklistHost for Arc<H> {
    fn items(&self) -> Checklist {
        (**self).items()
    }

    fn replace_items(&self, items: Checklist) {
        (**self).replace_items(items)
    }

    fn status(&self, message: &str) {
        (**self).status(message)
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("item text is empty")]
    EmptyText,
    #[error("no item at position {0}")]
    NoSuchItem(usize),
    #[error("failed to save checklist: {0}")]
    Store(#[from] StoreError),
}

type StatusSink = Box<dyn Fn(&str) + Send + Sync>;

/// In-memory list shared between the edit commands and the sync controller,
/// written through to a [`LocalStore`] when one is attached.
pub struct SharedChecklist {
    items: Mutex<Checklist>,
    store: Option<LocalStore>,
    sink: StatusSink,
}

impl SharedChecklist {
    pub fn new(items: Checklist, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            items: Mutex::new(items),
            store: None,
            sink: Box::new(sink),
        }
    }

    /// Loads the list from `store` and persists every later change there.
    pub fn persistent(store: LocalStore, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            items: Mutex::new(store.load()),
            store: Some(store),
            sink: Box::new(sink),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn add(&self, text: &str) -> Result<ChecklistItem, EditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EditError::EmptyText);
        }
        let item = ChecklistItem::new(text);
        self.edit(|items| {
            items.push(item.clone());
            Ok(())
        })?;
        Ok(item)
    }

    /// Flips the `done` flag of the item at `index` and returns the new flag.
    pub fn toggle(&self, index: usize) -> Result<bool, EditError> {
        self.edit(|items| {
            let item = items.get_mut(index).ok_or(EditError::NoSuchItem(index))?;
            item.done = !item.done;
            Ok(item.done)
        })
    }

    pub fn remove(&self, index: usize) -> Result<ChecklistItem, EditError> {
        self.edit(|items| {
            if index >= items.len() {
                return Err(EditError::NoSuchItem(index));
            }
            Ok(items.remove(index))
        })
    }

    fn edit<T>(
        &self,
        apply: impl FnOnce(&mut Checklist) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let mut items = self.lock();
        let out = apply(&mut items)?;
        if let Some(store) = &self.store {
            store.save(&items)?;
        }
        Ok(out)
    }

    fn lock(&self) -> MutexGuard<'_, Checklist> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChecklistHost for SharedChecklist {
    fn items(&self) -> Checklist {
        self.lock().clone()
    }

    fn replace_items(&self, items: Checklist) {
        let mut current = self.lock();
        *current = items;
        if let Some(store) = &self.store
            && let Err(err) = store.save(&current)
        {
            tracing::warn!(%err, "failed to persist remote checklist locally");
        }
    }

    fn status(&self, message: &str) {
        (self.sink)(message)
    }
}
