//! Runtime-replaceable command registry.
//!
//! The registry is an immutable map published through an atomic pointer.
//! Lookups take a snapshot without locking; updates build a new map and swap
//! it in, so commands can be added or reclassified while sessions are live.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::host::Host;
use crate::operations::{self, OperationResult, Params};
use crate::workflow::WorkflowEngine;

/// Handler signature for registered commands.
pub type Handler = Arc<dyn Fn(&dyn Host, &Params) -> OperationResult + Send + Sync>;

/// A registered command and how the router must run it.
#[derive(Clone)]
pub struct RegistryEntry {
    handler: Handler,
    mutating: bool,
}

impl RegistryEntry {
    /// Entry whose handler must run on the owner thread.
    pub fn mutating(handler: Handler) -> Self {
        Self {
            handler,
            mutating: true,
        }
    }

    /// Entry whose handler may run on the session thread.
    pub fn read_only(handler: Handler) -> Self {
        Self {
            handler,
            mutating: false,
        }
    }

    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    #[must_use]
    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegistryEntry")
            .field("mutating", &self.mutating)
            .finish_non_exhaustive()
    }
}

type Table = HashMap<String, RegistryEntry>;

/// Atomically swapped map of dynamic commands.
pub struct CommandRegistry {
    entries: ArcSwap<Table>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Table::new()),
        }
    }

    /// Registry preloaded with the bundled dynamic commands.
    #[must_use]
    pub fn with_defaults(workflows: Arc<WorkflowEngine>) -> Self {
        let registry = Self::new();
        registry.register(
            "jump_to_locator",
            RegistryEntry::mutating(Arc::new(operations::jump_to_locator)),
        );
        registry.register(
            "get_locator_names",
            RegistryEntry::read_only(Arc::new(operations::get_locator_names)),
        );
        registry.register(
            "record_arrangement_sections",
            RegistryEntry::mutating(Arc::new(move |_host: &dyn Host, params: &Params| {
                workflows.start_recording(params)
            })),
        );
        registry
    }

    /// Snapshot lookup of one command.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.load().get(name).cloned()
    }

    /// Adds or reclassifies a command.
    pub fn register(&self, name: impl Into<String>, entry: RegistryEntry) {
        let name = name.into();
        self.entries.rcu(|current| {
            let mut next = Table::clone(current);
            next.insert(name.clone(), entry.clone());
            next
        });
    }

    /// Removes a command, returning whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let previous = self.entries.rcu(|current| {
            let mut next = Table::clone(current);
            next.remove(name);
            next
        });
        previous.contains_key(name)
    }

    /// Publishes a whole new table at once.
    pub fn replace(&self, entries: impl IntoIterator<Item = (String, RegistryEntry)>) {
        self.entries.store(Arc::new(entries.into_iter().collect()));
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.load().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
