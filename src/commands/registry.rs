//! Selector -> command lookup table.

use std::collections::HashMap;
use std::rc::Rc;

use super::types::Command;

/// Maps lowercased selectors (names and aliases) to commands. A command's
/// name and all its aliases point at the same `Rc`, so lookups through any
/// selector yield the same identity. Keys are independent: re-registering a
/// selector replaces that key only (last write wins, with a warning).
#[derive(Default)]
pub struct CommandRegistry {
    entries: HashMap<String, Rc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) {
        let command = Rc::new(command);

        let name = command.spec.name.trim().to_lowercase();
        if name.is_empty() {
            tracing::warn!("ignoring command with an empty name");
            return;
        }
        self.insert_key(name, &command);

        for alias in &command.spec.aliases {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() {
                tracing::warn!(command = %command.spec.name, "ignoring empty alias");
                continue;
            }
            self.insert_key(alias, &command);
        }
    }

    fn insert_key(&mut self, key: String, command: &Rc<Command>) {
        if let Some(previous) = self.entries.insert(key.clone(), Rc::clone(command)) {
            if !Rc::ptr_eq(&previous, command) {
                tracing::warn!(
                    selector = %key,
                    replaced = %previous.spec.name,
                    by = %command.spec.name,
                    "selector re-registered"
                );
            }
        }
    }

    /// Case-insensitive exact lookup. No prefix or fuzzy matching.
    pub fn lookup(&self, selector: &str) -> Option<Rc<Command>> {
        self.entries.get(&selector.trim().to_lowercase()).cloned()
    }

    /// Every registered command once, regardless of how many selectors point
    /// at it. Entries with an empty name are skipped. Order is unspecified;
    /// callers sort for presentation.
    pub fn list(&self) -> Vec<Rc<Command>> {
        let mut commands: Vec<Rc<Command>> = Vec::new();
        for command in self.entries.values() {
            if command.spec.name.is_empty() {
                continue;
            }
            if commands.iter().any(|c| Rc::ptr_eq(c, command)) {
                continue;
            }
            commands.push(Rc::clone(command));
        }
        commands
    }
}
