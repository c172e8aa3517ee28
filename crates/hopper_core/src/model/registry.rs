//! Process-wide task registry and its storage document.
//!
//! # Invariants
//! - Tasks keep insertion order.
//! - Task IDs are unique within one registry.
//! - There is exactly one live `Registry`; persistence works on snapshots.

use crate::model::task::Task;
use serde::{Deserialize, Serialize};

/// Storage document version written by this binary.
pub const STORE_VERSION: u32 = 1;

/// In-memory registry of all tasks plus app-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    pub created_at: i64,
    pub updated_at: i64,
    /// Managed upload reference used as the app background.
    pub background_url: Option<String>,
    pub tasks: Vec<Task>,
}

impl Registry {
    pub fn empty(now_ms: i64) -> Self {
        Self {
            created_at: now_ms,
            updated_at: now_ms,
            background_url: None,
            tasks: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Removes a task, preserving the order of the remaining ones.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }

    /// Captures a full snapshot for persistence.
    pub fn to_document(&self) -> RegistryDocument {
        RegistryDocument {
            version: STORE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            background_url: self.background_url.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

/// Versioned on-disk shape of the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    pub version: u32,
    pub created_at: i64,
    pub updated_at: i64,
    pub background_url: Option<String>,
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::{Registry, STORE_VERSION};
    use crate::model::day_key::DayKey;
    use crate::model::task::Task;

    #[test]
    fn remove_keeps_insertion_order() {
        let today = DayKey::parse("2025-01-01").expect("fixture day key should parse");
        let mut registry = Registry::empty(1);
        for name in ["a", "b", "c"] {
            registry.tasks.push(Task::new(name, None, today, 1));
        }
        let middle = registry.tasks[1].id.clone();

        let removed = registry.remove(&middle).expect("middle task should be removed");
        assert_eq!(removed.name, "b");
        let names: Vec<_> = registry.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(registry.remove(&middle).is_none());
    }

    #[test]
    fn document_carries_version_and_top_level_fields() {
        let mut registry = Registry::empty(5);
        registry.background_url = Some("/uploads/bg.jpg".to_string());
        registry.touch(9);

        let json = serde_json::to_value(registry.to_document()).expect("value should serialize");
        assert_eq!(json["version"], STORE_VERSION);
        assert_eq!(json["createdAt"], 5);
        assert_eq!(json["updatedAt"], 9);
        assert_eq!(json["backgroundUrl"], "/uploads/bg.jpg");
        assert!(json["tasks"].as_array().expect("tasks should be an array").is_empty());
    }
}
