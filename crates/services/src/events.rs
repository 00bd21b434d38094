//! Table-change notifications.
//!
//! Services announce which logical table a successful write touched;
//! presentation code subscribes and refetches whatever it renders from that
//! table. The hub carries no payloads, so listeners can never render stale
//! row data from an event.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Logical tables a write can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedTable {
    Courses,
    Lessons,
    Enrollments,
    LessonProgress,
    Quizzes,
}

/// Receives change notifications. Implemented for any suitable closure.
pub trait ChangeListener: Send + Sync {
    fn on_table_changed(&self, table: ChangedTable);
}

impl<F> ChangeListener for F
where
    F: Fn(ChangedTable) + Send + Sync,
{
    fn on_table_changed(&self, table: ChangedTable) {
        self(table);
    }
}

/// Fan-out registry for [`ChangeListener`]s.
///
/// Cloning shares the registry. Notification is best-effort: a poisoned
/// registry lock drops the event rather than failing the write that
/// triggered it.
#[derive(Clone, Default)]
pub struct ChangeHub {
    listeners: Arc<Mutex<Vec<Arc<dyn ChangeListener>>>>,
}

impl ChangeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        if let Ok(mut guard) = self.listeners.lock() {
            guard.push(listener);
        }
    }

    pub fn subscribe_fn(&self, listener: impl Fn(ChangedTable) + Send + Sync + 'static) {
        self.subscribe(Arc::new(listener));
    }

    pub fn notify(&self, table: ChangedTable) {
        let Ok(guard) = self.listeners.lock() else {
            return;
        };
        let listeners: Vec<Arc<dyn ChangeListener>> = guard.clone();
        drop(guard);
        for listener in listeners {
            listener.on_table_changed(table);
        }
    }
}
