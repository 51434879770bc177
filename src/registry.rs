//! Task registry.
//!
//! An ordered, closed catalog of descriptors paired one-to-one with units.
//! Registration happens while the process starts up; after that the registry
//! is only read (the engine shares it behind an `Arc`). Registry order is
//! presentation order.

use crate::error::EngineError;
use crate::task::{TaskDescriptor, TaskUnit};

struct RegisteredTask {
    descriptor: TaskDescriptor,
    unit: Box<dyn TaskUnit>,
}

/// Ordered catalog of maintenance tasks.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task and return its index.
    ///
    /// # Errors
    ///
    /// `DuplicateTask` if a task with the same name is already registered.
    pub fn register<U>(&mut self, descriptor: TaskDescriptor, unit: U) -> Result<usize, EngineError>
    where
        U: TaskUnit + 'static,
    {
        if self.position(&descriptor.name).is_some() {
            return Err(EngineError::DuplicateTask(descriptor.name));
        }
        self.tasks.push(RegisteredTask {
            descriptor,
            unit: Box::new(unit),
        });
        Ok(self.tasks.len() - 1)
    }

    /// Descriptors in registry order.
    pub fn list(&self) -> impl Iterator<Item = &TaskDescriptor> + '_ {
        self.tasks.iter().map(|t| &t.descriptor)
    }

    pub fn descriptor(&self, index: usize) -> Option<&TaskDescriptor> {
        self.tasks.get(index).map(|t| &t.descriptor)
    }

    pub fn unit_for(&self, index: usize) -> Option<&dyn TaskUnit> {
        self.tasks.get(index).map(|t| t.unit.as_ref())
    }

    /// Index of the task with the given display name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.descriptor.name == name)
    }

    /// Indices of the tasks that start out selected.
    pub fn default_selection(&self) -> Vec<usize> {
        self.list()
            .enumerate()
            .filter(|(_, d)| d.enabled_by_default)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.list()).finish()
    }
}
