//! Dependency-aware task runner.
//!
//! Tasks declare the outputs they need by [`TaskId`]. A task starts as soon
//! as every task it needs has completed, so chains run strictly in order
//! while independent tasks run concurrently. Dependencies can only name
//! tasks added earlier, which keeps every graph acyclic by construction.

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use reelsmith_error::{CancelledError, ConfigError, ReelsmithError, ReelsmithResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Handle to a task in a [`TaskGraph`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From,
)]
#[display("task#{}", _0)]
pub struct TaskId(usize);

impl TaskId {
    /// Position of the task in insertion order.
    pub fn index(&self) -> usize {
        self.0
    }
}

type TaskFn<T> = Box<dyn FnOnce(Vec<T>) -> BoxFuture<'static, ReelsmithResult<T>> + Send>;

struct Task<T> {
    name: String,
    needs: Vec<TaskId>,
    run: TaskFn<T>,
}

/// A set of tasks with declared input dependencies.
pub struct TaskGraph<T> {
    tasks: Vec<Task<T>>,
}

impl<T> std::fmt::Debug for TaskGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|t| (&t.name, &t.needs)))
            .finish()
    }
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

/// Outputs of a completed graph.
#[derive(Debug, Clone)]
pub struct TaskOutputs<T> {
    values: Vec<T>,
    completion_order: Vec<TaskId>,
}

impl<T> TaskOutputs<T> {
    /// Output of a task.
    pub fn get(&self, id: TaskId) -> Option<&T> {
        self.values.get(id.0)
    }

    /// Tasks in the order they finished.
    pub fn completion_order(&self) -> &[TaskId] {
        &self.completion_order
    }

    /// All outputs in insertion order.
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T> TaskGraph<T>
where
    T: Clone + Send + 'static,
{
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Name of a task.
    pub fn name(&self, id: TaskId) -> Option<&str> {
        self.tasks.get(id.0).map(|t| t.name.as_str())
    }

    /// Declared dependencies of a task.
    pub fn needs(&self, id: TaskId) -> Option<&[TaskId]> {
        self.tasks.get(id.0).map(|t| t.needs.as_slice())
    }

    /// Add a task that receives the outputs of `needs`, in that order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a dependency does not name an existing task.
    pub fn add<F, Fut>(
        &mut self,
        name: impl Into<String>,
        needs: &[TaskId],
        run: F,
    ) -> ReelsmithResult<TaskId>
    where
        F: FnOnce(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ReelsmithResult<T>> + Send + 'static,
    {
        let name = name.into();
        if let Some(unknown) = needs.iter().find(|id| id.0 >= self.tasks.len()) {
            return Err(ConfigError::new(format!(
                "task '{}' needs unknown {}",
                name, unknown
            ))
            .into());
        }
        let id = TaskId(self.tasks.len());
        self.tasks.push(Task {
            name,
            needs: needs.to_vec(),
            run: Box::new(move |inputs| Box::pin(run(inputs))),
        });
        Ok(id)
    }

    /// Run every task, respecting dependencies.
    ///
    /// After the first failure or cancellation no further task is started;
    /// tasks already in flight are allowed to finish so their work is not
    /// lost, then the first error is returned.
    #[tracing::instrument(skip(self, cancel), fields(tasks = self.tasks.len()))]
    pub async fn run(self, cancel: &CancellationToken) -> ReelsmithResult<TaskOutputs<T>> {
        let count = self.tasks.len();
        let mut pending: Vec<Option<Task<T>>> = self.tasks.into_iter().map(Some).collect();
        let mut outputs: Vec<Option<T>> = (0..count).map(|_| None).collect();
        let mut completion_order = Vec::with_capacity(count);
        let mut running = FuturesUnordered::new();
        let mut first_error: Option<ReelsmithError> = None;

        loop {
            if first_error.is_none() && cancel.is_cancelled() {
                first_error = Some(CancelledError::new("task graph").into());
            }

            if first_error.is_none() {
                for index in 0..count {
                    let inputs = match &pending[index] {
                        Some(task) => task
                            .needs
                            .iter()
                            .map(|dep| outputs[dep.0].clone())
                            .collect::<Option<Vec<T>>>(),
                        None => None,
                    };
                    let Some(inputs) = inputs else { continue };
                    let Some(task) = pending[index].take() else { continue };
                    tracing::debug!(task = %task.name, "Starting task");
                    let name = task.name;
                    let future = (task.run)(inputs);
                    running.push(async move { (index, name, future.await) });
                }
            }

            if running.is_empty() {
                break;
            }

            let finished = tokio::select! {
                _ = cancel.cancelled(), if first_error.is_none() => {
                    tracing::warn!("Cancelled, draining in-flight tasks");
                    first_error = Some(CancelledError::new("task graph").into());
                    continue;
                }
                finished = running.next() => finished,
            };

            match finished {
                Some((index, name, Ok(value))) => {
                    tracing::debug!(task = %name, "Task complete");
                    outputs[index] = Some(value);
                    completion_order.push(TaskId(index));
                }
                Some((_, name, Err(e))) => {
                    tracing::warn!(task = %name, error = %e, "Task failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                None => break,
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let values = outputs.into_iter().collect::<Option<Vec<T>>>().ok_or_else(|| {
            ReelsmithError::from(ConfigError::new("task graph finished with unsatisfied tasks"))
        })?;
        Ok(TaskOutputs {
            values,
            completion_order,
        })
    }
}
