/// Tasks
///
/// - [`workflow`]: gateway-backed operations (list, create, update, status, delete)
/// - [`view`]: filtering, search, sorting, statistics and display names

pub mod view;
pub mod workflow;

pub use view::{SortKey, StatusFilter, TaskStats};
pub use workflow::{
    Assignment, Confirmation, TaskDraft, TaskService, TaskWrite, WorkflowError, WorkflowResult,
};
