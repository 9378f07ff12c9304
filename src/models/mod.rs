pub mod task;
pub mod user;

pub use task::{
    today, Period, Task, TaskCategory, TaskDraft, TaskFilter, TaskInput, TaskStats, TaskUpdate,
};
pub use user::{NewUser, User, UserResponse};
