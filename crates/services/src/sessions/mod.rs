mod progress;
mod state;
mod workflow;

pub use progress::{SessionProgress, TimePressure};
pub use state::{ExamSession, NavigationTarget};
pub use workflow::ExamWorkflow;
