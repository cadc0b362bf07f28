mod commands;
mod controller;
mod dispatch;
mod interactive;
mod render;
mod state;

pub use commands::{ConsoleCommand, ConsoleResult};
pub use controller::Console;
pub use interactive::InteractiveConsole;
pub use render::{
    render_comparison, render_config, render_history, render_report, render_validation,
    OutputFormat,
};
pub use state::{InferenceRequest, SelectedFile, SessionState, StatusLevel, StatusMessage};
