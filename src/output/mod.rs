pub mod formatters;
pub mod senders;

pub use formatters::{formatter_for, DataFormatter, JsonFormatter, TextFormatter};
pub use senders::{ConsoleSender, DataSender, FileSender};
