pub mod clipboard;
mod command;
mod feeders;
pub mod markdown;
pub mod render;
pub mod state;
mod styles;
mod tui;
mod view;

pub use clipboard::{Clipboard, MemoryClipboard, Osc52Clipboard};
pub use command::{Command, parse_command};
pub use feeders::spawn_tui_feeders;
pub use tui::{TuiActor, TuiMsg, install_panic_hook, restore_terminal};
