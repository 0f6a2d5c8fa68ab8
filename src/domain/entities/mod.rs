//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;
pub mod song;

pub use user::User;
pub use message::{Message, MessageKind};
pub use command::{Command, CommandExample, CommandHandler, CommandRegistry, Execution};
pub use song::{SongInfo, SongRequest};
