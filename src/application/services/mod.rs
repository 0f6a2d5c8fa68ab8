//! Application services - helpers shared by feature modules

pub mod points;
pub mod time_format;
pub mod user_service;

pub use points::parse_points_amount;
pub use time_format::{format_date, human_duration, time_since};
pub use user_service::find_or_create_from_input;
