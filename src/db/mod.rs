mod connection;
mod helpers;
mod media_items;
mod migrations;

pub use connection::Database;
pub use media_items::MediaItem;
