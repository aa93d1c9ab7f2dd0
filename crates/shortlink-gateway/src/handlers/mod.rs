mod health;
mod url;

pub use health::ping_handler;
pub use url::{create_link_handler, redirect_handler};
