pub mod console_interface;
pub mod core;
pub mod level;
pub mod models;
pub mod persist;
pub mod playback;
pub mod progress;
pub mod rules;

#[cfg(test)]
mod test;
