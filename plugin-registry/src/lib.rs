pub mod cli;
pub mod load_plugins;
pub mod removed;
pub mod sort_json;
