pub mod is_elevated;
pub mod path;
pub mod threads;
