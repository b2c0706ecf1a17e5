pub mod document;
pub mod settings;
