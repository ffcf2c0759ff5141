//! clean-folder - sort a messy folder in place
//!
//! This library classifies files into fixed category folders by extension,
//! unpacks archives, normalizes file and folder names to ASCII (transliterating
//! Cyrillic), resolves name collisions and removes folders left empty.

pub mod archive;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod report;

pub use config::{CompiledFilters, ConfigError, FilterConfig};
pub use file_category::Category;
pub use file_organizer::{FileOrganizer, OrganizeError, OrganizeResult};
pub use pipeline::Organizer;
pub use report::{RunReport, Stage};

pub use cli::{Args, run_cli};
