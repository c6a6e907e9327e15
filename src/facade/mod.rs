pub mod config;
pub mod migrator;

pub use config::MigratorConfig;
pub use migrator::Migrator;
