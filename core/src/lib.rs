//! Theme discovery, activation and request handling.

pub mod activator;
pub mod compiler;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;
pub mod store;

pub use activator::ActivationReport;
pub use activator::ActivationStep;
pub use activator::StepStatus;
pub use activator::ThemeActivator;
pub use compiler::CompiledStylesheet;
pub use compiler::SassCommand;
pub use compiler::StylesheetCompiler;
pub use config::ThemerConfig;
pub use error::CompileError;
pub use error::ConfigError;
pub use error::ThemeError;
pub use repository::ThemeCatalog;
pub use repository::ThemeLoadWarning;
pub use repository::ThemeRepository;
pub use service::ThemeService;
pub use store::ActiveThemeStore;
