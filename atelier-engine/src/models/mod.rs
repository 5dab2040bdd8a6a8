//! Data model for Atelier projects, blueprints and analyses

pub mod blueprint;
pub mod project;

pub use blueprint::{severity_in_range, Analysis, Blueprint, Persona, TradeOff};
pub use project::{Project, ProjectStatus, StatusTransition};
