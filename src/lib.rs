//! metaclean - inspect, edit, and strip embedded metadata from media files.
//!
//! The heavy lifting is done by ExifTool running as a subprocess. This crate
//! owns the workflow around it: walking a set of files, loading and grouping
//! their metadata, tracking edits, and stripping metadata behind a
//! backup/restore guard so a failed strip never damages the original.

// Leaf modules
pub mod error;
pub mod labels;
pub mod policy;
pub mod tags;
pub mod types;
pub mod value;

// External tool boundary
pub mod tool;

// Workflow
pub mod backup;
pub mod clean;
pub mod config;
pub mod navigator;
pub mod organizer;
pub mod session;
pub mod store;

pub use clean::{CleanEvent, CleanOrchestrator};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, Result, Severity};
pub use labels::{LabelFile, LabelLookup, NoLabels};
pub use navigator::FileSetNavigator;
pub use organizer::{organize, FieldEntry, FieldGroup, OrganizedMetadata};
pub use session::{Activity, Session, SessionEvent};
pub use store::MetadataStore;
pub use tool::{ExifTool, MetadataTool};
pub use types::*;
pub use value::{MetaValue, RawMetadata};
