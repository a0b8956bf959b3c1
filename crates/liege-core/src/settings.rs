//! Engine settings.
//!
//! All configuration is explicit and handed to the engine at construction
//! time; there is no global state and no lazy lookup at call sites.

use serde::{Deserialize, Serialize};

/// A role definition triple used in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
	pub name: Box<str>,
	pub level: i32,
	/// Whether the role extends access to descendant nodes
	pub inherited: bool,
}

impl RoleSpec {
	pub fn new(name: impl Into<Box<str>>, level: i32, inherited: bool) -> Self {
		Self { name: name.into(), level, inherited }
	}
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
	/// Attached automatically when a membership is created with no roles.
	/// Ensured in the catalog at engine construction.
	pub default_role: RoleSpec,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self { default_role: RoleSpec::new("guest", 0, false) }
	}
}

// vim: ts=4
