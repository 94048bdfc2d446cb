//! Role seed configuration loading from config.toml
//!
//! The departments and roles listed in config.toml, together with the roles'
//! access grants, are seeded into the database at startup. A role names its
//! department by code or name. Grants are written per feature area as a list of
//! permission names:
//!
//! ```toml
//! [[departments]]
//! code = "SAL"
//! department_name = "Sales"
//!
//! [[roles]]
//! name = "Sales Representative"
//! department = "Sales"
//! access = { customer = ["view", "create", "edit"], quotation = ["full_access"] }
//! ```

use crate::core::access::{FeatureArea, PermissionGroup};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Departments to seed, before any role
    #[serde(default)]
    pub departments: Vec<DepartmentConfig>,
    /// Roles to seed
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
}

/// Configuration for a single department
#[derive(Debug, Deserialize, Clone)]
pub struct DepartmentConfig {
    /// Unique short code
    pub code: String,
    /// Unique display name
    pub department_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Configuration for a single role
#[derive(Debug, Deserialize, Clone)]
pub struct RoleConfig {
    /// Role name, unique within its department
    pub name: String,
    /// Code or name of the department the role belongs to
    #[serde(default)]
    pub department: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether holders of the role may manage users and roles
    #[serde(default)]
    pub is_admin: bool,
    /// Feature area name to permission names
    #[serde(default)]
    pub access: BTreeMap<String, Vec<String>>,
}

impl RoleConfig {
    /// Resolves the textual grants into typed permission groups.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when an area or permission name is unknown. Grants are
    /// never silently dropped.
    pub fn permission_groups(&self) -> Result<Vec<(FeatureArea, PermissionGroup)>> {
        self.access
            .iter()
            .map(|(area_name, permissions)| {
                let area: FeatureArea = area_name.parse().map_err(|()| Error::Config {
                    message: format!("Role '{}': unknown feature area '{area_name}'", self.name),
                })?;
                let group = PermissionGroup::from_names(permissions).ok_or_else(|| {
                    Error::Config {
                        message: format!(
                            "Role '{}': unknown permission in {area_name} = {permissions:?}",
                            self.name
                        ),
                    }
                })?;
                Ok((area, group))
            })
            .collect()
    }
}

/// Loads role configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `ERP_CONFIG`, or `./config.toml` when unset
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("ERP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
