//! Default values for hwgraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Store Defaults
// ============================================================================

/// Default store backend.
pub const DEFAULT_STORE_BACKEND: &str = "surreal";

/// Default on-disk database location.
pub const DEFAULT_STORE_PATH: &str = ".hwgraph/db";

/// Default SurrealDB namespace.
pub const DEFAULT_NAMESPACE: &str = "hwgraph";

/// Default SurrealDB database.
pub const DEFAULT_DATABASE: &str = "inventory";

// ============================================================================
// Inventory Defaults
// ============================================================================

/// Id of the group every newly discovered resource joins.
pub const DEFAULT_GROUP_ID: &str = "00000000-0000-7000-8000-000000000000";

/// Name of the default group.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Description of the default group.
pub const DEFAULT_GROUP_DESCRIPTION: &str = "Resources not assigned to any other group";

/// Device properties normalized to an empty list when null or absent.
pub const DEFAULT_LIST_PROPERTIES: &[&str] = &["links"];

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "hwgraph=info";

// ============================================================================
// File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "hwgraph.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "hwgraph";

/// File name under [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.toml";
