//! Export summary tree and completeness check
//!
//! The summary mirrors the exported hierarchy and is keyed by entity name:
//!
//! ```json
//! {
//!   "me@example.com": {
//!     "myOrg": {
//!       "numTasks": 2,
//!       "myWorkspace": {
//!         "myApp": { "numFiles": 2, "downloadedFiles": 0, "numItems": 2, "totalItems": 2 }
//!       }
//!     },
//!     "numContacts": 2
//!   }
//! }
//! ```
//!
//! Maps are ordered, so the completeness check walks the tree in a
//! deterministic depth-first order.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};

use crate::output::sanitize_segment;

/// Counters of one application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    /// File entries listed for the app
    pub num_files: u64,
    /// File entries downloaded to disk
    pub downloaded_files: u64,
    /// Items exported
    pub num_items: u64,
    /// Items the server reported on the first page
    pub total_items: u64,
}

impl AppSummary {
    /// Every reported item was exported
    pub fn items_complete(&self) -> bool {
        self.num_items == self.total_items
    }

    /// Every listed file was downloaded
    pub fn files_complete(&self) -> bool {
        self.num_files == self.downloaded_files
    }
}

/// Applications of one workspace, keyed by app name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceSummary {
    /// Application summaries
    pub apps: BTreeMap<String, AppSummary>,
}

/// Tasks and workspaces of one organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSummary {
    /// Tasks exported for the organization
    #[serde(rename = "numTasks")]
    pub num_tasks: u64,
    /// Workspace summaries, keyed by workspace name
    #[serde(flatten)]
    pub workspaces: BTreeMap<String, WorkspaceSummary>,
}

/// Everything exported for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Organization summaries, keyed by organization name
    #[serde(flatten)]
    pub organizations: BTreeMap<String, OrgSummary>,
    /// Contacts exported for the account
    #[serde(rename = "numContacts")]
    pub num_contacts: u64,
}

/// Summary report of one export run, serialized as `{ <username>: <account> }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Account the export ran for
    pub username: String,
    /// Account tree
    pub account: AccountSummary,
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.username, &self.account)?;
        map.end()
    }
}

/// The export finished but the summary shows missing data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletenessError {
    /// `numItems != totalItems`
    #[error("Not all items for application '{0}' have been exported!")]
    ItemsIncomplete(String),

    /// `numFiles != downloadedFiles`
    #[error("Not all files for application '{0}' have been downloaded!")]
    FilesIncomplete(String),
}

impl Summary {
    /// Create a summary for `username`
    pub fn new(username: impl Into<String>, account: AccountSummary) -> Self {
        Self {
            username: username.into(),
            account,
        }
    }

    /// All applications, depth-first in key order
    pub fn applications(&self) -> impl Iterator<Item = (&str, &AppSummary)> {
        self.account
            .organizations
            .values()
            .flat_map(|org| org.workspaces.values())
            .flat_map(|workspace| workspace.apps.iter())
            .map(|(name, app)| (name.as_str(), app))
    }

    /// Check every application for missing items, then (when downloads are
    /// enabled) for missing files
    ///
    /// Reports the first offending application.
    pub fn check_completeness(&self, downloads_enabled: bool) -> Result<(), CompletenessError> {
        if let Some((name, _)) = self.applications().find(|(_, app)| !app.items_complete()) {
            return Err(CompletenessError::ItemsIncomplete(name.to_string()));
        }

        if downloads_enabled {
            if let Some((name, _)) = self.applications().find(|(_, app)| !app.files_complete()) {
                return Err(CompletenessError::FilesIncomplete(name.to_string()));
            }
        }

        Ok(())
    }
}

/// Assign unique summary keys to sibling entities
///
/// Keys are entity names and also name the entity's directory, so they must
/// stay distinct after sanitizing and on case-insensitive filesystems. A
/// name whose directory segment is already taken by an earlier sibling is
/// suffixed with the entity's ID, e.g. `Leads (42)`.
pub fn assign_keys<'a, I>(entities: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut taken = HashSet::new();
    entities
        .into_iter()
        .map(|(name, id)| {
            let mut key = name.to_string();
            while !taken.insert(directory_segment(&key)) {
                key = format!("{key} ({id})");
            }
            key
        })
        .collect()
}

fn directory_segment(key: &str) -> String {
    sanitize_segment(key).to_lowercase()
}
