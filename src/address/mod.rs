//! Key Resolver - composite addresses for task executions
//!
//! Every tracking record is addressed by six dimensions:
//!
//! ```text
//! job_id / component_name / task_id / task_version / role / party_id
//! └────────────── LogicalTask (minus task_version) ──────────────┘
//! ```
//!
//! Two resolution modes are provided:
//!
//! - **full** ([`TaskAddress::resolve`]): all six fields required, used for
//!   writes and task-scoped reads
//! - **partial** ([`AddressFilter::resolve`]): `job_id` required,
//!   component/role/party optional, used for job-level listings
//!
//! Resolution is pure validation and construction; nothing is stored.
//!
//! ## Example
//!
//! ```rust
//! use trueno_tracking::address::{Role, TaskAddress};
//!
//! let address = TaskAddress::resolve("J1", "intersect", "T1", "0", "guest", "9999")?;
//! assert_eq!(address.role(), Role::Guest);
//! assert_eq!(address.task_version(), 0);
//! # Ok::<(), trueno_tracking::Error>(())
//! ```

pub mod key;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Role a party plays in a multi-party job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Party that initiates the job and usually holds labels.
    Guest,
    /// Party contributing data.
    Host,
    /// Trusted third party coordinating aggregation.
    Arbiter,
    /// Single-party standalone execution.
    Local,
}

impl Role {
    /// All recognized roles.
    pub const ALL: [Self; 4] = [Self::Guest, Self::Host, Self::Arbiter, Self::Local];

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Host => "host",
            Self::Arbiter => "arbiter",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    // Addresses are case-sensitive: "Guest" is not a role.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::InvalidAddress(format!("unrecognized role '{s}'")))
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidAddress(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_task_version(raw: &str) -> Result<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidAddress(format!(
            "task_version '{raw}' is not a non-negative integer"
        )));
    }
    raw.parse()
        .map_err(|_| Error::InvalidAddress(format!("task_version '{raw}' is out of range")))
}

/// Address of one execution attempt of one task.
///
/// `(job_id, component_name, task_id, task_version, role, party_id)` is unique
/// per attempt. Identifiers are compared exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskAddress {
    job_id: String,
    component_name: String,
    task_id: String,
    task_version: u64,
    role: Role,
    party_id: String,
}

impl TaskAddress {
    /// Create a validated address from typed parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if any string field is empty.
    pub fn new(
        job_id: impl Into<String>,
        component_name: impl Into<String>,
        task_id: impl Into<String>,
        task_version: u64,
        role: Role,
        party_id: impl Into<String>,
    ) -> Result<Self> {
        let address = Self {
            job_id: job_id.into(),
            component_name: component_name.into(),
            task_id: task_id.into(),
            task_version,
            role,
            party_id: party_id.into(),
        };
        require("job_id", &address.job_id)?;
        require("component_name", &address.component_name)?;
        require("task_id", &address.task_id)?;
        require("party_id", &address.party_id)?;
        Ok(address)
    }

    /// Full-mode resolution from raw identifier strings (e.g. URL path segments).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] when a field is empty, `task_version`
    /// is not a non-negative integer, or `role` is not recognized.
    pub fn resolve(
        job_id: &str,
        component_name: &str,
        task_id: &str,
        task_version: &str,
        role: &str,
        party_id: &str,
    ) -> Result<Self> {
        let task_version = parse_task_version(task_version)?;
        let role = role.parse()?;
        Self::new(job_id, component_name, task_id, task_version, role, party_id)
    }

    /// Get the job ID.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Get the component (pipeline stage) name.
    #[must_use]
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Get the task ID.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Get the attempt number.
    #[must_use]
    pub const fn task_version(&self) -> u64 {
        self.task_version
    }

    /// Get the role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Get the party ID.
    #[must_use]
    pub fn party_id(&self) -> &str {
        &self.party_id
    }

    /// The logical task this attempt belongs to.
    #[must_use]
    pub fn logical(&self) -> LogicalTask {
        LogicalTask {
            job_id: self.job_id.clone(),
            component_name: self.component_name.clone(),
            task_id: self.task_id.clone(),
            role: self.role,
            party_id: self.party_id.clone(),
        }
    }

    /// Same logical task, different attempt.
    #[must_use]
    pub fn with_version(&self, task_version: u64) -> Self {
        Self {
            task_version,
            ..self.clone()
        }
    }

    /// Storage key: `head / job / component / task / role / party / version / tail`.
    ///
    /// The version follows the logical-task segments so that
    /// [`LogicalTask::storage_prefix`] covers every attempt.
    pub(crate) fn storage_key(&self, head: &[&str], tail: &[&str]) -> String {
        let version = self.task_version.to_string();
        let mut segments: Vec<&str> = Vec::with_capacity(head.len() + 6 + tail.len());
        segments.extend_from_slice(head);
        segments.extend_from_slice(&[
            self.job_id.as_str(),
            self.component_name.as_str(),
            self.task_id.as_str(),
            self.role.as_str(),
            self.party_id.as_str(),
            version.as_str(),
        ]);
        segments.extend_from_slice(tail);
        key::join(&segments)
    }

    /// Storage key shared by every task and attempt of this party's component:
    /// `head / job / component / role / party / tail`.
    pub(crate) fn party_key(&self, head: &str, tail: &[&str]) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(5 + tail.len());
        segments.extend_from_slice(&[
            head,
            self.job_id.as_str(),
            self.component_name.as_str(),
            self.role.as_str(),
            self.party_id.as_str(),
        ]);
        segments.extend_from_slice(tail);
        key::join(&segments)
    }
}

impl fmt::Display for TaskAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.job_id,
            self.component_name,
            self.task_id,
            self.task_version,
            self.role,
            self.party_id
        )
    }
}

/// A task across all of its attempts (a [`TaskAddress`] without `task_version`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalTask {
    job_id: String,
    component_name: String,
    task_id: String,
    role: Role,
    party_id: String,
}

impl LogicalTask {
    /// Create a validated logical task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if any string field is empty.
    pub fn new(
        job_id: impl Into<String>,
        component_name: impl Into<String>,
        task_id: impl Into<String>,
        role: Role,
        party_id: impl Into<String>,
    ) -> Result<Self> {
        // Validate through TaskAddress so both share one rule set.
        Ok(TaskAddress::new(job_id, component_name, task_id, 0, role, party_id)?.logical())
    }

    /// Address of a specific attempt.
    #[must_use]
    pub fn at_version(&self, task_version: u64) -> TaskAddress {
        TaskAddress {
            job_id: self.job_id.clone(),
            component_name: self.component_name.clone(),
            task_id: self.task_id.clone(),
            task_version,
            role: self.role,
            party_id: self.party_id.clone(),
        }
    }

    /// Whether `address` is an attempt of this task.
    #[must_use]
    pub fn contains(&self, address: &TaskAddress) -> bool {
        self.job_id == address.job_id
            && self.component_name == address.component_name
            && self.task_id == address.task_id
            && self.role == address.role
            && self.party_id == address.party_id
    }

    pub(crate) fn storage_prefix(&self, head: &[&str]) -> String {
        let mut segments: Vec<&str> = head.to_vec();
        segments.extend_from_slice(&[
            self.job_id.as_str(),
            self.component_name.as_str(),
            self.task_id.as_str(),
            self.role.as_str(),
            self.party_id.as_str(),
        ]);
        key::prefix(&segments)
    }
}

/// Picks the authoritative attempt: the numerically greatest `task_version`.
///
/// Versions need not be contiguous.
#[must_use]
pub fn latest_version<I>(versions: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    versions.into_iter().max()
}

/// Partial address for job-level listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFilter {
    job_id: String,
    component_name: Option<String>,
    role: Option<Role>,
    party_id: Option<String>,
}

impl AddressFilter {
    /// Filter matching every record of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `job_id` is empty.
    pub fn job(job_id: impl Into<String>) -> Result<Self> {
        let job_id = job_id.into();
        require("job_id", &job_id)?;
        Ok(Self {
            job_id,
            component_name: None,
            role: None,
            party_id: None,
        })
    }

    /// Partial-mode resolution from raw identifier strings.
    ///
    /// Omitted dimensions match anything; supplied ones must be valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `job_id` or a supplied optional
    /// field is empty, or a supplied role is not recognized.
    pub fn resolve(
        job_id: &str,
        component_name: Option<&str>,
        role: Option<&str>,
        party_id: Option<&str>,
    ) -> Result<Self> {
        let mut filter = Self::job(job_id)?;
        if let Some(component_name) = component_name {
            require("component_name", component_name)?;
            filter.component_name = Some(component_name.to_string());
        }
        if let Some(role) = role {
            filter.role = Some(role.parse()?);
        }
        if let Some(party_id) = party_id {
            require("party_id", party_id)?;
            filter.party_id = Some(party_id.to_string());
        }
        Ok(filter)
    }

    /// Get the job ID.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Get the component filter, if any.
    #[must_use]
    pub fn component_name(&self) -> Option<&str> {
        self.component_name.as_deref()
    }

    /// Get the role filter, if any.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Get the party filter, if any.
    #[must_use]
    pub fn party_id(&self) -> Option<&str> {
        self.party_id.as_deref()
    }

    /// Whether `address` falls inside this filter.
    #[must_use]
    pub fn matches(&self, address: &TaskAddress) -> bool {
        self.job_id == address.job_id
            && self
                .component_name
                .as_ref()
                .map_or(true, |c| *c == address.component_name)
            && self.role.map_or(true, |r| r == address.role)
            && self.party_id.as_ref().map_or(true, |p| *p == address.party_id)
    }
}

/// Scope of a metric series.
///
/// Job-level metrics ignore component/task/role/party; task-level metrics are
/// scoped to the full address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum MetricScope {
    /// Whole job.
    Job {
        /// Job the metric belongs to
        job_id: String,
    },
    /// One task execution.
    Task(TaskAddress),
}

impl MetricScope {
    /// Derive the scope from a writer's address and the `job_level` flag.
    #[must_use]
    pub fn from_address(address: &TaskAddress, job_level: bool) -> Self {
        if job_level {
            Self::Job {
                job_id: address.job_id.clone(),
            }
        } else {
            Self::Task(address.clone())
        }
    }

    /// Job-level scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `job_id` is empty.
    pub fn job(job_id: impl Into<String>) -> Result<Self> {
        let job_id = job_id.into();
        require("job_id", &job_id)?;
        Ok(Self::Job { job_id })
    }

    /// Get the job ID.
    #[must_use]
    pub fn job_id(&self) -> &str {
        match self {
            Self::Job { job_id } => job_id,
            Self::Task(address) => address.job_id(),
        }
    }

    /// Whether this is a job-level scope.
    #[must_use]
    pub const fn is_job_level(&self) -> bool {
        matches!(self, Self::Job { .. })
    }

    pub(crate) fn storage_key(&self, head: &[&str], tail: &[&str]) -> String {
        match self {
            Self::Job { job_id } => {
                let mut segments: Vec<&str> = head.to_vec();
                segments.extend_from_slice(&["job", job_id.as_str()]);
                segments.extend_from_slice(tail);
                key::join(&segments)
            }
            Self::Task(address) => {
                let mut task_head: Vec<&str> = head.to_vec();
                task_head.push("task");
                address.storage_key(&task_head, tail)
            }
        }
    }
}
