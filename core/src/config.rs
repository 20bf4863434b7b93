//! Engine configuration: queue vocabulary, account filters, thresholds.
//!
//! Everything the aggregations need beyond the dataset itself lives here and
//! is passed in explicitly; there is no ambient session state. The default
//! configuration mirrors the operational vocabulary of the source exports;
//! deployments override it from a JSON file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Accounts whose rows are automation artifacts, dropped before
    /// persistence (compared lowercased).
    pub automation_accounts: Vec<String>,

    /// Upload columns known to be irrelevant; removed before schema
    /// detection (matched against trimmed uppercase headers).
    pub dropped_columns: Vec<String>,

    /// Queue whose long rows are measurement outliers (interrupted timers),
    /// excluded from analyst-level TMO computations.
    pub outlier_queue: String,
    /// Outlier threshold for `outlier_queue`, in minutes.
    pub outlier_threshold_min: i64,

    /// Queue label standing in for "queue unknown"; excluded from analyst
    /// snapshots.
    pub unknown_queue_label: String,

    /// Substrings marking training/benchmark accounts, excluded from
    /// best-analyst comparisons.
    pub bench_exclude_markers: Vec<String>,
    /// Specific accounts excluded from best-analyst comparisons.
    pub bench_exclude_accounts: Vec<String>,

    /// Queues excluded from the judicial registration ranking.
    pub registration_deny_queues: Vec<String>,
    /// Pre-registration intake queues.
    pub pre_registration_queues: Vec<String>,
    /// Court order queues.
    pub court_order_queues: Vec<String>,
    /// Agency/office registration queues.
    pub agency_queues: Vec<String>,
    /// Registration audit queues.
    pub audit_queues: Vec<String>,
    /// Distribution queues (their rows finalize as Distributed).
    pub distribution_queues: Vec<String>,

    /// Named queue groups for the grouped production report; queues outside
    /// every group fall into [`DeskConfig::FALLBACK_GROUP`].
    pub production_groups: BTreeMap<String, Vec<String>>,
}

impl DeskConfig {
    pub const FALLBACK_GROUP: &'static str = "OTHERS";

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DeskConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn is_automation_account(&self, assignee: &str) -> bool {
        let lowered = assignee.to_lowercase();
        self.automation_accounts.iter().any(|a| *a == lowered)
    }

    pub fn is_bench_excluded(&self, assignee: &str) -> bool {
        self.bench_exclude_markers
            .iter()
            .any(|marker| assignee.contains(marker.as_str()))
            || self
                .bench_exclude_accounts
                .iter()
                .any(|account| account == assignee)
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            automation_accounts: vec!["robohub".into()],
            dropped_columns: vec![
                "NIP ID".into(),
                "M.O.".into(),
                "LB NO (CIVIL)".into(),
                "LB NO (LABOR)".into(),
            ],
            outlier_queue: "DÚVIDA".into(),
            outlier_threshold_min: 60,
            unknown_queue_label: "UNKNOWN".into(),
            bench_exclude_markers: vec!["_trainee".into()],
            bench_exclude_accounts: Vec::new(),
            registration_deny_queues: vec![
                "COURT ORDERS".into(),
                "PRE REGISTRATION".into(),
                "PRE REGISTRATION - CIVIL".into(),
                "AGENCY REGISTRATION".into(),
                "REGULATOR REGISTRATION (INFRACTION)".into(),
            ],
            pre_registration_queues: vec![
                "PRE REGISTRATION".into(),
                "PRE REGISTRATION - CIVIL".into(),
            ],
            court_order_queues: vec!["COURT ORDERS".into()],
            agency_queues: vec!["AGENCY REGISTRATION".into()],
            audit_queues: vec!["REGISTRATION AUDIT".into()],
            distribution_queues: vec![
                "DISTRIBUTION".into(),
                "DISTRIBUTION - CIVIL".into(),
                "DISTRIBUTION - PRE REGISTRATION".into(),
            ],
            production_groups: BTreeMap::from([
                (
                    "EARLY CAPTURE".into(),
                    vec![
                        "ROBOT REGISTRATION".into(),
                        "PROCEDURAL INCIDENT".into(),
                        "REGULATOR REGISTRATION".into(),
                    ],
                ),
                (
                    "ELECTRONIC SERVICE".into(),
                    vec![
                        "E-SERVICE REGISTRATION".into(),
                        "E-SERVICE UPDATE".into(),
                    ],
                ),
                (
                    "E-MAIL".into(),
                    vec![
                        "E-MAIL REGISTRATION".into(),
                        "COURT ORDERS".into(),
                        "AGENCY REGISTRATION".into(),
                    ],
                ),
                (
                    "PRE REGISTRATION".into(),
                    vec!["PRE REGISTRATION".into()],
                ),
            ]),
        }
    }
}
