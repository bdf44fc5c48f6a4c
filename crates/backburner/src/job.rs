//! Backburner job submission.
//!
//! Jobs are handed to the farm's submission binary as one process
//! invocation each. The full calling environment is serialized to a
//! uniquely-named context file on a shared temp location first, since the
//! job may execute on a different machine and has to reconstruct the
//! session from that file alone.

use std::path::{Path, PathBuf};
use std::process::Command;

use cutsync_common::{BackburnerConfig, CutsyncError, CutsyncResult};
use regex::Regex;

use crate::queue::{JobId, JobQueue, JobSpec};

/// Maximum job name length accepted by the queue UI.
const MAX_JOB_NAME_LEN: usize = 70;

/// Re-validation of the caller's tracking-database session before a job
/// is handed to the farm. A declined prompt is a soft skip, not an error.
pub trait AuthProvider {
    /// Refresh or validate the session. Returns `false` when the user
    /// cancelled authentication.
    fn ensure_session(&self) -> CutsyncResult<bool>;
}

/// Auth provider for non-interactive contexts where the session is
/// already known to be valid.
pub struct AlwaysAuthenticated;

impl AuthProvider for AlwaysAuthenticated {
    fn ensure_session(&self) -> CutsyncResult<bool> {
        Ok(true)
    }
}

/// Strip a job name or description to the queue's allowed character set
/// and length, then append a time-of-day suffix so repeated submissions
/// stay tellable apart in the queue UI.
pub fn sanitize_job_name(name: &str, now: chrono::NaiveTime) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || " _-.:/".contains(*c))
        .collect();
    let truncated: String = cleaned.chars().take(MAX_JOB_NAME_LEN).collect();
    format!("{} ({})", truncated.trim(), now.format("%H:%M:%S"))
}

/// Extract the numeric job id from the submission binary's stdout.
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    // The binary prints a success marker of the form
    // "Successfully submitted job <id>." among other output.
    let re = Regex::new(r"[Ss]uccessfully submitted.*?\bjob\b[^0-9]*(\d+)").ok()?;
    re.captures(stdout)
        .map(|caps| JobId::new(caps[1].to_string()))
}

/// Job queue backed by the Backburner submission binary.
pub struct BackburnerQueue {
    config: BackburnerConfig,
    shared_tmp: PathBuf,
    auth: Box<dyn AuthProvider>,
    /// Manager host requested explicitly for this dispatcher, overriding
    /// configuration.
    explicit_manager: Option<String>,
}

impl BackburnerQueue {
    pub fn new(
        config: BackburnerConfig,
        shared_tmp: impl Into<PathBuf>,
        auth: Box<dyn AuthProvider>,
    ) -> Self {
        Self {
            config,
            shared_tmp: shared_tmp.into(),
            auth,
            explicit_manager: None,
        }
    }

    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.explicit_manager = Some(manager.into());
        self
    }

    /// Resolve the manager host: explicit parameter, then configuration,
    /// then (when the protocol supports it) the binary's own local
    /// default.
    fn select_manager(&self) -> Option<String> {
        if let Some(manager) = &self.explicit_manager {
            return Some(manager.clone());
        }
        if let Some(manager) = &self.config.manager {
            return Some(manager.clone());
        }
        if self.config.supports_manager_query() {
            return self.query_default_manager();
        }
        None
    }

    fn query_default_manager(&self) -> Option<String> {
        let output = Command::new(&self.config.binary)
            .arg("-query")
            .arg("manager")
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let host = stdout.lines().next()?.trim();
        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }

    /// Write the serialized call context to a uniquely-named file the
    /// render node can read. Names are randomized so concurrent
    /// submissions sharing the temp directory never collide.
    fn write_context_file(&self, spec: &JobSpec) -> CutsyncResult<PathBuf> {
        std::fs::create_dir_all(&self.shared_tmp)?;
        let path = self
            .shared_tmp
            .join(format!("cutsync_job_{}.json", random_token()));
        let content = serde_json::to_string_pretty(&spec.payload)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    fn build_command(&self, spec: &JobSpec, context_file: &Path) -> Command {
        let now = chrono::Local::now().time();
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-jobName")
            .arg(sanitize_job_name(&spec.name, now))
            .arg("-description")
            .arg(sanitize_job_name(&spec.description, now));

        if let Some(manager) = self.select_manager() {
            cmd.arg("-manager").arg(manager);
        }
        if let Some(group) = &self.config.server_group {
            cmd.arg("-group").arg(group);
        }
        if !spec.run_after.is_empty() {
            let deps: Vec<&str> = spec.run_after.iter().map(|j| j.0.as_str()).collect();
            cmd.arg("-dependencies").arg(deps.join(","));
        }

        cmd.arg("-contextFile").arg(context_file);
        cmd.arg("-method").arg(&spec.payload.method);
        cmd
    }
}

impl JobQueue for BackburnerQueue {
    fn submit(&self, spec: JobSpec) -> CutsyncResult<Option<JobId>> {
        if !self.auth.ensure_session()? {
            tracing::info!(job = %spec.name, "authentication cancelled, skipping job submission");
            return Ok(None);
        }

        let context_file = self.write_context_file(&spec)?;
        let mut cmd = self.build_command(&spec, &context_file);

        tracing::debug!(job = %spec.name, deps = spec.run_after.len(), "submitting job");
        let output = cmd.output().map_err(|e| {
            CutsyncError::submission(format!(
                "failed to run {}: {e}",
                self.config.binary.display()
            ))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_job_id(&stdout) {
            Some(id) => {
                tracing::info!(job = %spec.name, id = %id, "job submitted");
                Ok(Some(id))
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(CutsyncError::submission(format!(
                    "no job id in queue output for '{}'. stderr: {}",
                    spec.name,
                    stderr.trim()
                )))
            }
        }
    }
}

/// Random hex token in lieu of a uuid dependency. A process-wide counter
/// keeps back-to-back calls distinct even within one clock tick.
fn random_token() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id() as u64;
    format!(
        "{:016x}",
        seed.wrapping_mul(0x2545_f491_4f6c_dd1d) ^ (pid << 48) ^ n
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_thirty() -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(10, 30, 5).unwrap()
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        let name = sanitize_job_name("Render \"shot\" <010> & co", ten_thirty());
        assert_eq!(name, "Render shot 010  co (10:30:05)");
    }

    #[test]
    fn test_sanitize_truncates_to_limit() {
        let long = "x".repeat(500);
        let name = sanitize_job_name(&long, ten_thirty());
        // 70 chars of payload plus the time suffix.
        assert_eq!(name, format!("{} (10:30:05)", "x".repeat(70)));
    }

    #[test]
    fn test_parse_job_id_from_success_marker() {
        let stdout = "Connecting to manager...\nSuccessfully submitted job 194523.\n";
        assert_eq!(parse_job_id(stdout), Some(JobId::new("194523")));
    }

    #[test]
    fn test_parse_job_id_missing_is_none() {
        assert_eq!(parse_job_id("Error: manager unreachable"), None);
        assert_eq!(parse_job_id(""), None);
    }

    #[test]
    fn test_cancelled_auth_skips_submission() {
        use crate::queue::JobPayload;

        struct Declined;
        impl AuthProvider for Declined {
            fn ensure_session(&self) -> CutsyncResult<bool> {
                Ok(false)
            }
        }

        // Binary and shared tmp are both unusable on purpose: a declined
        // auth must return before either is touched.
        let config = BackburnerConfig {
            binary: PathBuf::from("/nonexistent/backburner_submit"),
            manager: None,
            server_group: None,
            protocol_version: 1,
        };
        let queue = BackburnerQueue::new(config, "/nonexistent/tmp", Box::new(Declined));
        let spec = JobSpec::new(
            "render 010",
            "preview transcode",
            JobPayload {
                method: "generate_preview".to_string(),
                args: serde_json::json!({}),
                context: serde_json::json!({}),
                environment: Default::default(),
            },
        );
        assert_eq!(queue.submit(spec).unwrap(), None);
    }

    #[test]
    fn test_random_tokens_differ() {
        let a = random_token();
        let b = random_token();
        assert_ne!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn prop_sanitized_name_is_bounded(name in ".*") {
            let out = sanitize_job_name(&name, ten_thirty());
            // payload cap + " (HH:MM:SS)"
            proptest::prop_assert!(out.chars().count() <= MAX_JOB_NAME_LEN + 11);
        }
    }
}
