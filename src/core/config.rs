//! Layered configuration for gavel.
//!
//! Loading order: built-in defaults → `<repo>/.gavel/config.toml` →
//! `GAVEL_<SECTION>_<FIELD>` environment variables. Environment wins. The
//! loaded value is constructed once per invocation and treated as immutable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{GavelError, Result};
use crate::core::models::Severity;

/// Timeout settings for subprocess calls (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per-file budget for a mutation run
    pub mutation_per_file: u64,
    /// Budget for each static-analysis tool
    pub static_analysis: u64,
    /// Per-run budget for the baseline probe
    pub baseline_per_run: u64,
    /// Budget for the diff extraction
    pub diff: u64,
    /// Budget for the `mutmut results` fallback command
    pub mutmut_results: u64,
    /// Budget for each security scanner
    pub security: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            mutation_per_file: 120,
            static_analysis: 60,
            baseline_per_run: 120,
            diff: 30,
            mutmut_results: 30,
            security: 60,
        }
    }
}

/// Scoring weights, grade thresholds, and deduction constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Mutation dimension weight
    pub mutation_weight: f64,
    /// Static dimension weight
    pub static_weight: f64,
    /// Baseline dimension weight
    pub baseline_weight: f64,
    /// Sentinel-risk dimension weight
    pub sentinel_risk_weight: f64,
    /// Co-change dimension weight
    pub co_change_weight: f64,
    /// Share taken by the security dimension when security is enabled;
    /// the five base weights are rescaled by `1 - security_weight`
    pub security_weight: f64,

    /// Grade A threshold
    pub grade_a: f64,
    /// Grade B threshold
    pub grade_b: f64,
    /// Grade C threshold
    pub grade_c: f64,
    /// Grade D threshold; below is F
    pub grade_d: f64,

    /// Points deducted per flaky test
    pub baseline_deduction_per_flaky: f64,
    /// Points deducted per pitfall match
    pub risk_deduction_per_pitfall: f64,
    /// Points deducted per missing co-change partner
    pub risk_deduction_per_missing_co_change: f64,
    /// Divisor applied to a hot file's churn score
    pub risk_hot_file_churn_divisor: f64,
    /// Cap on the deduction any single hot file can contribute
    pub risk_hot_file_max_deduction: f64,
    /// Scale applied to weighted static issues per file
    pub static_issue_scale_factor: f64,
    /// Scale applied to weighted security issues per file
    pub security_issue_scale_factor: f64,

    /// Severity weight: critical
    pub severity_critical: f64,
    /// Severity weight: high
    pub severity_high: f64,
    /// Severity weight: medium
    pub severity_medium: f64,
    /// Severity weight: low
    pub severity_low: f64,
    /// Severity weight: info
    pub severity_info: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mutation_weight: 0.30,
            static_weight: 0.20,
            baseline_weight: 0.15,
            sentinel_risk_weight: 0.20,
            co_change_weight: 0.15,
            security_weight: 0.15,
            grade_a: 90.0,
            grade_b: 75.0,
            grade_c: 60.0,
            grade_d: 40.0,
            baseline_deduction_per_flaky: 10.0,
            risk_deduction_per_pitfall: 5.0,
            risk_deduction_per_missing_co_change: 3.0,
            risk_hot_file_churn_divisor: 5.0,
            risk_hot_file_max_deduction: 10.0,
            static_issue_scale_factor: 10.0,
            security_issue_scale_factor: 10.0,
            severity_critical: 10.0,
            severity_high: 5.0,
            severity_medium: 2.0,
            severity_low: 1.0,
            severity_info: 0.0,
        }
    }
}

impl ScoringConfig {
    /// Grade thresholds as an `(a, b, c, d)` tuple.
    pub fn grade_thresholds(&self) -> (f64, f64, f64, f64) {
        (self.grade_a, self.grade_b, self.grade_c, self.grade_d)
    }

    /// Weight of one finding severity.
    pub fn severity_weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.severity_critical,
            Severity::High => self.severity_high,
            Severity::Medium => self.severity_medium,
            Severity::Low => self.severity_low,
            Severity::Info => self.severity_info,
        }
    }
}

/// Pipeline behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Baseline probe repetitions
    pub baseline_runs: u32,
    /// Character budget for server surface responses
    pub max_output_chars: usize,
    /// Directory under the repo holding gavel state
    pub db_dir: String,
    /// Database file name
    pub db_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            baseline_runs: 3,
            max_output_chars: 16_000,
            db_dir: ".gavel".to_string(),
            db_name: "gavel.db".to_string(),
        }
    }
}

/// Data retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Rows older than this many days are eligible for pruning
    pub retention_days: u32,
    /// Reserved for scheduled pruning
    pub auto_prune: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            auto_prune: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Security scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whether the security dimension participates in scoring
    pub enabled: bool,
    /// Run bandit
    pub bandit_enabled: bool,
    /// Run semgrep
    pub semgrep_enabled: bool,
    /// Run detect-secrets
    pub detect_secrets_enabled: bool,
    /// Semgrep ruleset argument
    pub semgrep_rules: String,
    /// Glob patterns excluded from the detect-secrets invocation
    pub detect_secrets_exclude: Vec<String>,
    /// Bandit test ids dropped unconditionally by the post-filter
    pub bandit_skip: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bandit_enabled: true,
            semgrep_enabled: true,
            detect_secrets_enabled: true,
            semgrep_rules: "auto".to_string(),
            detect_secrets_exclude: vec!["tests/".to_string(), "**/migrations/".to_string()],
            bandit_skip: Vec::new(),
        }
    }
}

/// Effective weights for the six dimensions, already rescaled for the
/// security configuration. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionWeights {
    /// Mutation dimension weight
    pub mutation: f64,
    /// Static dimension weight
    pub static_analysis: f64,
    /// Baseline dimension weight
    pub baseline: f64,
    /// Sentinel-risk dimension weight
    pub sentinel_risk: f64,
    /// Co-change dimension weight
    pub co_change: f64,
    /// Security dimension weight; zero when security is disabled
    pub security: f64,
}

impl DimensionWeights {
    /// Sum of all six weights.
    pub fn sum(&self) -> f64 {
        self.mutation
            + self.static_analysis
            + self.baseline
            + self.sentinel_risk
            + self.co_change
            + self.security
    }
}

/// Top-level gavel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GavelConfig {
    /// Subprocess timeouts
    pub timeouts: TimeoutsConfig,
    /// Scoring weights and constants
    pub scoring: ScoringConfig,
    /// Pipeline behavior
    pub pipeline: PipelineConfig,
    /// Data retention
    pub retention: RetentionConfig,
    /// Logging
    pub logging: LoggingConfig,
    /// Security scanning
    pub security: SecurityConfig,
}

impl GavelConfig {
    /// Load configuration for a repository: defaults, then
    /// `.gavel/config.toml`, then `GAVEL_*` environment overrides.
    pub fn load(repo_path: impl AsRef<Path>) -> Result<Self> {
        let config_file = repo_path.as_ref().join(".gavel").join("config.toml");

        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file).map_err(|e| {
                GavelError::io(
                    format!("Failed to read config file: {}", config_file.display()),
                    e,
                )
            })?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Path of the assessment database for a repository.
    pub fn db_path(&self, repo_path: impl AsRef<Path>) -> PathBuf {
        repo_path
            .as_ref()
            .join(&self.pipeline.db_dir)
            .join(&self.pipeline.db_name)
    }

    /// Effective dimension weights under the current security setting.
    ///
    /// With security disabled the five base weights are used as-is; with
    /// security enabled they are rescaled by `1 - security_weight` so the
    /// total stays 1.0.
    pub fn dimension_weights(&self) -> DimensionWeights {
        let s = &self.scoring;
        if self.security.enabled {
            let scale = 1.0 - s.security_weight;
            DimensionWeights {
                mutation: s.mutation_weight * scale,
                static_analysis: s.static_weight * scale,
                baseline: s.baseline_weight * scale,
                sentinel_risk: s.sentinel_risk_weight * scale,
                co_change: s.co_change_weight * scale,
                security: s.security_weight,
            }
        } else {
            DimensionWeights {
                mutation: s.mutation_weight,
                static_analysis: s.static_weight,
                baseline: s.baseline_weight,
                sentinel_risk: s.sentinel_risk_weight,
                co_change: s.co_change_weight,
                security: 0.0,
            }
        }
    }

    /// Reject configurations whose weights cannot form a valid fusion.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        let base_sum = s.mutation_weight
            + s.static_weight
            + s.baseline_weight
            + s.sentinel_risk_weight
            + s.co_change_weight;
        if (base_sum - 1.0).abs() > 1e-9 {
            return Err(GavelError::config_field(
                format!("dimension weights must sum to 1.0, got {base_sum}"),
                "scoring",
            ));
        }
        if !(0.0..1.0).contains(&s.security_weight) {
            return Err(GavelError::config_field(
                format!(
                    "security_weight must be in [0, 1), got {}",
                    s.security_weight
                ),
                "scoring.security_weight",
            ));
        }
        let t = s.grade_thresholds();
        if !(t.0 > t.1 && t.1 > t.2 && t.2 > t.3) {
            return Err(GavelError::config_field(
                "grade thresholds must be strictly decreasing",
                "scoring",
            ));
        }
        Ok(())
    }

    /// Apply `GAVEL_<SECTION>_<FIELD>` environment overrides to every
    /// scalar field. Coercion: bool accepts `true|1|yes`; numbers by
    /// literal parse (unparsable values are ignored).
    fn apply_env_overrides(&mut self) {
        override_u64("timeouts", "mutation_per_file", &mut self.timeouts.mutation_per_file);
        override_u64("timeouts", "static_analysis", &mut self.timeouts.static_analysis);
        override_u64("timeouts", "baseline_per_run", &mut self.timeouts.baseline_per_run);
        override_u64("timeouts", "diff", &mut self.timeouts.diff);
        override_u64("timeouts", "mutmut_results", &mut self.timeouts.mutmut_results);
        override_u64("timeouts", "security", &mut self.timeouts.security);

        override_f64("scoring", "mutation_weight", &mut self.scoring.mutation_weight);
        override_f64("scoring", "static_weight", &mut self.scoring.static_weight);
        override_f64("scoring", "baseline_weight", &mut self.scoring.baseline_weight);
        override_f64(
            "scoring",
            "sentinel_risk_weight",
            &mut self.scoring.sentinel_risk_weight,
        );
        override_f64("scoring", "co_change_weight", &mut self.scoring.co_change_weight);
        override_f64("scoring", "security_weight", &mut self.scoring.security_weight);
        override_f64("scoring", "grade_a", &mut self.scoring.grade_a);
        override_f64("scoring", "grade_b", &mut self.scoring.grade_b);
        override_f64("scoring", "grade_c", &mut self.scoring.grade_c);
        override_f64("scoring", "grade_d", &mut self.scoring.grade_d);
        override_f64(
            "scoring",
            "baseline_deduction_per_flaky",
            &mut self.scoring.baseline_deduction_per_flaky,
        );
        override_f64(
            "scoring",
            "risk_deduction_per_pitfall",
            &mut self.scoring.risk_deduction_per_pitfall,
        );
        override_f64(
            "scoring",
            "risk_deduction_per_missing_co_change",
            &mut self.scoring.risk_deduction_per_missing_co_change,
        );
        override_f64(
            "scoring",
            "risk_hot_file_churn_divisor",
            &mut self.scoring.risk_hot_file_churn_divisor,
        );
        override_f64(
            "scoring",
            "risk_hot_file_max_deduction",
            &mut self.scoring.risk_hot_file_max_deduction,
        );
        override_f64(
            "scoring",
            "static_issue_scale_factor",
            &mut self.scoring.static_issue_scale_factor,
        );
        override_f64(
            "scoring",
            "security_issue_scale_factor",
            &mut self.scoring.security_issue_scale_factor,
        );
        override_f64("scoring", "severity_critical", &mut self.scoring.severity_critical);
        override_f64("scoring", "severity_high", &mut self.scoring.severity_high);
        override_f64("scoring", "severity_medium", &mut self.scoring.severity_medium);
        override_f64("scoring", "severity_low", &mut self.scoring.severity_low);
        override_f64("scoring", "severity_info", &mut self.scoring.severity_info);

        override_u32("pipeline", "baseline_runs", &mut self.pipeline.baseline_runs);
        override_usize("pipeline", "max_output_chars", &mut self.pipeline.max_output_chars);
        override_string("pipeline", "db_dir", &mut self.pipeline.db_dir);
        override_string("pipeline", "db_name", &mut self.pipeline.db_name);

        override_u32("retention", "retention_days", &mut self.retention.retention_days);
        override_bool("retention", "auto_prune", &mut self.retention.auto_prune);

        override_string("logging", "level", &mut self.logging.level);

        override_bool("security", "enabled", &mut self.security.enabled);
        override_bool("security", "bandit_enabled", &mut self.security.bandit_enabled);
        override_bool("security", "semgrep_enabled", &mut self.security.semgrep_enabled);
        override_bool(
            "security",
            "detect_secrets_enabled",
            &mut self.security.detect_secrets_enabled,
        );
        override_string("security", "semgrep_rules", &mut self.security.semgrep_rules);
    }
}

// ── Environment override helpers ────────────────────────────────

fn env_value(section: &str, field: &str) -> Option<String> {
    std::env::var(format!(
        "GAVEL_{}_{}",
        section.to_uppercase(),
        field.to_uppercase()
    ))
    .ok()
}

fn override_u64(section: &str, field: &str, target: &mut u64) {
    if let Some(raw) = env_value(section, field) {
        if let Ok(parsed) = raw.trim().parse() {
            *target = parsed;
        }
    }
}

fn override_u32(section: &str, field: &str, target: &mut u32) {
    if let Some(raw) = env_value(section, field) {
        if let Ok(parsed) = raw.trim().parse() {
            *target = parsed;
        }
    }
}

fn override_usize(section: &str, field: &str, target: &mut usize) {
    if let Some(raw) = env_value(section, field) {
        if let Ok(parsed) = raw.trim().parse() {
            *target = parsed;
        }
    }
}

fn override_f64(section: &str, field: &str, target: &mut f64) {
    if let Some(raw) = env_value(section, field) {
        if let Ok(parsed) = raw.trim().parse() {
            *target = parsed;
        }
    }
}

fn override_bool(section: &str, field: &str, target: &mut bool) {
    if let Some(raw) = env_value(section, field) {
        *target = matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes");
    }
}

fn override_string(section: &str, field: &str, target: &mut String) {
    if let Some(raw) = env_value(section, field) {
        *target = raw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_valid() {
        let config = GavelConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_weights_sum_to_one() {
        let config = GavelConfig::default();
        assert!((config.dimension_weights().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn enabled_security_rescales_and_still_sums_to_one() {
        let mut config = GavelConfig::default();
        config.security.enabled = true;
        let weights = config.dimension_weights();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!((weights.security - 0.15).abs() < 1e-9);
        assert!((weights.mutation - 0.30 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn invalid_weight_sum_rejected() {
        let mut config = GavelConfig::default();
        config.scoring.mutation_weight = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_monotone_thresholds_rejected() {
        let mut config = GavelConfig::default();
        config.scoring.grade_b = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn toml_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let gavel_dir = dir.path().join(".gavel");
        std::fs::create_dir_all(&gavel_dir).unwrap();
        std::fs::write(
            gavel_dir.join("config.toml"),
            "[pipeline]\nbaseline_runs = 5\n\n[retention]\nretention_days = 30\n",
        )
        .unwrap();

        let config = GavelConfig::load(dir.path()).unwrap();
        assert_eq!(config.pipeline.baseline_runs, 5);
        assert_eq!(config.retention.retention_days, 30);
        // Untouched sections keep their defaults.
        assert_eq!(config.timeouts.mutation_per_file, 120);
    }

    #[test]
    #[serial]
    fn env_layer_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let gavel_dir = dir.path().join(".gavel");
        std::fs::create_dir_all(&gavel_dir).unwrap();
        std::fs::write(gavel_dir.join("config.toml"), "[pipeline]\nbaseline_runs = 5\n").unwrap();

        std::env::set_var("GAVEL_PIPELINE_BASELINE_RUNS", "7");
        std::env::set_var("GAVEL_RETENTION_AUTO_PRUNE", "yes");
        let config = GavelConfig::load(dir.path()).unwrap();
        std::env::remove_var("GAVEL_PIPELINE_BASELINE_RUNS");
        std::env::remove_var("GAVEL_RETENTION_AUTO_PRUNE");

        assert_eq!(config.pipeline.baseline_runs, 7);
        assert!(config.retention.auto_prune);
    }

    #[test]
    #[serial]
    fn bool_coercion_accepts_truthy_forms() {
        let mut flag = false;
        std::env::set_var("GAVEL_SECURITY_ENABLED", "1");
        override_bool("security", "enabled", &mut flag);
        std::env::remove_var("GAVEL_SECURITY_ENABLED");
        assert!(flag);

        std::env::set_var("GAVEL_SECURITY_ENABLED", "no");
        override_bool("security", "enabled", &mut flag);
        std::env::remove_var("GAVEL_SECURITY_ENABLED");
        assert!(!flag);
    }

    #[test]
    fn db_path_uses_pipeline_settings() {
        let config = GavelConfig::default();
        let path = config.db_path("/repo");
        assert_eq!(path, PathBuf::from("/repo/.gavel/gavel.db"));
    }
}
