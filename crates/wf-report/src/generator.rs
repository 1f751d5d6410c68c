//! Report generator implementation.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::format::{interval, level_label, number};
use crate::sections::narrative::wave_narrative;
use crate::sections::wave::term_label;
use crate::sections::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info};
use wf_common::{CoefficientEstimate, OutputFormat};

/// Complete report data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    /// Report configuration.
    pub config: ReportConfig,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Generator version.
    pub generator_version: String,
    /// Output schema version.
    pub schema_version: String,
    /// Overview section.
    pub overview: OverviewSection,
    /// Successfully fitted waves, in configuration order.
    pub waves: Vec<WaveSection>,
    /// Waves that failed.
    pub failures: Vec<FailureRow>,
}

impl ReportData {
    /// Create report data with the current timestamp.
    pub fn new(
        config: ReportConfig,
        overview: OverviewSection,
        waves: Vec<WaveSection>,
        failures: Vec<FailureRow>,
    ) -> Self {
        Self {
            config,
            generated_at: Utc::now(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: wf_common::SCHEMA_VERSION.to_string(),
            overview,
            waves,
            failures,
        }
    }

    /// Get the report title.
    pub fn title(&self) -> &str {
        &self.config.title
    }
}

/// Report generator.
pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    /// Create a new report generator with configuration.
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Render the report in the requested format.
    pub fn generate(&self, data: &ReportData, format: OutputFormat) -> Result<String> {
        self.config.validate()?;
        if data.waves.is_empty() && data.failures.is_empty() {
            return Err(ReportError::MissingData(
                "report has neither fitted nor failed waves".to_string(),
            ));
        }

        debug!(format = %format, waves = data.waves.len(), "Rendering report");

        let output = match format {
            OutputFormat::Md => self.render_markdown(data),
            OutputFormat::Json => serde_json::to_string_pretty(data)?,
            OutputFormat::Summary => self.render_summary(data),
        };

        info!(
            bytes = output.len(),
            title = %data.title(),
            format = %format,
            "Report generated"
        );

        Ok(output)
    }

    /// Render from a previously serialized JSON report.
    pub fn generate_from_json(&self, json: &str, format: OutputFormat) -> Result<String> {
        let data: ReportData = serde_json::from_str(json)?;
        self.generate(&data, format)
    }

    fn render_markdown(&self, data: &ReportData) -> String {
        let sections = &self.config.sections;
        let mut out = String::new();

        let _ = writeln!(out, "# {}\n", self.config.title);

        if sections.overview {
            out.push_str(&self.markdown_overview(&data.overview, data));
        }

        for wave in &data.waves {
            out.push_str(&self.markdown_wave(wave));
        }

        if sections.failures && !data.failures.is_empty() {
            out.push_str(&self.markdown_failures(&data.failures));
        }

        out
    }

    fn markdown_overview(&self, overview: &OverviewSection, data: &ReportData) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## Overview\n");
        let _ = writeln!(out, "| Field | Value |");
        let _ = writeln!(out, "|---|---|");
        let rows = [
            ("Run", overview.run_id.clone()),
            ("Status", overview.status().to_string()),
            ("Started", overview.started_at.to_rfc3339()),
            ("Duration", overview.duration_formatted()),
            ("Input", overview.data_path.clone()),
            ("Region", overview.region.clone()),
            (
                "Rows (read / in region)",
                format!("{} / {}", overview.rows_read, overview.rows_in_region),
            ),
            ("Engine", overview.engine.clone()),
            ("Likelihood", overview.likelihood.clone()),
            ("Credible level", level_label(overview.credible_level)),
            (
                "Configuration",
                format!("{} ({})", overview.config_source, overview.config_id),
            ),
            (
                "Waves (ok / failed)",
                format!("{} / {}", overview.waves_succeeded, overview.waves_failed),
            ),
            ("Generator", format!("wavefit {}", data.generator_version)),
        ];
        for (field, value) in rows {
            let _ = writeln!(out, "| {} | {} |", field, escape_cell(&value));
        }
        out.push('\n');
        out
    }

    fn markdown_wave(&self, wave: &WaveSection) -> String {
        let sections = &self.config.sections;
        let decimals = self.config.decimals;
        let level = level_label(wave.fit.credible_level);
        let mut out = String::new();

        let _ = writeln!(out, "## {}\n", wave.heading());
        let _ = writeln!(
            out,
            "{} incidents, {} stacked observations.\n",
            wave.records, wave.stacked_rows
        );

        if sections.coefficients {
            let _ = writeln!(out, "### Fixed effects\n");
            out.push_str(&coefficient_table(&wave.fit.fixed_effects, &level, decimals));
            let _ = writeln!(out, "\n### Group intercepts\n");
            out.push_str(&coefficient_table(&wave.fit.group_intercepts, &level, decimals));
            if !wave.fit.group_effects.is_empty() {
                let _ = writeln!(out, "\n### Group effects\n");
                out.push_str(&coefficient_table(&wave.fit.group_effects, &level, decimals));
            }
            out.push('\n');
        }

        if sections.hyperparameters {
            let _ = writeln!(out, "### Hyperparameters\n");
            let _ = writeln!(out, "| Parameter | Mean | SD | {} |", level);
            let _ = writeln!(out, "|---|---:|---:|---|");
            for h in &wave.fit.hyperparameters {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    escape_cell(&h.name),
                    number(h.summary.mean, decimals),
                    number(h.summary.sd, decimals),
                    interval(h.summary.lower, h.summary.upper, decimals)
                );
            }
            out.push('\n');
        }

        if sections.statistics {
            let stats = &wave.fit.statistics;
            let _ = writeln!(out, "### Fit statistics\n");
            let _ = writeln!(out, "| Statistic | Value |");
            let _ = writeln!(out, "|---|---:|");
            let rows = [
                ("DIC", stats.dic),
                ("pD", stats.dic_effective_parameters),
                ("Mean deviance", stats.mean_deviance),
                ("WAIC", stats.waic),
                ("p_WAIC", stats.waic_effective_parameters),
                ("lppd", stats.lppd),
                ("Effective parameters", stats.effective_parameters),
                ("Log marginal likelihood", stats.log_marginal_likelihood),
            ];
            for (name, value) in rows {
                let _ = writeln!(out, "| {} | {} |", name, number(value, decimals.min(3)));
            }
            for g in &stats.group_dic {
                let _ = writeln!(
                    out,
                    "| DIC ({}) | {} |",
                    g.group,
                    number(g.dic, decimals.min(3))
                );
            }
            out.push('\n');
        }

        if sections.narrative {
            let _ = writeln!(out, "### Interpretation\n");
            for paragraph in wave_narrative(wave, decimals) {
                let _ = writeln!(out, "{}\n", paragraph);
            }
        }

        out
    }

    fn markdown_failures(&self, failures: &[FailureRow]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## Failed waves\n");
        let _ = writeln!(out, "| Wave | Code | Category | Message |");
        let _ = writeln!(out, "|---|---:|---|---|");
        for f in failures {
            let _ = writeln!(
                out,
                "| {} | E{} | {} | {} |",
                escape_cell(&f.wave),
                f.code,
                f.category,
                escape_cell(&f.message)
            );
        }
        out.push('\n');
        out
    }

    fn render_summary(&self, data: &ReportData) -> String {
        let decimals = self.config.decimals.min(3);
        let mut out = String::new();
        for wave in &data.waves {
            let stats = &wave.fit.statistics;
            let _ = write!(
                out,
                "{}: n={} DIC={} WAIC={}",
                wave.key,
                wave.records,
                number(stats.dic, decimals),
                number(stats.waic, decimals)
            );
            for c in &wave.fit.fixed_effects {
                let marker = if c.summary.excludes_zero() { "*" } else { "" };
                let _ = write!(
                    out,
                    " {}={}{}",
                    c.term,
                    number(c.summary.mean, decimals),
                    marker
                );
            }
            out.push('\n');
        }
        for f in &data.failures {
            let _ = writeln!(out, "{}: FAILED [E{}] {}", f.wave, f.code, f.message);
        }
        out
    }
}

fn coefficient_table(coefs: &[CoefficientEstimate], level: &str, decimals: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| Term | Mean | SD | Median | {} |", level);
    let _ = writeln!(out, "|---|---:|---:|---:|---|");
    for c in coefs {
        let s = &c.summary;
        let marker = if s.excludes_zero() { " *" } else { "" };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {}{} |",
            escape_cell(term_label(&c.term)),
            number(s.mean, decimals),
            number(s.sd, decimals),
            number(s.median, decimals),
            interval(s.lower, s.upper, decimals),
            marker
        );
    }
    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
