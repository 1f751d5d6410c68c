//! The per-wave analysis pipeline.
//!
//! The input table is loaded once. Each configured wave then runs
//! subset → transform → stack → fit independently; a wave-scoped failure is
//! recorded and the next wave still runs unless `fail_fast` is set.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use wf_common::{BatchResult, FitSummary, Result, StructuredError};
use wf_config::{AnalysisConfig, WaveSpec};

use crate::data::{load_incidents, IncidentTable, WaveSubset};
use crate::inference::{Design, ModelFitter, ModelSpec};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::stack::{stack, StackedTable};
use crate::transform::transform_subset;

/// Run-level switches that do not belong in the analysis config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Abort on the first wave failure.
    pub fail_fast: bool,
    /// Directory receiving one stacked CSV per wave.
    pub emit_stacked: Option<PathBuf>,
}

/// A successfully analysed wave.
#[derive(Debug, Clone, Serialize)]
pub struct WaveAnalysis {
    pub wave: WaveSpec,
    /// Region records flagged for the wave.
    pub records: usize,
    #[serde(skip)]
    pub stacked: StackedTable,
    pub fit: FitSummary,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub source: String,
    pub rows_read: usize,
    pub rows_in_region: usize,
    pub results: BatchResult<WaveAnalysis>,
}

impl AnalysisOutcome {
    /// Some waves failed while at least one succeeded.
    pub fn is_partial(&self) -> bool {
        !self.results.failed.is_empty() && !self.results.succeeded.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.results.succeeded.is_empty() && !self.results.failed.is_empty()
    }
}

/// Per-wave result of `check`.
#[derive(Debug, Clone, Serialize)]
pub struct WaveCheck {
    pub key: String,
    pub label: String,
    pub records: usize,
    pub stacked_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuredError>,
}

/// Input validation without fitting.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: String,
    pub rows_read: usize,
    pub rows_in_region: usize,
    pub waves: Vec<WaveCheck>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.waves.iter().all(|w| w.error.is_none())
    }
}

/// One configured analysis bound to a fitting engine.
pub struct Analysis<'a> {
    config: &'a AnalysisConfig,
    fitter: &'a dyn ModelFitter,
    options: RunOptions,
    ctx: LogContext,
}

impl<'a> Analysis<'a> {
    pub fn new(config: &'a AnalysisConfig, fitter: &'a dyn ModelFitter, ctx: LogContext) -> Self {
        Self {
            config,
            fitter,
            options: RunOptions::default(),
            ctx,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the configured input file and analyse every wave.
    pub fn run(&self) -> Result<AnalysisOutcome> {
        let table = self.load()?;
        self.run_table(&table)
    }

    /// Analyse every wave of an already loaded table.
    pub fn run_table(&self, table: &IncidentTable) -> Result<AnalysisOutcome> {
        let started = Instant::now();
        let mut results = BatchResult::default();

        for subset in table.wave_subsets(&self.config.waves) {
            let key = subset.wave.key.clone();
            match self.analyse_wave(&subset) {
                Ok(analysis) => results.add_success(analysis),
                Err(err) if err.is_wave_scoped() && !self.options.fail_fast => {
                    let ctx = self.ctx.for_wave(&key);
                    log_event!(
                        ctx,
                        WARN,
                        event_names::WAVE_FAILED,
                        Stage::Fit,
                        format!("Wave analysis failed: {err}"),
                        code = err.code()
                    );
                    results.add_failure(key, &err);
                }
                Err(err) => return Err(err),
            }
        }

        log_event!(
            self.ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Report,
            "All waves processed",
            succeeded = results.succeeded.len(),
            failed = results.failed.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(AnalysisOutcome {
            source: table.source.clone(),
            rows_read: table.rows_read,
            rows_in_region: table.len(),
            results,
        })
    }

    /// Subset, transform, stack and fit one wave.
    pub fn analyse_wave(&self, subset: &WaveSubset) -> Result<WaveAnalysis> {
        let ctx = self.ctx.for_wave(&subset.wave.key);
        log_event!(
            ctx,
            INFO,
            event_names::WAVE_SUBSET,
            Stage::Transform,
            "Wave subset selected",
            records = subset.len()
        );
        subset.ensure_non_empty(&self.config.data.region)?;

        let transformed = transform_subset(subset, &self.config.data.columns)?;
        log_event!(
            ctx,
            DEBUG,
            event_names::TRANSFORM_FINISHED,
            Stage::Transform,
            "Responses log-transformed",
            records = transformed.len()
        );

        let stacked = stack(&transformed);
        log_event!(
            ctx,
            DEBUG,
            event_names::STACK_FINISHED,
            Stage::Stack,
            "Stacked table built",
            rows = stacked.len()
        );
        if let Some(dir) = &self.options.emit_stacked {
            let path = export_stacked(dir, &subset.wave.key, &stacked)?;
            log_event!(
                ctx,
                INFO,
                event_names::STACK_EXPORTED,
                Stage::Stack,
                "Stacked table written",
                path = tracing::field::display(path.display())
            );
        }

        log_event!(
            ctx,
            INFO,
            event_names::FIT_STARTED,
            Stage::Fit,
            "Fitting joint model",
            engine = self.fitter.name(),
            observations = stacked.len()
        );
        let started = Instant::now();
        let fit = self
            .fitter
            .fit(&stacked, &ModelSpec::from_config(self.config))?;
        log_event!(
            ctx,
            DEBUG,
            event_names::FIT_MODE_FOUND,
            Stage::Fit,
            "Precision mode located",
            mode = tracing::field::debug(&fit.integration.log_precision_mode),
            newton_iterations = fit.integration.newton_iterations
        );
        log_event!(
            ctx,
            INFO,
            event_names::FIT_FINISHED,
            Stage::Fit,
            "Model fitted",
            dic = fit.statistics.dic,
            waic = fit.statistics.waic,
            grid_points = fit.integration.grid_points,
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(WaveAnalysis {
            wave: subset.wave.clone(),
            records: subset.len(),
            stacked,
            fit,
        })
    }

    /// Validate the input file against the configuration without fitting.
    pub fn check(&self) -> Result<CheckReport> {
        let table = self.load()?;
        let spec = ModelSpec::from_config(self.config);

        let waves = table
            .wave_subsets(&self.config.waves)
            .into_iter()
            .map(|subset| {
                let outcome = subset
                    .ensure_non_empty(&self.config.data.region)
                    .and_then(|_| transform_subset(&subset, &self.config.data.columns))
                    .map(|records| stack(&records))
                    .and_then(|stacked| Design::build(&stacked, &spec).map(|_| stacked.len()));
                let (stacked_rows, error) = match outcome {
                    Ok(rows) => (rows, None),
                    Err(err) => (0, Some(StructuredError::from(&err))),
                };
                WaveCheck {
                    key: subset.wave.key.clone(),
                    label: subset.wave.label.clone(),
                    records: subset.len(),
                    stacked_rows,
                    error,
                }
            })
            .collect();

        Ok(CheckReport {
            source: table.source.clone(),
            rows_read: table.rows_read,
            rows_in_region: table.len(),
            waves,
        })
    }

    fn load(&self) -> Result<IncidentTable> {
        log_event!(
            self.ctx,
            INFO,
            event_names::LOAD_STARTED,
            Stage::Load,
            "Reading input table",
            path = tracing::field::display(&self.config.data.path)
        );
        let table = load_incidents(&self.config.data, &self.config.waves)?;
        log_event!(
            self.ctx,
            INFO,
            event_names::LOAD_FINISHED,
            Stage::Load,
            "Input table loaded",
            rows_read = table.rows_read,
            rows_in_region = table.len()
        );
        Ok(table)
    }
}

/// Write `stacked_<wave>.csv` under `dir`, creating it if needed.
pub fn export_stacked(dir: &Path, wave: &str, stacked: &StackedTable) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("stacked_{wave}.csv"));
    let file = fs::File::create(&path)?;
    stacked.write_csv(std::io::BufWriter::new(file))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_incidents_from_reader;
    use crate::inference::GridFitter;
    use wf_common::{Error, ResponseGroup};

    /// Deterministic table: a 7 × 5 coordinate grid twice over, every row in
    /// both waves, plus rows from another region.
    fn table_text(negative_in_fourth: bool) -> String {
        let mut text = String::from(
            "Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km\n",
        );
        for i in 0..70usize {
            let x = (i % 7) as f64 - 3.0;
            let y = ((i / 7) % 5) as f64 - 2.0;
            let e = if (i / 35) % 2 == 0 { 0.1 } else { -0.1 };
            let tt = (2.0 + 0.3 * x - 0.1 * y + e).exp() - 1.0;
            let bd = (3.0 - 0.2 * x + 0.2 * y - e).exp() - 1.0;
            let fourth = if i % 2 == 0 { 1 } else { 0 };
            text.push_str(&format!("Western Europe,1,{fourth},{x},{y},{tt},{bd}\n"));
        }
        if negative_in_fourth {
            text.push_str("Western Europe,0,1,0.5,0.5,-3,10\n");
        }
        text.push_str("South America,1,1,0,0,1,1\n");
        text
    }

    fn load(config: &AnalysisConfig, text: &str) -> IncidentTable {
        load_incidents_from_reader(text.as_bytes(), "mem.csv", &config.data, &config.waves)
            .unwrap()
    }

    #[test]
    fn both_waves_fit() {
        let config = AnalysisConfig::default();
        let table = load(&config, &table_text(false));
        let fitter = GridFitter::new();
        let analysis = Analysis::new(&config, &fitter, LogContext::new("run-test"));
        let outcome = analysis.run_table(&table).unwrap();

        assert_eq!(outcome.rows_read, 71);
        assert_eq!(outcome.rows_in_region, 70);
        assert_eq!(outcome.results.succeeded.len(), 2);
        assert!(!outcome.is_partial());
        let third = &outcome.results.succeeded[0];
        assert_eq!(third.wave.key, "third");
        assert_eq!(third.records, 70);
        assert_eq!(third.stacked.len(), 140);
        assert_eq!(third.stacked.group_count(ResponseGroup::BorderDistance), 70);
        assert_eq!(outcome.results.succeeded[1].records, 35);
    }

    #[test]
    fn negative_value_fails_only_its_wave() {
        let config = AnalysisConfig::default();
        let table = load(&config, &table_text(true));
        let fitter = GridFitter::new();
        let outcome = Analysis::new(&config, &fitter, LogContext::new("run-test"))
            .run_table(&table)
            .unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.results.succeeded[0].wave.key, "third");
        assert_eq!(outcome.results.failed[0].item_id, "fourth");
        assert_eq!(outcome.results.failed[0].error.code, 23);
    }

    #[test]
    fn fail_fast_aborts_on_first_failure() {
        let config = AnalysisConfig::default();
        let table = load(&config, &table_text(true));
        let fitter = GridFitter::new();
        let err = Analysis::new(&config, &fitter, LogContext::new("run-test"))
            .with_options(RunOptions {
                fail_fast: true,
                emit_stacked: None,
            })
            .run_table(&table)
            .unwrap_err();
        assert!(matches!(err, Error::NegativeValue { .. }));
    }

    #[test]
    fn empty_wave_is_recorded() {
        let config = AnalysisConfig::default();
        let text = table_text(false).replace("Western Europe,1,1,", "Western Europe,1,0,");
        let table = load(&config, &text);
        let fitter = GridFitter::new();
        let outcome = Analysis::new(&config, &fitter, LogContext::new("run-test"))
            .run_table(&table)
            .unwrap();
        assert_eq!(outcome.results.failed.len(), 1);
        assert_eq!(outcome.results.failed[0].error.code, 24);
    }

    #[test]
    fn stacked_tables_are_exported() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::default();
        let table = load(&config, &table_text(false));
        let fitter = GridFitter::new();
        Analysis::new(&config, &fitter, LogContext::new("run-test"))
            .with_options(RunOptions {
                fail_fast: false,
                emit_stacked: Some(dir.path().join("stacked")),
            })
            .run_table(&table)
            .unwrap();
        let csv = fs::read_to_string(dir.path().join("stacked").join("stacked_fourth.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 70);
        assert!(csv.starts_with("group,response,x_tt,y_tt,x_bd,y_bd"));
    }
}
