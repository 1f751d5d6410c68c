//! CLI behaviour and exit codes for the wavefit binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km\n";

/// A temporary directory holding `analysis.json` and `incidents.csv`.
struct Fixture {
    dir: TempDir,
    config: PathBuf,
    data: PathBuf,
}

impl Fixture {
    fn new(table: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let data = dir.path().join("incidents.csv");
        fs::write(&data, table).expect("write table");
        let config = dir.path().join("analysis.json");
        let json = serde_json::json!({ "data": { "path": data.display().to_string() } });
        fs::write(&config, json.to_string()).expect("write config");
        Fixture { dir, config, data }
    }

    fn wavefit(&self) -> Command {
        let mut cmd = Command::cargo_bin("wavefit").expect("wavefit binary should exist");
        cmd.env_remove("WAVEFIT_CONFIG")
            .env_remove("WAVEFIT_LOG")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.dir.path())
            .arg("--config")
            .arg(&self.config)
            .arg("-q");
        cmd
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// 70 Western Europe incidents in the third wave, the even-numbered half of
/// them also in the fourth, plus one incident elsewhere.
fn table(extra_fourth_row: Option<&str>) -> String {
    let mut text = String::from(HEADER);
    for i in 0..70usize {
        let x = (i % 7) as f64 - 3.0;
        let y = ((i / 7) % 5) as f64 - 2.0;
        let e = if (i / 35) % 2 == 0 { 0.1 } else { -0.1 };
        let tt = (2.0 + 0.3 * x - 0.1 * y + e).exp() - 1.0;
        let bd = (3.0 - 0.2 * x + 0.2 * y - e).exp() - 1.0;
        let fourth = u8::from(i % 2 == 0);
        text.push_str(&format!("Western Europe,1,{fourth},{x},{y},{tt},{bd}\n"));
    }
    if let Some(row) = extra_fourth_row {
        text.push_str(row);
    }
    text.push_str("South America,1,1,0,0,1,1\n");
    text
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read output")
}

mod success {
    use super::*;

    #[test]
    fn run_writes_markdown_report() {
        let fx = Fixture::new(&table(None));
        let out = fx.path("report.md");
        fx.wavefit()
            .args(["run", "--output"])
            .arg(&out)
            .assert()
            .code(0);
        let report = read(&out);
        assert!(report.starts_with("# Terrorism Waves and Border Proximity"));
        assert!(report.contains("Third Wave"));
        assert!(report.contains("Fourth Wave"));
    }

    #[test]
    fn default_command_is_run() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .args(["--format", "summary"])
            .assert()
            .code(0)
            .stdout(predicate::str::contains("third: n=70"))
            .stdout(predicate::str::contains("fourth: n=35"));
    }

    #[test]
    fn json_report_lists_both_waves() {
        let fx = Fixture::new(&table(None));
        let output = fx
            .wavefit()
            .args(["run", "-f", "json"])
            .output()
            .expect("run wavefit");
        assert_eq!(output.status.code(), Some(0));
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
        assert_eq!(report["waves"].as_array().map(Vec::len), Some(2));
        assert_eq!(report["overview"]["rows_read"], 71);
        assert_eq!(report["overview"]["rows_in_region"], 70);
        assert_eq!(report["overview"]["engine"], "grid");
    }

    #[test]
    fn wave_selection_and_stacked_export() {
        let fx = Fixture::new(&table(None));
        let stacked_dir = fx.path("stacked");
        fx.wavefit()
            .args(["run", "--wave", "fourth", "-f", "summary", "--emit-stacked"])
            .arg(&stacked_dir)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("fourth: n=35"))
            .stdout(predicate::str::contains("third:").not());

        let csv = read(&stacked_dir.join("stacked_fourth.csv"));
        assert!(csv.starts_with("group,response,x_tt,y_tt,x_bd,y_bd\n"));
        assert_eq!(csv.lines().count(), 71);
        assert!(!stacked_dir.join("stacked_third.csv").exists());
    }

    #[test]
    fn check_reports_each_wave() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .arg("check")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("✓ third (Third Wave): 70 records, 140 stacked rows"))
            .stdout(predicate::str::contains("✓ fourth (Fourth Wave): 35 records, 70 stacked rows"));
    }

    #[test]
    fn config_show_names_the_source() {
        let fx = Fixture::new(&table(None));
        let output = fx
            .wavefit()
            .args(["config", "show"])
            .output()
            .expect("run wavefit");
        assert_eq!(output.status.code(), Some(0));
        let shown: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
        assert_eq!(shown["source"]["source"], "CLI argument");
        assert_eq!(shown["source"]["using_defaults"], false);
        assert_eq!(shown["config"]["data"]["region"], "Western Europe");
        assert_eq!(shown["source"]["hash"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn config_schema_is_json() {
        let fx = Fixture::new(&table(None));
        let output = fx
            .wavefit()
            .args(["config", "schema"])
            .output()
            .expect("run wavefit");
        assert_eq!(output.status.code(), Some(0));
        let schema: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
        assert!(schema["properties"]["waves"].is_object());
    }
}

mod partial {
    use super::*;

    #[test]
    fn negative_value_fails_only_its_wave() {
        let fx = Fixture::new(&table(Some("Western Europe,0,1,0.5,0.5,-3,10\n")));
        fx.wavefit()
            .args(["run", "-f", "summary"])
            .assert()
            .code(3)
            .stdout(predicate::str::contains("third: n=70"))
            .stdout(predicate::str::contains("fourth: FAILED [E23]"));
    }

    #[test]
    fn fail_fast_aborts_with_data_error() {
        let fx = Fixture::new(&table(Some("Western Europe,0,1,0.5,0.5,-3,10\n")));
        fx.wavefit()
            .args(["run", "--fail-fast"])
            .assert()
            .code(12)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("negative value"));
    }

    #[test]
    fn all_waves_failing_uses_the_failure_category() {
        let fx = Fixture::new(&table(Some("Western Europe,0,1,0.5,0.5,-3,10\n")));
        fx.wavefit()
            .args(["run", "--wave", "fourth", "-f", "summary"])
            .assert()
            .code(12)
            .stdout(predicate::str::contains("fourth: FAILED [E23]"));
    }

    #[test]
    fn empty_region_fails_every_wave() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .args(["run", "--region", "Antarctica", "-f", "summary"])
            .assert()
            .code(12)
            .stdout(predicate::str::contains("third: FAILED [E24]"));
    }
}

mod errors {
    use super::*;

    #[test]
    fn missing_column_is_a_data_error() {
        let text = "Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average\n\
                    Western Europe,1,0,1,1,1\n";
        let fx = Fixture::new(text);
        fx.wavefit()
            .arg("run")
            .assert()
            .code(12)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("required column 'B_Dist_km'"));
    }

    #[test]
    fn malformed_value_is_a_data_error() {
        let mut text = String::from(HEADER);
        text.push_str("Western Europe,1,0,1,1,slow,1\n");
        let fx = Fixture::new(&text);
        fx.wavefit()
            .args(["run", "-f", "json"])
            .assert()
            .code(12)
            .stderr(predicate::str::contains("\"code\":22"))
            .stderr(predicate::str::contains("Travel_Time_Average"));
    }

    #[test]
    fn json_error_names_the_exit_code() {
        let mut text = String::from(HEADER);
        text.push_str("Western Europe,1,0,1,1,slow,1\n");
        let fx = Fixture::new(&text);
        let output = fx
            .wavefit()
            .args(["run", "-f", "json"])
            .output()
            .expect("run wavefit");
        assert_eq!(output.status.code(), Some(12));
        let response: serde_json::Value =
            serde_json::from_slice(&output.stderr).expect("json error");
        assert_eq!(response["status"], "error");
        assert_eq!(response["exit_code"], 12);
        assert_eq!(response["exit_name"], "ERR_DATA");
        assert_eq!(response["error"]["code"], 22);
    }

    #[test]
    fn missing_input_file_is_a_data_error() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .arg("run")
            .arg("--data")
            .arg(fx.path("nope.csv"))
            .assert()
            .code(12);
        assert!(fx.data.exists());
    }

    #[test]
    fn unknown_wave_is_a_config_error() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .args(["run", "--wave", "fifth"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("unknown wave 'fifth'"));
    }

    #[test]
    fn invalid_config_json_is_a_config_error() {
        let fx = Fixture::new(&table(None));
        fs::write(&fx.config, "{ not json").expect("write config");
        fx.wavefit().arg("check").assert().code(11);
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let fx = Fixture::new(&table(None));
        fs::remove_file(&fx.config).expect("remove config");
        fx.wavefit().args(["config", "show"]).assert().code(11);
    }

    #[test]
    fn bad_format_is_an_args_error() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .args(["run", "--format", "xml"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn unknown_subcommand_is_an_args_error() {
        let fx = Fixture::new(&table(None));
        fx.wavefit().arg("nonexistent-command").assert().code(10);
    }

    #[test]
    fn help_exits_cleanly() {
        let fx = Fixture::new(&table(None));
        fx.wavefit()
            .arg("--help")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("check"));
    }
}
