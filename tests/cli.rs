mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::{SAMPLE_REFERENCE, SAMPLE_REGISTRY, SAMPLE_TRANSACTIONS, TestWorkspace};

struct Inputs {
    workspace: TestWorkspace,
    transactions: String,
    reference: String,
}

impl Inputs {
    fn sample() -> Self {
        let workspace = TestWorkspace::new();
        let transactions = workspace.write("transactions.csv", SAMPLE_TRANSACTIONS);
        let reference = workspace.write("reference.csv", SAMPLE_REFERENCE);
        Self {
            transactions: transactions.display().to_string(),
            reference: reference.display().to_string(),
            workspace,
        }
    }

    fn registry(&self) -> String {
        self.workspace
            .write("registry.csv", SAMPLE_REGISTRY)
            .display()
            .to_string()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("supply-indicators").expect("binary exists");
        cmd.args(["--as-of", "2024-12-31"])
            .args(args)
            .args(["-t", &self.transactions, "-r", &self.reference]);
        cmd
    }
}

#[test]
fn largest_order_as_csv() {
    let inputs = Inputs::sample();
    inputs
        .command(&["orders", "--view", "largest", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("OF_CDG,VALOR_TOTAL"))
        .stdout(contains("OF2,500.00,Obra Centro,Alfa Materiais,02/04/2023"));
}

#[test]
fn summary_reports_headline_metrics() {
    let inputs = Inputs::sample();
    inputs
        .command(&["summary", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("INDICADOR,VALOR"))
        .stdout(contains("mean_order_value,212.00"))
        .stdout(contains("basic_order_percent,66.67"))
        .stdout(contains("active_suppliers,3"))
        .stdout(contains("registered_suppliers").not());
}

#[test]
fn summary_with_registry_counts_registered_suppliers() {
    let inputs = Inputs::sample();
    let registry = inputs.registry();
    inputs
        .command(&["summary", "--registry", &registry, "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("registered_suppliers,4"));
}

#[test]
fn top_suppliers_as_json() {
    let inputs = Inputs::sample();
    inputs
        .command(&["top-suppliers", "--format", "json"])
        .assert()
        .success()
        .stdout(contains("\"FORNECEDOR_CDG\": \"0017\""))
        .stdout(contains("\"UF\": \"SP\""));
}

#[test]
fn settings_file_changes_default_regions() {
    let inputs = Inputs::sample();
    let config = inputs.workspace.write("settings.yaml", "regions: [SP]\n");
    let mut cmd = Command::cargo_bin("supply-indicators").expect("binary exists");
    cmd.args(["--config", config.to_str().unwrap()]);
    cmd.args(["--as-of", "2024-12-31", "top-suppliers", "--format", "csv"])
        .args(["-t", &inputs.transactions, "-r", &inputs.reference])
        .assert()
        .success()
        .stdout(contains("SP,2041"))
        .stdout(contains("RJ,").not());
}

#[test]
fn bimonthly_volume_table() {
    let inputs = Inputs::sample();
    inputs
        .command(&["volume", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("Mar–Apr,550.00,2,51.89"));
}

#[test]
fn growth_without_clip() {
    let inputs = Inputs::sample();
    inputs
        .command(&["growth", "--no-clip", "--presence-years", "2", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("Agregados,2024,230.00,15.00"))
        .stdout(contains("Agregados,2023,2024,200.00,230.00,15.00"));
}

#[test]
fn clip_and_no_clip_conflict() {
    let inputs = Inputs::sample();
    inputs
        .command(&["growth", "--no-clip", "--clip", "100"])
        .assert()
        .failure();
}

#[test]
fn negative_or_nan_clip_is_rejected() {
    let inputs = Inputs::sample();
    for clip in ["--clip=-5", "--clip=NaN"] {
        inputs
            .command(&["growth", clip])
            .assert()
            .code(1)
            .stderr(contains("Invalid growth options"))
            .stderr(contains("clip_percent must be a positive number"))
            .stderr(contains("panicked").not());
    }
}

#[test]
fn presence_years_beyond_history_reports_no_compound_growth() {
    let inputs = Inputs::sample();
    inputs
        .command(&["growth", "--presence-years", "3000000000", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("Agregados,2024,230.00,15.00"))
        .stdout(contains("Agregados,2023,2024").not());
}

#[test]
fn zero_presence_years_is_rejected() {
    let inputs = Inputs::sample();
    inputs
        .command(&["growth", "--presence-years", "0"])
        .assert()
        .code(1)
        .stderr(contains("presence_years must be at least 1"));
}

#[test]
fn registry_views_require_registry() {
    let inputs = Inputs::sample();
    inputs
        .command(&["suppliers", "--view", "registered"])
        .assert()
        .failure()
        .stderr(contains("--registry is required"));
}

#[test]
fn registered_suppliers_from_registry() {
    let inputs = Inputs::sample();
    let registry = inputs.registry();
    inputs
        .command(&[
            "suppliers",
            "--view",
            "registered",
            "--registry",
            &registry,
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(contains("registered_suppliers,4"));
}

#[test]
fn apt_suppliers_per_location() {
    let inputs = Inputs::sample();
    let registry = inputs.registry();
    inputs
        .command(&[
            "suppliers",
            "--view",
            "apt",
            "--registry",
            &registry,
            "--location",
            "Niteroi",
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(contains("LOCAL,FORNECEDORES_APTOS"))
        .stdout(contains("Niteroi,1"));
}

#[test]
fn columns_lists_resolved_fields() {
    let inputs = Inputs::sample();
    inputs
        .command(&["columns", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("CAMPO,COLUNA,OBRIGATORIO"))
        .stdout(contains("FORNECEDOR_CDG,FORNECEDOR_CDG"));
}

#[test]
fn missing_input_file_is_reported() {
    let inputs = Inputs::sample();
    let missing = inputs.workspace.path().join("absent.csv");
    Command::cargo_bin("supply-indicators")
        .expect("binary exists")
        .args(["orders", "--view", "mean", "-t"])
        .arg(&missing)
        .args(["-r", &inputs.reference])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn unrecognized_reference_date_is_rejected() {
    let inputs = Inputs::sample();
    Command::cargo_bin("supply-indicators")
        .expect("binary exists")
        .args(["--as-of", "someday", "columns"])
        .args(["-t", &inputs.transactions, "-r", &inputs.reference])
        .assert()
        .failure()
        .stderr(contains("Unrecognized date"));
}
