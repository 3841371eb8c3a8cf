// End-to-end tests for the `vinrecon` binary: exit codes, report output,
// and the stderr error contract.
//
// Run with: cargo test -p vinrecon-cli --test cli_tests

use std::path::PathBuf;
use std::process::{Command, Output};

use httpmock::prelude::*;

fn vinrecon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vinrecon"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("process exited by signal")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn run_d1(extra: &[&str]) -> Output {
    let inventory = fixture("inventory.csv");
    let listings = fixture("listings.csv");
    let mut args = vec![
        "run",
        "--primary",
        inventory.as_str(),
        "--comparison",
        listings.as_str(),
        "--dealer",
        "D1",
    ];
    args.extend_from_slice(extra);
    vinrecon().args(&args).output().expect("vinrecon run")
}

fn run_d1_with_dealer(dealer: &str) -> Output {
    let inventory = fixture("inventory.csv");
    let listings = fixture("listings.csv");
    vinrecon()
        .args(["run", "--primary", inventory.as_str(), "--comparison", listings.as_str(), "--dealer", dealer])
        .output()
        .expect("vinrecon run")
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_csv_reports_discrepancies_and_exits_1() {
    let output = run_d1(&["--csv"]);
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "VIN,Vehicle Type,Price A,Price B,Discrepancy\n\
         1FTFW1ET5DFC10312,Used,24950.00,25950.00,1000.00\n\
         2T1BURHE0JC074523,New,21990.00,22490.00,500.00\n"
    );
    let err = stderr(&output);
    assert!(err.contains("2 discrepancies"), "stderr: {err}");
    assert!(!err.contains("error:"), "exit 1 is not an error: {err}");
}

#[test]
fn run_json_is_single_document() {
    let output = run_d1(&["--json"]);
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));

    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).expect("valid JSON");
    assert_eq!(val["meta"]["dealer_id"], "D1");
    assert_eq!(val["summary"]["comparison_records"], 5);
    assert_eq!(val["summary"]["matched"], 4);
    assert_eq!(val["summary"]["skipped_unknown_type"], 1);
    assert_eq!(val["discrepancies"].as_array().unwrap().len(), 2);
}

#[test]
fn run_table_is_default() {
    let output = run_d1(&[]);
    assert_eq!(code(&output), 1);
    let out = stdout(&output);
    assert!(out.starts_with("VIN"), "{out}");
    assert!(out.contains("Discrepancy"));
    assert!(out.contains("1FTFW1ET5DFC10312"));
}

#[test]
fn run_filters_listings_by_dealer() {
    let inventory = fixture("inventory.csv");
    let listings = fixture("listings.csv");
    let output = vinrecon()
        .args(["run", "--primary", inventory.as_str(), "--comparison", listings.as_str(), "--dealer", "D2", "--csv"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "VIN,Vehicle Type,Price A,Price B,Discrepancy\n\
         5YJSA1E26HF000337,Used,45500.50,44000.00,1500.50\n\
         3VW2B7AJ5HM384422,New,23495.00,23000.00,495.00\n"
    );
}

#[test]
fn run_without_discrepancies_exits_0() {
    // Inventory against itself, filtered on Make: the Honda matches at the same price.
    let inventory = fixture("inventory.csv");
    let output = vinrecon()
        .args(["run", "--primary", inventory.as_str(), "--comparison", inventory.as_str(), "--dealer", "Honda"])
        .args(["--comparison-vin-field", "VIN", "--comparison-dealer-field", "Make"])
        .args(["--comparison-new-price-field", "BookValue", "--comparison-used-price-field", "SellingPrice"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "no price discrepancies\n");
    assert!(stderr(&output).contains("1 matched"), "{}", stderr(&output));
}

#[test]
fn run_output_file_infers_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let output = run_d1(&["--output", path.to_str().unwrap()]);
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let val: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(val["discrepancies"][0]["vin"], "1FTFW1ET5DFC10312");
}

#[test]
fn missing_inputs_exit_2_before_any_fetch() {
    let output = vinrecon().args(["run", "--primary", "http://127.0.0.1:9/never.csv"]).output().unwrap();
    assert_eq!(code(&output), 2);
    let err = stderr(&output);
    assert!(err.contains("error: missing required input: comparison feed source, dealer id"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn empty_dealer_is_missing_input_not_config_error() {
    let output = run_d1_with_dealer("");
    assert_eq!(code(&output), 2, "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("error: missing required input: dealer id"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn other_dealers_text_price_does_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let listings = dir.path().join("listings.csv");
    std::fs::write(
        &listings,
        "dealer_id,vin,RetailValue,InternetPrice\n\
         D1,2T1BURHE0JC074523,22490,Call\n\
         D9,9ZZZZZZZZZZZZZZZZ,Call for price,\n",
    )
    .unwrap();

    let inventory = fixture("inventory.csv");
    let output = vinrecon()
        .args(["run", "--primary", inventory.as_str()])
        .args(["--comparison", listings.to_str().unwrap(), "--dealer", "D1", "--csv"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "VIN,Vehicle Type,Price A,Price B,Discrepancy\n\
         2T1BURHE0JC074523,New,21990.00,22490.00,500.00\n"
    );
}

#[test]
fn compared_text_price_exits_63() {
    let dir = tempfile::tempdir().unwrap();
    let listings = dir.path().join("listings.csv");
    std::fs::write(&listings, "dealer_id,vin,RetailValue,InternetPrice\nD1,2T1BURHE0JC074523,Call,\n").unwrap();

    let inventory = fixture("inventory.csv");
    let output = vinrecon()
        .args(["run", "--primary", inventory.as_str()])
        .args(["--comparison", listings.to_str().unwrap(), "--dealer", "D1"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 63, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("cannot parse price 'Call' in column 'RetailValue'"), "{}", stderr(&output));
}

#[test]
fn misnamed_column_exits_62() {
    let output = run_d1(&["--primary-new-price-field", "MSRP"]);
    assert_eq!(code(&output), 62);
    assert!(
        stderr(&output).contains("primary feed: configured column 'MSRP' not found"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn unknown_type_error_policy_exits_63() {
    let output = run_d1(&["--unknown-type", "error"]);
    assert_eq!(code(&output), 63);
    assert!(stderr(&output).contains("Demo"), "{}", stderr(&output));
}

#[test]
fn unknown_type_used_policy_reports_demo_row() {
    let output = run_d1(&["--unknown-type", "used", "--csv"]);
    assert_eq!(code(&output), 1);
    assert!(stdout(&output).contains("JH4KA8260MC012345,Used,8000.00,7000.00,1000.00"));
}

#[test]
fn bad_policy_value_is_usage_error() {
    let output = run_d1(&["--on-duplicate", "last"]);
    assert_eq!(code(&output), 2);
}

#[test]
fn http_404_exits_60() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/inventory.csv");
        then.status(404);
    });

    let listings = fixture("listings.csv");
    let output = vinrecon()
        .args(["run", "--primary", server.url("/inventory.csv").as_str()])
        .args(["--comparison", listings.as_str(), "--dealer", "D1"])
        .output()
        .unwrap();

    mock.assert();
    assert_eq!(code(&output), 60);
    assert!(stderr(&output).contains("download failed"), "{}", stderr(&output));
}

#[test]
fn http_feeds_reconcile() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/inventory.csv");
        then.status(200).body("VIN,Type,BookValue,SellingPrice\n1A,New,20000,\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/listings.csv");
        then.status(200).body("dealer_id,vin,RetailValue,InternetPrice\nD1,1A,21000,\n");
    });

    let output = vinrecon()
        .args(["run", "--primary", server.url("/inventory.csv").as_str()])
        .args(["--comparison", server.url("/listings.csv").as_str(), "--dealer", "D1", "--csv"])
        .output()
        .unwrap();

    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "VIN,Vehicle Type,Price A,Price B,Discrepancy\n1A,New,20000.00,21000.00,1000.00\n"
    );
}

#[test]
fn ragged_feed_exits_61() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.csv");
    std::fs::write(&bad, "VIN,Type,BookValue,SellingPrice\n1A,New\n").unwrap();

    let listings = fixture("listings.csv");
    let output = vinrecon()
        .args(["run", "--primary", bad.to_str().unwrap()])
        .args(["--comparison", listings.as_str(), "--dealer", "D1"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 61, "stderr: {}", stderr(&output));
}

#[test]
fn config_file_sources_resolve_next_to_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("inventory.csv"), dir.path().join("inventory.csv")).unwrap();
    std::fs::copy(fixture("listings.csv"), dir.path().join("listings.csv")).unwrap();
    let config = dir.path().join("store.recon.toml");
    std::fs::write(
        &config,
        r#"
name = "Store"
dealer = "D1"
[primary]
source = "inventory.csv"
[comparison]
source = "listings.csv"
"#,
    )
    .unwrap();

    let output = vinrecon()
        .args(["run", "--config", config.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 1, "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["meta"]["config_name"], "Store");
    assert_eq!(val["summary"]["discrepancies"], 2);
}

// ===========================================================================
// dealers / fetch / validate
// ===========================================================================

#[test]
fn dealers_lists_first_seen_order() {
    let listings = fixture("listings.csv");
    let output = vinrecon().args(["dealers", "--comparison", listings.as_str()]).output().unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "D1\nD2\n");
}

#[test]
fn fetch_writes_utf8_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("latin1.csv");
    std::fs::write(&src, b"vin;make\n1A;Citro\xebn\n").unwrap();
    let out = dir.path().join("snapshot.csv");

    let output = vinrecon()
        .args(["fetch", src.to_str().unwrap(), "--delimiter", ";", "--out", out.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "vin,make\n1A,Citroën\n");
}

#[test]
fn validate_accepts_good_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("ok.recon.toml");
    std::fs::write(&config, "dealer = \"D1\"\n[comparison.columns]\ntype = \"condition\"\n").unwrap();

    let output = vinrecon()
        .args(["validate", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.starts_with("valid:"), "{err}");
    assert!(err.contains("type=condition"), "{err}");
}

#[test]
fn validate_rejects_misspelled_section() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("typo.recon.toml");
    std::fs::write(&config, "dealer = \"D1\"\n[comparison.colums]\ntype = \"condition\"\n").unwrap();

    let output = vinrecon()
        .args(["validate", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(code(&output), 62, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("colums"), "{}", stderr(&output));
}

#[test]
fn validate_rejects_untyped_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(&config, "[primary.columns]\ntype = \"\"\n").unwrap();

    let output = vinrecon()
        .args(["validate", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(code(&output), 62);
    assert!(stderr(&output).starts_with("error: config validation error"));
}
