use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const RAW_CSV: &str = "\
Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City
O2,03-01-2024,Gadget,25.5,2,In-store,Cash,Bruno,Porto
O1,01-01-2024,Widget,10,2,Online,Card,Ana,Lisbon
O3,02-01-2024,Widget,10,1,Online,Card,Ana,
";

const KEY_VAR: &str = "SALES_AGENT_CLI_TEST_KEY";

fn sales_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sales"))
}

fn setup_test_env(raw_csv: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("sales.csv"), raw_csv).unwrap();

    let config_content = format!(
        r#"[data]
input = "{root}/data/sales.csv"
output = "{root}/data/cleaned.csv"

[index]
path = "{root}/data/index"

[llm]
api_key_env = "{key}"
"#,
        root = root.display(),
        key = KEY_VAR,
    );
    let config_path = root.join("sales.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_sales(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = sales_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove(KEY_VAR)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run sales binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn clean_writes_sorted_complete_rows() {
    let (tmp, config_path) = setup_test_env(RAW_CSV);

    let (stdout, stderr, success) = run_sales(&config_path, &["clean"]);
    assert!(success, "clean failed: {}", stderr);

    let cleaned = fs::read_to_string(tmp.path().join("data/cleaned.csv")).unwrap();
    let lines: Vec<&str> = cleaned.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City,Revenue",
            "O1,2024-01-01,Widget,10,2,Online,Card,Ana,Lisbon,20",
            "O2,2024-01-03,Gadget,25.5,2,In-store,Cash,Bruno,Porto,51",
        ]
    );

    assert!(stdout.contains("Missing values before handling:"));
    assert!(stdout.contains("Date range: 2024-01-01 to 2024-01-03"));
    assert!(stdout.contains("Total records: 2"));
    assert!(stdout.contains("Total revenue: $71.00"));
    assert!(stdout.contains("✓ Cleaned data saved to"));
}

#[test]
fn clean_flags_override_config() {
    let (tmp, config_path) = setup_test_env("");
    let input = tmp.path().join("other.csv");
    let output = tmp.path().join("out/cleaned.csv");
    fs::write(&input, RAW_CSV).unwrap();

    let (_, stderr, success) = run_sales(
        &config_path,
        &[
            "clean",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ],
    );
    assert!(success, "clean failed: {}", stderr);
    assert!(output.exists());
}

#[test]
fn clean_rejects_malformed_date_without_writing() {
    let (tmp, config_path) = setup_test_env(
        "Order ID,Date,Product,Price,Quantity,Purchase Type,Payment Method,Manager,City\n\
         O1,2024/01/01,Widget,10,2,Online,Card,Ana,Lisbon\n",
    );

    let (_, stderr, success) = run_sales(&config_path, &["clean"]);
    assert!(!success);
    assert!(stderr.contains("cannot parse date '2024/01/01'"), "{}", stderr);
    assert!(!tmp.path().join("data/cleaned.csv").exists());
}

#[test]
fn clean_fails_on_missing_input_file() {
    let (tmp, config_path) = setup_test_env(RAW_CSV);
    let missing = tmp.path().join("data/absent.csv");

    let (_, stderr, success) = run_sales(
        &config_path,
        &["clean", "--input", missing.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to open input file"), "{}", stderr);
    assert!(!tmp.path().join("data/cleaned.csv").exists());
}

#[test]
fn clean_rejects_missing_column() {
    let (_tmp, config_path) = setup_test_env("Order ID,Date,Product\nO1,01-01-2024,Widget\n");

    let (_, stderr, success) = run_sales(&config_path, &["clean"]);
    assert!(!success);
    assert!(stderr.contains("missing required column 'Price'"), "{}", stderr);
}

#[test]
fn ask_without_credential_fails_before_indexing() {
    let (tmp, config_path) = setup_test_env(RAW_CSV);
    let (_, _, cleaned) = run_sales(&config_path, &["clean"]);
    assert!(cleaned);

    let (_, stderr, success) = run_sales(&config_path, &["ask", "Which product sold most?"]);
    assert!(!success);
    assert!(
        stderr.contains("SALES_AGENT_CLI_TEST_KEY environment variable not set"),
        "{}",
        stderr
    );
    assert!(!tmp.path().join("data/index").exists());
}

#[test]
fn chat_without_credential_fails() {
    let (_tmp, config_path) = setup_test_env(RAW_CSV);

    let (_, stderr, success) = run_sales(&config_path, &["chat"]);
    assert!(!success);
    assert!(stderr.contains(KEY_VAR), "{}", stderr);
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[retrieval]\ntop_k = 0\n").unwrap();

    let (_, stderr, success) = run_sales(&config_path, &["clean"]);
    assert!(!success);
    assert!(stderr.contains("top_k"), "{}", stderr);
}
