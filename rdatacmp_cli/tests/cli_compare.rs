use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PRIMARY_CSV: &str = "\
id,name,amount,booked
1,Ann,10.00,2024-03-15
2,Bob,20.5,2024-03-16
3,Cid,30,2024-03-17
";

const SHADOW_JSON: &str = r#"[
  {"order_id": 1, "customer": "ann", "total": 10.001, "date": "2024/03/15"},
  {"order_id": 2, "customer": "Bob", "total": 20.49, "date": "20240316"},
  {"order_id": 4, "customer": "Dan", "total": 40, "date": "2024-03-18"}
]"#;

/// Primary CSV and shadow JSON plus a scheme tying them together
struct SchemeFixture {
    temp_dir: TempDir,
    scheme: PathBuf,
}

impl SchemeFixture {
    fn new() -> Self {
        Self::with_fields(
            r#"
[[field]]
code = "id"
is_unique = true

[[field]]
code = "name"

[field.comparator]
group = "builtin"
name = "String (ignore case)"

[[field]]
code = "amount"

[field.comparator]
group = "builtin"
name = "Float"
config = '{"precision":2}'

[[field]]
code = "booked"

[field.comparator]
group = "builtin"
name = "Date"
"#,
        )
    }

    fn with_fields(fields: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let primary = temp_dir.path().join("primary.csv");
        let shadow = temp_dir.path().join("shadow.json");
        fs::write(&primary, PRIMARY_CSV).expect("Failed to write primary");
        fs::write(&shadow, SHADOW_JSON).expect("Failed to write shadow");

        let scheme = temp_dir.path().join("orders.toml");
        let content = format!(
            r#"name = "orders"

[primary]
group = "file"
name = "CSV"
path = '{}'
identity_mapping = true

[shadow]
group = "file"
name = "JSON"
path = '{}'

[shadow.mapping]
id = "order_id"
name = "customer"
amount = "total"
booked = "date"
{}"#,
            primary.display(),
            shadow.display(),
            fields
        );
        fs::write(&scheme, content).expect("Failed to write scheme");

        SchemeFixture { temp_dir, scheme }
    }

    fn scheme(&self) -> &str {
        self.scheme.to_str().unwrap()
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Helper to run the CLI binary with an isolated config location
fn run_cli(args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_rdatacmp");
    let config_dir = TempDir::new().expect("Failed to create config dir");
    Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("XDG_DATA_HOME", config_dir.path())
        .env("APPDATA", config_dir.path())
        .env("LOCALAPPDATA", config_dir.path())
        .env("HOME", config_dir.path())
        .output()
        .expect("Failed to execute command")
}

fn run_cli_json(args: &[&str]) -> (i32, Value) {
    let output = run_cli(args);
    let code = output.status.code().unwrap_or(-1);
    assert!(
        code == 0 || code == 2,
        "command failed: {} (expected 0 or 2)\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    (code, serde_json::from_str(&stdout).expect("invalid json output"))
}

fn rows_by_key(report: &Value) -> HashMap<String, Value> {
    report["rows"]
        .as_array()
        .expect("rows array")
        .iter()
        .map(|row| (row["key"].as_str().unwrap().to_string(), row.clone()))
        .collect()
}

#[test]
fn test_compare_json_report() {
    let fixture = SchemeFixture::new();
    let (code, report) = run_cli_json(&["compare", fixture.scheme(), "--json", "--no-plugins"]);

    assert_eq!(code, 2);
    assert_eq!(report["scheme"], "orders");
    let summary = &report["summary"];
    assert_eq!(summary["primary_rows"], 3);
    assert_eq!(summary["shadow_rows"], 3);
    assert_eq!(summary["matched"], 2);
    assert_eq!(summary["identical"], 1);
    assert_eq!(summary["different"], 1);
    assert_eq!(summary["primary_only"], 1);
    assert_eq!(summary["shadow_only"], 1);

    let rows = rows_by_key(&report);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows["1"]["status"], "Matched");
    assert_eq!(rows["1"]["has_differences"], false);
    assert_eq!(rows["3"]["status"], "PrimaryOnly");
    assert_eq!(rows["4"]["status"], "ShadowOnly");

    let different: Vec<&str> = rows["2"]["cells"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|cell| cell["is_different"] == true)
        .map(|cell| cell["code"].as_str().unwrap())
        .collect();
    assert_eq!(different, vec!["amount"]);
}

#[test]
fn test_compare_diff_only_json() {
    let fixture = SchemeFixture::new();
    let (_, report) = run_cli_json(&[
        "compare",
        fixture.scheme(),
        "--json",
        "--diff-only",
        "--no-plugins",
    ]);

    let keys: Vec<&str> = report["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["2", "3", "4"]);
}

#[test]
fn test_compare_text_output() {
    let fixture = SchemeFixture::new();
    let output = run_cli(&["compare", fixture.scheme(), "--no-color", "--no-plugins"]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Comparison Results: orders"));
    assert!(stdout.contains("amount: 20.5 -> 20.49"));
    assert!(stdout.contains("Primary only:    1"));
}

#[test]
fn test_compare_text_output_uses_nickname() {
    let fixture = SchemeFixture::with_fields(
        r#"
[[field]]
code = "id"
is_unique = true

[[field]]
code = "amount"
nickname = "Order total"

[field.comparator]
group = "builtin"
name = "Float"
config = '{"precision":2}'
"#,
    );
    let output = run_cli(&["compare", fixture.scheme(), "--no-color", "--no-plugins"]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Order total: 20.5 -> 20.49"));
    assert!(!stdout.contains("amount: 20.5"));
}

#[test]
fn test_identical_sources_exit_zero() {
    let fixture = SchemeFixture::with_fields(
        r#"
[[field]]
code = "booked"
is_unique = true

[field.comparator]
group = "builtin"
name = "Date"
"#,
    );
    // Only rows 1 and 2 share dates on both sides
    let trimmed = "id,name,amount,booked\n1,Ann,10.00,2024-03-15\n2,Bob,20.5,2024-03-16\n";
    fs::write(fixture.dir().join("primary.csv"), trimmed).unwrap();
    fs::write(
        fixture.dir().join("shadow.json"),
        r#"[{"date": "2024-03-15"}, {"date": "2024-03-16"}]"#,
    )
    .unwrap();

    let (code, report) = run_cli_json(&["compare", fixture.scheme(), "--json", "--no-plugins"]);
    assert_eq!(code, 0);
    assert_eq!(report["summary"]["identical"], 2);
}

#[test]
fn test_scheme_without_unique_field_fails() {
    let fixture = SchemeFixture::with_fields(
        r#"
[[field]]
code = "id"
"#,
    );
    let output = run_cli(&["compare", fixture.scheme(), "--no-plugins"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_source_file_fails() {
    let fixture = SchemeFixture::new();
    fs::remove_file(fixture.dir().join("shadow.json")).unwrap();

    let output = run_cli(&["compare", fixture.scheme(), "--json", "--no-plugins"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_plugin_manifest_comparator() {
    let fixture = SchemeFixture::with_fields(
        r#"
[[field]]
code = "id"
is_unique = true

[[field]]
code = "amount"

[field.comparator]
group = "finance"
name = "Whole units"
"#,
    );
    let plugins = fixture.dir().join("plugins");
    fs::create_dir(&plugins).unwrap();
    fs::write(
        plugins.join("finance.toml"),
        r#"name = "finance"

[[comparator]]
group = "finance"
name = "Whole units"
kind = "Float"
config = '{"precision":0}'
"#,
    )
    .unwrap();

    let (_, report) = run_cli_json(&[
        "compare",
        fixture.scheme(),
        "--json",
        "--plugin-dir",
        plugins.to_str().unwrap(),
    ]);
    // 20.5 and 20.49 both truncate to 20 at precision 0
    assert_eq!(report["warnings"].as_array().unwrap().len(), 0);
    assert_eq!(report["summary"]["different"], 0);
    assert_eq!(report["summary"]["identical"], 2);

    let (_, fallback) = run_cli_json(&["compare", fixture.scheme(), "--json", "--no-plugins"]);
    let warnings = fallback["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["group"], "finance");
}

#[test]
fn test_plugins_lists_builtins() {
    let output = run_cli(&["plugins", "--no-plugins"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("builtin/Float"));
    assert!(stdout.contains("file/CSV"));
    assert!(stdout.contains("file/JSON"));
}

#[test]
fn test_check_value() {
    let output = run_cli(&["check-value", "2024年3月15日"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2024-03-15");

    let output = run_cli(&["check-value", "2024-02-30"]);
    assert_eq!(output.status.code(), Some(1));

    let output = run_cli(&["check-value", "09:05:07.5", "--as", "time"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "09:05:07.500");
}
