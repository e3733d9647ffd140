use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

fn run_bin(args: &[&str]) -> String {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_tempwatch"));

    let output = Command::new(bin)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn results_files(test_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    fs::read_dir(test_dir)
        .expect("failed to read test directory")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".json"))
        })
        .collect()
}

fn write_dataset(test_dir: &Path) {
    let mut csv_contents = String::from("city,timestamp,temperature,season\n");
    // Three years of daily data with a fixed seasonal pattern and a small wobble.
    let seasonal = [(0.0, "winter"), (10.0, "spring"), (22.0, "summer"), (12.0, "autumn")];
    for city in ["Berlin", "Rio de Janeiro"] {
        for year in 2010..2013 {
            for month in 1..=12u32 {
                let (mean, name) = seasonal[match month {
                    12 | 1 | 2 => 0,
                    3..=5 => 1,
                    6..=8 => 2,
                    _ => 3,
                }];
                for day in 1..=28u32 {
                    let wobble = if (day + month) % 3 == 0 { 3.0 } else { -1.5 };
                    csv_contents += &format!(
                        "{city},{year}-{month:02}-{day:02},{},{name}\n",
                        mean + wobble
                    );
                }
            }
        }
    }
    fs::write(test_dir.join("temperature_data.csv"), csv_contents)
        .expect("failed to write dataset");
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_contents = String::new()
        + "[data]\n"
        + "file = \"temperature_data.csv\"\n"
        + "\n"
        + "[weather]\n"
        + "timeout_secs = 2\n"
        + "api_key_env = \"TEMPWATCH_INTEGRATION_UNSET_KEY\"\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    write_dataset(&test_dir);

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let cities = run_bin(&["--work-dir", test_dir_str, "cities"]);
    assert_eq!(cities.lines().collect::<Vec<_>>(), vec!["Berlin", "Rio de Janeiro"]);

    let report = run_bin(&["--work-dir", test_dir_str, "analyze", "--city", "Berlin"]);
    let report: serde_json::Value = serde_json::from_str(&report).expect("invalid analyze report");
    assert_eq!(report["rows"].as_array().map(Vec::len), Some(3 * 12 * 28));
    assert_eq!(results_files(&test_dir, "results-berlin-").len(), 1);

    // Second run is served from the cache and must agree with the first.
    let cached = run_bin(&["--work-dir", test_dir_str, "analyze", "--city", "Berlin"]);
    let cached: serde_json::Value = serde_json::from_str(&cached).expect("invalid analyze report");
    assert_eq!(report, cached);

    let windowed = run_bin(&[
        "--work-dir",
        test_dir_str,
        "analyze",
        "--city",
        "Rio de Janeiro",
        "--start",
        "2011-01-01",
        "--days",
        "90",
    ]);
    let windowed: serde_json::Value = serde_json::from_str(&windowed).expect("invalid analyze report");
    let rows = windowed["rows"].as_array().expect("rows should be an array");
    assert!(!rows.is_empty());
    assert_eq!(rows[0]["timestamp"], "2011-01-01");

    let check = run_bin(&[
        "--work-dir",
        test_dir_str,
        "check",
        "--city",
        "Berlin",
        "--temperature",
        "25",
        "--month",
        "1",
    ]);
    let check: serde_json::Value = serde_json::from_str(&check).expect("invalid check report");
    assert_eq!(check["season"], "winter");
    assert_eq!(check["verdict"]["anomalous"], true);

    let check = run_bin(&[
        "--work-dir",
        test_dir_str,
        "check",
        "--city",
        "Berlin",
        "--temperature",
        "-1",
        "--month",
        "2",
    ]);
    let check: serde_json::Value = serde_json::from_str(&check).expect("invalid check report");
    assert_eq!(check["verdict"]["anomalous"], false);

    // Without a key the live lookup fails but the baseline is still reported.
    let check = run_bin(&["--work-dir", test_dir_str, "check", "--city", "Berlin", "--month", "7"]);
    let check: serde_json::Value = serde_json::from_str(&check).expect("invalid check report");
    assert!(check["baseline"].is_object());
    assert!(check["verdict"].is_null());
    assert_eq!(check["error"], "no API key provided");

    run_bin(&["--work-dir", test_dir_str, "clean"]);
    assert!(results_files(&test_dir, "results-").is_empty());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn missing_column_fails() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("missing_column");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(
        test_dir.join("temperature_data.csv"),
        "city,date,temperature\nBerlin,2010-01-01,1.0\n",
    )
    .expect("failed to write dataset");

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_tempwatch"));
    let output = Command::new(bin)
        .args(["--work-dir", test_dir.to_str().unwrap(), "analyze", "--city", "Berlin"])
        .output()
        .expect("failed to execute command");

    assert!(!output.status.success());
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(stderr_str.contains("timestamp"), "stderr:\n{stderr_str}");

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn non_finite_reading_is_rejected() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("non_finite_reading");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(
        test_dir.join("temperature_data.csv"),
        "city,timestamp,temperature\nBerlin,2010-01-01,1.0\nBerlin,2010-01-21,NaN\n",
    )
    .expect("failed to write dataset");

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_tempwatch"));
    let work_dir = test_dir.to_str().unwrap();

    let output = Command::new(&bin)
        .args(["--work-dir", work_dir, "check", "--city", "Berlin", "--temperature", "NaN"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(stderr_str.contains("finite"), "stderr:\n{stderr_str}");

    let output = Command::new(&bin)
        .args(["--work-dir", work_dir, "analyze", "--city", "Berlin"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(stderr_str.contains("non-finite"), "stderr:\n{stderr_str}");

    fs::remove_dir_all(&test_dir).ok();
}
