//! End-to-end tests driving the CLI handlers against temporary directories.

use datagen::commands::{
    run_generate, run_infer, run_preview, run_validate, GenerateArgs, InferArgs, PreviewArgs,
    ValidateArgs,
};
use datagen::config::DatagenConfig;
use datagen::engine::CommandStatus;
use datagen::sinks::SinkKind;
use datagen::ModelOpts;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CUSTOMERS: &str = r#"
model_name: customers
fields:
  - name: id
    type: increment_long
    min: 1000
  - name: country
    type: country
    possible_values_weighted:
      France: 60
      Germany: 30
      Spain: 10
  - name: age
    type: integer
    min: 18
    max: 80
  - name: secret
    type: string_az
    length: 6
    ghost: true
  - name: adult
    type: boolean
    conditionals:
      "$age>17": "true"
      "default": "false"
  - name: label
    type: string
    injection: "${country}-${secret}"
options:
  one_file_per_iteration: true
  csv_header: true
"#;

fn write_model(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("model.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

fn model_opts(path: PathBuf) -> ModelOpts {
    ModelOpts {
        model: path,
        dictionaries_dir: None,
    }
}

fn config(dir: &Path) -> DatagenConfig {
    DatagenConfig {
        output_dir: dir.join("out"),
        scheduler_tick: "10ms".to_string(),
        ..Default::default()
    }
}

fn generate_args(model: PathBuf, sinks: Vec<SinkKind>) -> GenerateArgs {
    GenerateArgs {
        model: model_opts(model),
        sinks,
        threads: Some(2),
        batches: Some(3),
        rows_per_batch: Some(20),
        delay: None,
        cycles: None,
        seed: Some(7),
        output_dir: None,
        properties: Vec::new(),
        timeout: "1m".to_string(),
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}

#[test]
fn test_generate_to_csv_and_json() {
    tracing_subscriber::fmt().try_init().ok();
    let dir = TempDir::new().unwrap();
    let model = write_model(dir.path(), CUSTOMERS);
    let config = config(dir.path());

    let snapshot = run_generate(
        generate_args(model, vec![SinkKind::Csv, SinkKind::Json]),
        &config,
    )
    .unwrap();
    assert_eq!(snapshot.status, CommandStatus::Finished);
    assert_eq!(snapshot.progress, 100.0);

    let out = dir.path().join("out");
    let csv_files = files_with_extension(&out, "csv");
    assert_eq!(csv_files.len(), 3);

    let mut ids = Vec::new();
    for path in &csv_files {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["id", "country", "age", "adult", "label"]);
        for record in reader.records() {
            let record = record.unwrap();
            ids.push(record[0].parse::<i64>().unwrap());
            assert!(["France", "Germany", "Spain"].contains(&&record[1]));
            assert_eq!(&record[3], "true");
            assert!(record[4].starts_with(&record[1]));
            assert_eq!(record[4].len(), record[1].len() + 7);
        }
    }
    ids.sort_unstable();
    assert_eq!(ids, (1001..=1060).collect::<Vec<_>>());

    let json_files = files_with_extension(&out, "json");
    assert_eq!(json_files.len(), 3);
    let mut lines = 0;
    for path in &json_files {
        for line in fs::read_to_string(path).unwrap().lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("secret").is_none());
            assert_eq!(value["adult"], serde_json::Value::Bool(true));
            lines += 1;
        }
    }
    assert_eq!(lines, 60);
}

#[test]
fn test_scheduled_generation_stops_after_cycles() {
    let dir = TempDir::new().unwrap();
    let model = write_model(dir.path(), CUSTOMERS);
    let config = config(dir.path());

    let mut args = generate_args(model, vec![SinkKind::Json]);
    args.batches = Some(1);
    args.delay = Some("50ms".to_string());
    args.cycles = Some(2);

    let snapshot = run_generate(args, &config).unwrap();
    assert!(snapshot.cycles >= 2);
    assert!(files_with_extension(&dir.path().join("out"), "json").len() >= 2);
}

#[test]
fn test_preview_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let model = write_model(dir.path(), CUSTOMERS);
    let config = config(dir.path());
    let args = PreviewArgs {
        model: model_opts(model),
        count: 5,
        seed: Some(42),
        pretty: false,
    };

    let mut first = Vec::new();
    let mut second = Vec::new();
    assert_eq!(run_preview(&args, &config, &mut first).unwrap(), 5);
    run_preview(&args, &config, &mut second).unwrap();

    let first = String::from_utf8(first).unwrap();
    assert_eq!(first.lines().count(), 5);
    // Counters live in the model, so a fresh run starts again at 1001.
    assert_eq!(first, String::from_utf8(second).unwrap());
    let row: serde_json::Value = serde_json::from_str(first.lines().next().unwrap()).unwrap();
    assert_eq!(row["id"], serde_json::json!(1001));
}

#[test]
fn test_validate_reports_cycles() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let valid = write_model(dir.path(), CUSTOMERS);
    let report = run_validate(
        &ValidateArgs {
            model: model_opts(valid),
        },
        &config,
    )
    .unwrap();
    assert!(report.starts_with("Model 'customers' is valid: 6 fields (2 computed, 1 ghost)"));
    assert!(report.contains("Computed order: adult -> label"));

    let cyclic = write_model(
        dir.path(),
        r#"
fields:
  - name: a
    type: long
    formula: "$b + 1"
  - name: b
    type: long
    formula: "$a + 1"
"#,
    );
    let err = run_validate(
        &ValidateArgs {
            model: model_opts(cyclic),
        },
        &config,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("invalid"));
}

#[test]
fn test_infer_from_generated_csv() {
    let dir = TempDir::new().unwrap();
    let model = write_model(dir.path(), CUSTOMERS);
    let config = config(dir.path());
    run_generate(generate_args(model, vec![SinkKind::Csv]), &config).unwrap();

    let output = dir.path().join("inferred.yaml");
    let rendered = run_infer(&InferArgs {
        kind: SinkKind::Csv,
        dir: dir.path().join("out"),
        name: "customers".to_string(),
        deep: true,
        no_header: false,
        output: Some(output.clone()),
    })
    .unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), rendered);

    let inferred = datagen::core::ModelDefinition::from_yaml(&rendered).unwrap();
    assert_eq!(inferred.model_name, "customers");
    assert_eq!(
        inferred.field_names(),
        vec!["id", "country", "age", "adult", "label"]
    );
    assert_eq!(inferred.fields[0].kind, datagen::core::FieldKind::Long);
    assert_eq!(inferred.fields[3].kind, datagen::core::FieldKind::Boolean);
    let mut countries = inferred.fields[1].possible_values.clone();
    countries.sort();
    assert!(countries.iter().all(|c| ["France", "Germany", "Spain"].contains(&c.as_str())));
}

#[test]
fn test_missing_model_file() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let err = run_generate(
        generate_args(dir.path().join("missing.yaml"), vec![SinkKind::Memory]),
        &config,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load model"));
}
