use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:g="http://base.google.com/ns/1.0" version="2.0">
  <channel>
    <title>Tienda</title>
    <item>
      <g:id>1</g:id>
      <g:title>Crema X</g:title>
      <g:description>Vieja</g:description>
    </item>
    <item>
      <g:id>2</g:id>
      <g:title>Shampoo</g:title>
    </item>
    <item>
      <g:id>999</g:id>
      <g:title>Sin datos</g:title>
      <g:description>Intacta</g:description>
    </item>
  </channel>
</rss>
"#;

const REFERENCE_CSV: &str = "Id,Nombre,Marca,Categoria,SKU,Barcode,Descripcion\n\
1,Crema X,AcmeCo,Cuidado Piel,SKU-1,,Ideal para piel grasa y sensible\n\
2,AcmeCo Shampoo,AcmeCo,,SKU-2,7501234567890,<p>Para cabello <b>seco</b></p>\n";

fn setup_test_env(reference_name: &str, reference: &[u8], extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("feed.xml"), FEED).unwrap();
    fs::write(data_dir.join(reference_name), reference).unwrap();

    let config_content = format!(
        r#"[feed]
path = "{root}/data/feed.xml"

[reference]
path = "{root}/data/{reference_name}"
{extra}

[output]
path = "{root}/out/output_feed.xml"
"#,
        root = root.display(),
        reference_name = reference_name,
        extra = extra,
    );
    let config_path = config_dir.join("feed-enrich.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cli(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_feed-enrich");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run feed-enrich at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn read_output(tmp: &TempDir) -> String {
    fs::read_to_string(tmp.path().join("out/output_feed.xml")).unwrap()
}

/// Minimal xlsx with the reference rows as inline strings and numbers.
fn minimal_xlsx() -> Vec<u8> {
    let sheet = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="inlineStr"><is><t>Crema X</t></is></c><c r="C2" t="inlineStr"><is><t>AcmeCo</t></is></c><c r="D2" t="inlineStr"><is><t>Para piel mixta</t></is></c></row>
</sheetData></worksheet>"#;
    let shared = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>Id</t></si><si><t>Nombre</t></si><si><t>Marca</t></si><si><t>Descripcion</t></si></sst>"#;

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/sharedStrings.xml", opts).unwrap();
        zip.write_all(shared.as_bytes()).unwrap();
        zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

#[test]
fn test_run_enriches_matching_items() {
    let (tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");

    let (stdout, stderr, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("items: 3"));
    assert!(stdout.contains("enriched: 2"));
    assert!(stdout.contains("not found: 1"));
    assert!(stdout.contains("ok"));

    let out = read_output(&tmp);
    assert!(out.contains("<g:title>Crema X | Piel Grasa | AcmeCo | Cuidado Piel</g:title>"));
    assert!(out.contains(
        "<g:description>Producto: Crema X\nMarca: AcmeCo\nCategoría: Cuidado Piel\n\
         Uso Específico: Piel Grasa\n---\nDescripción Detallada:\n\
         Ideal para piel grasa y sensible</g:description>"
    ));
    // Brand already in the name; description created for the item that lacked one.
    assert!(out.contains("<g:title>AcmeCo Shampoo | Cabello Seco</g:title>"));
    assert!(out.contains("Barcode: 7501234567890"));
    // Unmatched item untouched.
    assert!(out.contains("<g:title>Sin datos</g:title>"));
    assert!(out.contains("<g:description>Intacta</g:description>"));
}

#[test]
fn test_run_preserves_item_order() {
    let (tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");
    let (_, _, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success);

    let out = read_output(&tmp);
    let first = out.find("<g:id>1</g:id>").unwrap();
    let second = out.find("<g:id>2</g:id>").unwrap();
    let third = out.find("<g:id>999</g:id>").unwrap();
    assert!(first < second && second < third);
    assert_eq!(out.matches("<item>").count(), 3);
}

#[test]
fn test_run_is_idempotent() {
    let (tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");
    let (_, _, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success);
    let once = read_output(&tmp);

    // Feed the output back in as the input.
    fs::write(tmp.path().join("data/feed.xml"), &once).unwrap();
    let (_, _, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success);
    assert_eq!(read_output(&tmp), once);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");
    let (stdout, _, success) = run_cli(&config_path, &["run", "--dry-run", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("enriched: 2"));
    assert!(!tmp.path().join("out/output_feed.xml").exists());
}

#[test]
fn test_json_progress_on_stderr() {
    let (_tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");
    let (stdout, stderr, success) = run_cli(&config_path, &["run", "--progress", "json"]);
    assert!(success);
    assert!(stderr.contains(r#""phase":"enriching""#));
    assert!(stderr.contains(r#""total":3"#));
    let summary = stderr
        .lines()
        .find(|l| l.contains(r#""event":"summary""#))
        .unwrap_or_else(|| panic!("no summary event: {}", stderr));
    assert!(summary.contains(r#""enriched":2"#));
    assert!(summary.contains(r#""not_found":1"#));
    assert!(!stdout.contains("\"event\""));
}

#[test]
fn test_run_with_xlsx_reference() {
    let (tmp, config_path) = setup_test_env("Productos.xlsx", &minimal_xlsx(), "");
    let (stdout, stderr, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("enriched: 1"));

    let out = read_output(&tmp);
    assert!(out.contains("<g:title>Crema X | Piel Mixta | AcmeCo</g:title>"));
}

#[test]
fn test_missing_id_column_aborts() {
    let csv = "Codigo,Nombre\n1,Crema X\n";
    let (tmp, config_path) = setup_test_env("Productos.csv", csv.as_bytes(), "");
    let (_, stderr, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("'Id'"), "stderr={}", stderr);
    assert!(!tmp.path().join("out/output_feed.xml").exists());
}

#[test]
fn test_passthrough_on_reference_error() {
    let csv = "Codigo,Nombre\n1,Crema X\n";
    let (tmp, config_path) =
        setup_test_env("Productos.csv", csv.as_bytes(), r#"on_error = "passthrough""#);
    let (stdout, stderr, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success, "stderr={}", stderr);
    assert!(stderr.contains("warning"));
    assert!(stdout.contains("enriched: 0"));
    assert_eq!(read_output(&tmp), FEED);
}

#[test]
fn test_custom_id_column() {
    let csv = "Codigo,Nombre\n1,Crema Nueva\n";
    let (tmp, config_path) = setup_test_env(
        "Productos.csv",
        csv.as_bytes(),
        "\n[reference.columns]\nid = \"Codigo\"",
    );
    let (_, stderr, success) = run_cli(&config_path, &["run", "--progress", "off"]);
    assert!(success, "stderr={}", stderr);
    assert!(read_output(&tmp).contains("<g:title>Crema Nueva</g:title>"));
}

#[test]
fn test_verify_reports_separators() {
    let (_tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");
    run_cli(&config_path, &["run", "--progress", "off"]);

    let (stdout, _, success) = run_cli(&config_path, &["verify", "1"]);
    assert!(success);
    assert!(stdout.contains("Crema X | Piel Grasa | AcmeCo | Cuidado Piel"));
    assert!(stdout.contains("Pipe at 8: ' ' | ' '"));
    assert!(stdout.contains("PASS"));

    let (stdout, _, success) = run_cli(&config_path, &["verify", "12345"]);
    assert!(success);
    assert!(stdout.contains("not found"));
}

#[test]
fn test_inspect_lists_columns_and_usage() {
    let (_tmp, config_path) = setup_test_env("Productos.csv", REFERENCE_CSV.as_bytes(), "");

    let (stdout, _, success) = run_cli(&config_path, &["inspect"]);
    assert!(success);
    assert!(stdout.contains("- Descripcion"));
    assert!(stdout.contains("rows: 2"));

    let (stdout, _, success) = run_cli(&config_path, &["inspect", "--usage", "--rows", "5"]);
    assert!(success);
    assert!(stdout.contains("Found 2 rows"));
    assert!(stdout.contains("usage: Piel Grasa"));
    assert!(stdout.contains("usage: Cabello Seco"));
}
