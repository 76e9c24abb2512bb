//! HTML pages

use fuelforge_common::config::AppConfig;
use fuelforge_ingestion::sheets::{escape_html, render_table};
use fuelforge_ingestion::Report;

const STYLESHEET: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="stylesheet" href="{STYLESHEET}">
</head>
<body>
<nav class="navbar navbar-dark bg-dark mb-4">
  <div class="container">
    <a class="navbar-brand" href="/">FuelForge</a>
    <a class="nav-link text-light" href="/deployment">Deployment</a>
  </div>
</nav>
<main class="container">
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Upload form for invoices and shunt dockets
pub fn index_page() -> String {
    layout(
        "Fuel Invoice Processor",
        r#"<h1>Fuel Invoice Processor</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <div class="mb-3">
    <label class="form-label" for="invoices">Invoices (PDF)</label>
    <input class="form-control" type="file" id="invoices" name="invoices" accept=".pdf" multiple>
  </div>
  <div class="mb-3">
    <label class="form-label" for="dockets">Shunt dockets (PDF)</label>
    <input class="form-control" type="file" id="dockets" name="dockets" accept=".pdf" multiple>
  </div>
  <button class="btn btn-primary" type="submit">Upload and process</button>
</form>"#,
    )
}

/// The three sheets plus the CSV download link
pub fn results_page(report: &Report) -> String {
    let body = format!(
        r#"<h1>Processing Results</h1>
<p><a class="btn btn-success" href="/download_combined_csv">Download combined CSV</a>
<a class="btn btn-secondary" href="/">Process more files</a></p>
<h2>Checklist Sheet</h2>
{checklist}
<h2>Data Sheet</h2>
{data_sheet}
<h2>Fuel Tracking Sheet</h2>
{fuel_tracking}"#,
        checklist = render_table(&report.checklist),
        data_sheet = render_table(&report.data_sheet),
        fuel_tracking = render_table(&report.fuel_tracking),
    );
    layout("Processing Results", &body)
}

/// Notes on how the running instance is deployed
pub fn deployment_page(config: &AppConfig) -> String {
    let ocr = if config.ocr.enabled {
        format!(
            "enabled, <code>{}</code> with language <code>{}</code>",
            escape_html(&config.ocr.tesseract_cmd),
            escape_html(&config.ocr.language)
        )
    } else {
        "disabled".to_string()
    };

    let body = format!(
        r#"<h1>Deployment</h1>
<p>FuelForge ships as a container image built from the repository <code>Dockerfile</code>.
The runtime image carries the <code>gateway</code> binary and the Tesseract OCR engine.</p>
<pre>docker build -t fuelforge .
docker run -p 5000:5000 -v "$PWD/knowledge:/app/knowledge" fuelforge</pre>
<table class="table">
  <tbody>
    <tr><th>Listen address</th><td><code>{host}:{port}</code></td></tr>
    <tr><th>Uploads directory</th><td><code>{uploads}</code></td></tr>
    <tr><th>Knowledge directory</th><td><code>{knowledge}</code> (<code>FinancialCalendar.csv</code>, <code>VendorLookup.csv</code>)</td></tr>
    <tr><th>Log file</th><td><code>{log_file}</code></td></tr>
    <tr><th>OCR</th><td>{ocr}</td></tr>
  </tbody>
</table>
<p>Settings are overridden with <code>APP__</code> environment variables,
for example <code>APP__SERVER__PORT=5000</code> or <code>APP__OCR__ENABLED=false</code>.</p>"#,
        host = escape_html(&config.server.host),
        port = config.server.port,
        uploads = escape_html(&config.storage.uploads_dir.display().to_string()),
        knowledge = escape_html(&config.storage.knowledge_dir.display().to_string()),
        log_file = escape_html(&config.log_file_path().display().to_string()),
        ocr = ocr,
    );
    layout("Deployment", &body)
}
