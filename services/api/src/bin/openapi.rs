//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI document of the quote feed API.
//!
//! Usage: `openapi [PATH]`. Writes `openapi.json` by default; `-` prints the
//! document to stdout instead so it can be piped into other tooling.

use api_lib::{error::ApiError, web::rest::ApiDoc};
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), ApiError> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let document = ApiDoc::openapi();
    let route_count = document.paths.paths.len();
    let rendered = document.to_pretty_json()?;

    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        writeln!(stdout)?;
    } else {
        std::fs::write(&target, rendered)?;
        eprintln!("Wrote {} documented routes to {}", route_count, target);
    }
    Ok(())
}
