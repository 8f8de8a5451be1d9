use std::path::PathBuf;

use utoipa::OpenApi;

/// Writes the OpenAPI document to the path given as the first argument, or to
/// `specs/realtime-api.json` at the workspace root.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = std::env::args_os().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../specs/realtime-api.json")
    });

    let doc = realtime_api::routes::ApiDoc::openapi().to_pretty_json()?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out, doc)?;
    println!("Wrote {}", out.display());
    Ok(())
}
