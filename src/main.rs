use std::path::Path;
use std::process::ExitCode;
use std::{env, fs};

use tracing::{error, info};

use backend_generator::erd;
use backend_generator::generator::generate_backend;
use backend_generator::routes_generator::EndpointSpec;
use backend_generator::Result;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let arguments: Vec<String> = env::args().collect();

    let Some(erd_path) = arguments.get(1) else {
        error!("usage: backend_generator <erd.json> [endpoints.json] [output-dir]");
        return ExitCode::FAILURE;
    };
    let endpoints_path = arguments.get(2);
    let default_path: String = "generated".into();
    let output_dir: &String = arguments.get(3).unwrap_or(&default_path);

    match run(erd_path, endpoints_path.map(String::as_str), output_dir) {
        Ok(count) => {
            info!(files = count, output = %output_dir, "generation complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "generation failed, no files written");
            ExitCode::FAILURE
        }
    }
}

fn run(erd_path: &str, endpoints_path: Option<&str>, output_dir: &str) -> Result<usize> {
    let raw = fs::read_to_string(erd_path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let document = erd::parse_document(value)?;

    let endpoints: Option<EndpointSpec> = match endpoints_path {
        Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => None,
    };

    let project = Path::new(erd_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("generated");

    let files = generate_backend(project, &document, endpoints.as_ref())?;
    files.write_all(Path::new(output_dir))?;

    Ok(files.len())
}
