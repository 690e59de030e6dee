//! OpenAPI document generator
//!
//! Prints the PAGEWRIGHT OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p pagewright-api --bin generate-openapi --features openapi > openapi.json

use pagewright_api::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let doc = ApiDoc::openapi();

    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI document: {}", e);
            std::process::exit(1);
        }
    }
}
