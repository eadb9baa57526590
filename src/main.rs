use log::debug;
use recipe_extract::{run_extraction_pipeline, ExtractError};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    // Get the URL from command-line arguments
    let Some(url) = env::args().nth(1) else {
        eprintln!("Usage: recipe-extract <url>");
        return ExitCode::FAILURE;
    };

    match run_extraction_pipeline(&url).await {
        Ok(recipe) => {
            debug!("{:#?}", recipe);
            match serde_json::to_string_pretty(&recipe) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Failed to serialize recipe: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(ExtractError::Failed(failure)) => {
            match serde_json::to_string_pretty(&failure) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{failure}"),
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
