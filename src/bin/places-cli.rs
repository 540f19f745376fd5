use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "places-cli")]
#[command(about = "Query a running location autocomplete gateway", long_about = None)]
struct Cli {
    /// Gateway base URL, including the route prefix in release mode.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Autocomplete a partial address
    Suggest { input: String },
    /// Coordinates of a place
    Geometry { place_id: String },
    /// Formatted address of a place
    Name { place_id: String },
    /// Liveness probe
    Health,
    /// Readiness verdict
    Ready,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Suggest { input } => client
            .get(format!("{}/location/suggestions", base))
            .query(&[("input", input)]),
        Commands::Geometry { place_id } => client
            .get(format!("{}/location/geometry", base))
            .query(&[("place_id", place_id)]),
        Commands::Name { place_id } => client
            .get(format!("{}/location/name", base))
            .query(&[("place_id", place_id)]),
        Commands::Health => client.get(format!("{}/health", base)),
        Commands::Ready => client.get(format!("{}/health/ready", base)),
    };

    let ok = print_response(request.send().await?).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
    }
    Ok(status.is_success())
}
