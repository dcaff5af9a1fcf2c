use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "fetch-cli")]
#[command(about = "Command-line client for the fetch service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page through the service
    Fetch {
        /// Target page URL
        url: String,
    },
    /// Show the global recovery snapshot
    Stats,
    /// Show recovery stats for one origin
    Origin {
        /// Origin hostname (e.g. example.com)
        origin: String,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Fetch { url } => {
            let res = client
                .post(format!("{}/fetch-url", cli.server))
                .json(&serde_json::json!({ "url": url }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Stats => {
            let res = client
                .get(format!("{}/recovery-stats", cli.server))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Origin { origin } => {
            let res = client
                .get(format!("{}/recovery-stats/{}", cli.server, origin))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client
                .get(format!("{}/health", cli.server))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
