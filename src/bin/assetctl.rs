use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use game_asset_api::models::{AssetType, GameStyle, GenerationRequest, GenerationResponse};
use game_asset_api::utils::image_codec::decode_base64_image;
use reqwest::Client;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "assetctl", about = "CLI for the game asset generation service", version)]
struct Cli {
    /// Base URL of a running service
    #[arg(global = true, long, env = "ASSET_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show service health and whether the pipeline is loaded
    Health,
    /// List art styles
    Styles,
    /// List asset types
    AssetTypes,
    /// Generate one asset
    Generate {
        /// Text prompt
        #[arg(long)]
        prompt: String,
        /// Asset type, e.g. character, weapon, icon
        #[arg(long, value_parser = parse_asset_type)]
        asset_type: AssetType,
        /// Art style, e.g. pixel_art, anime, fantasy
        #[arg(long, value_parser = parse_game_style)]
        style: GameStyle,
        /// Negative prompt
        #[arg(long)]
        negative_prompt: Option<String>,
        /// Width
        #[arg(long, default_value_t = 512)]
        width: u32,
        /// Height
        #[arg(long, default_value_t = 512)]
        height: u32,
        /// Guidance scale
        #[arg(long, default_value_t = 7.5)]
        guidance_scale: f32,
        /// Inference steps
        #[arg(long, default_value_t = 50)]
        steps: u32,
        /// Seed, may be negative
        #[arg(long, allow_negative_numbers = true)]
        seed: Option<i64>,
        /// Images per call
        #[arg(long, alias = "batchsize", default_value_t = 1)]
        batch_size: u32,
        /// Ask for a transparent background
        #[arg(long)]
        transparent: bool,
        /// Directory to write PNGs into
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },
    /// Submit a JSON array of requests to /batch-generate
    Batch {
        /// File holding the JSON array
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// Directory to write PNGs into
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },
}

fn parse_asset_type(s: &str) -> Result<AssetType, String> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|_| {
        let known: Vec<&str> = AssetType::ALL.iter().map(|a| a.as_str()).collect();
        format!("unknown asset type '{}', expected one of: {}", s, known.join(", "))
    })
}

fn parse_game_style(s: &str) -> Result<GameStyle, String> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|_| {
        let known: Vec<&str> = GameStyle::ALL.iter().map(|g| g.as_str()).collect();
        format!("unknown style '{}', expected one of: {}", s, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load env and parse CLI
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let base = cli.api_url.trim_end_matches('/').to_string();
    let client = Client::new();

    match cli.command {
        Commands::Health => print_json(get_json(&client, &format!("{}/health", base)).await?),
        Commands::Styles => print_json(get_json(&client, &format!("{}/styles", base)).await?),
        Commands::AssetTypes => print_json(get_json(&client, &format!("{}/asset-types", base)).await?),
        Commands::Generate {
            prompt, asset_type, style, negative_prompt,
            width, height, guidance_scale, steps, seed, batch_size,
            transparent, out,
        } => {
            let mut request = GenerationRequest::new(prompt, asset_type, style);
            request.negative_prompt = negative_prompt;
            request.width = width;
            request.height = height;
            request.guidance_scale = guidance_scale;
            request.num_inference_steps = steps;
            request.seed = seed;
            request.batch_size = batch_size;
            request.transparent_background = transparent;
            if let Err(e) = request.validate() {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }

            let res = client.post(format!("{}/generate", base)).json(&request).send().await?;
            if !res.status().is_success() {
                eprintln!("Error: {} {}", res.status(), res.text().await.unwrap_or_default());
                std::process::exit(1);
            }
            let response: GenerationResponse = res.json().await?;
            save_response(&response, &out).await
        }
        Commands::Batch { file, out } => {
            let data = tokio::fs::read_to_string(&file).await?;
            let items: Value = serde_json::from_str(&data)?;
            if !items.is_array() {
                eprintln!("{} must hold a JSON array of requests", file.display());
                std::process::exit(2);
            }
            let res = client.post(format!("{}/batch-generate", base)).json(&items).send().await?;
            if !res.status().is_success() {
                eprintln!("Error: {} {}", res.status(), res.text().await.unwrap_or_default());
                std::process::exit(1);
            }
            let body: Value = res.json().await?;
            let results: Vec<GenerationResponse> =
                serde_json::from_value(body.get("results").cloned().unwrap_or(Value::Array(vec![])))?;
            for response in &results {
                save_response(response, &out).await?;
            }
            Ok(())
        }
    }
}

async fn get_json(client: &Client, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    if !res.status().is_success() {
        return Err(format!("{} returned {}", url, res.status()).into());
    }
    Ok(res.json().await?)
}

fn print_json(v: Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&v)?);
    Ok(())
}

async fn save_response(response: &GenerationResponse, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !response.is_completed() {
        let reason = response.metadata.get("error").and_then(|v| v.as_str()).unwrap_or("unknown error");
        eprintln!("{}: failed: {}", response.request_id, reason);
        return Ok(());
    }
    tokio::fs::create_dir_all(out).await?;
    for (i, b64) in response.images.iter().enumerate() {
        // Round-trip through the decoder so a corrupt payload is caught here.
        let img = decode_base64_image(b64)?;
        let path = out.join(format!("{}_{}.png", response.request_id, i));
        img.save(&path)?;
        println!("Saved {} ({}x{})", path.display(), img.width(), img.height());
    }
    Ok(())
}
