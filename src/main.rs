// ABOUTME: Main entry point for the deckfold program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use clap::{Args, Parser, Subcommand};
use deckfold::assets::ThemeAsset;
use deckfold::{BuildOptions, Config, WatchConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the whole site from a directory of markdown decks
    Build(BuildArgs),

    /// Build a single presentation page
    Page(PageArgs),

    /// Dump the normalized model for one presentation as JSON
    Model(ModelArgs),

    /// Watch sources, rebuild on change, optionally serve a preview
    Watch(WatchArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Directory containing presentation markdown files
    #[arg(short, long)]
    source: PathBuf,

    /// Output directory for the generated site
    #[arg(short, long)]
    output: PathBuf,

    /// CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Option<Vec<String>>,

    /// JavaScript files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    js: Option<Vec<String>>,

    /// Mode for CSS/JS: 'embed' to embed content or 'link' to reference
    #[arg(long, default_value = "embed")]
    mode: String,
}

#[derive(Args)]
struct PageArgs {
    /// Path to the markdown file
    #[arg(short, long)]
    input: PathBuf,

    /// Path to output HTML file
    #[arg(short, long)]
    output: PathBuf,

    /// CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Option<Vec<String>>,

    /// JavaScript files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    js: Option<Vec<String>>,

    /// Mode for CSS/JS: 'embed' to embed content or 'link' to reference
    #[arg(long, default_value = "embed")]
    mode: String,
}

#[derive(Args)]
struct ModelArgs {
    /// Path to the markdown file
    #[arg(short, long)]
    input: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Directory containing presentation markdown files
    #[arg(short, long)]
    source: PathBuf,

    /// Output directory for the generated site
    #[arg(short, long)]
    output: PathBuf,

    /// CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Option<Vec<String>>,

    /// JavaScript files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    js: Option<Vec<String>>,

    /// Serve the output directory over HTTP
    #[arg(long)]
    serve: bool,

    /// Port for the preview server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Debounce time in milliseconds
    #[arg(long, default_value_t = 500)]
    debounce: u64,
}

fn collect_assets(
    css: &Option<Vec<String>>,
    js: &Option<Vec<String>>,
    config: &Config,
) -> (Vec<ThemeAsset>, Vec<ThemeAsset>) {
    let css_assets = match css {
        Some(paths) => paths.iter().map(|p| ThemeAsset::css(p)).collect(),
        None => vec![ThemeAsset::css(&config.default_css)],
    };
    let js_assets = match js {
        Some(paths) => paths.iter().map(|p| ThemeAsset::js(p)).collect(),
        None => vec![ThemeAsset::js(&config.default_js)],
    };
    (css_assets, js_assets)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Build(args)) => {
            println!("Building site from {:?}...", args.source);
            let mut config = Config::from_env();
            if args.mode == "link" {
                config.embed_resources = false;
            }
            let (css, js) = collect_assets(&args.css, &args.js, &config);
            let options = BuildOptions {
                source_dir: args.source.clone(),
                output_dir: args.output.clone(),
                css,
                js,
            };
            deckfold::build_site(&options, &config).map(|report| {
                println!(
                    "Site built: {} presentations, {} failed, {} warnings",
                    report.built.len(),
                    report.failed.len(),
                    report.warning_count
                );
                for (path, error) in &report.failed {
                    eprintln!("  failed: {:?}: {}", path, error);
                }
            })
        }
        Some(Commands::Page(args)) => {
            println!("Building page from {:?}...", args.input);
            let mut config = Config::from_env();
            if args.mode == "link" {
                config.embed_resources = false;
            }
            let (css, js) = collect_assets(&args.css, &args.js, &config);
            deckfold::build_page(&args.input, &args.output, &css, &js, &config).map(|slides| {
                println!("Page built with {} slides: {:?}", slides, args.output);
            })
        }
        Some(Commands::Model(args)) => deckfold::parse_presentation_file(&args.input)
            .and_then(|outcome| {
                let json = if args.pretty {
                    outcome.model.to_json_pretty()?
                } else {
                    outcome.model.to_json()?
                };
                println!("{}", json);
                Ok(())
            }),
        Some(Commands::Watch(args)) => {
            let config = Config::from_env();
            let (css, js) = collect_assets(&args.css, &args.js, &config);
            let watch_config = WatchConfig {
                build: BuildOptions {
                    source_dir: args.source.clone(),
                    output_dir: args.output.clone(),
                    css,
                    js,
                },
                debounce_ms: args.debounce,
                serve: args.serve,
                port: args.port,
            };
            deckfold::watch_site(watch_config, &config)
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
