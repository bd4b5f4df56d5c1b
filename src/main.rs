mod app;
mod cache;
mod gallery;
mod infra;
mod manifest;
mod ui;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use infra::config::AppConfig;
use infra::http::ReqwestTransport;
use manifest::loader::ManifestLoader;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_args(pico_args::Arguments::from_env()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            print_usage();
            std::process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start async runtime: {error}");
            std::process::exit(1);
        }
    };
    let transport = Arc::new(ReqwestTransport::new());

    if config.check_only {
        let loader = ManifestLoader::new(transport, config.manifest_url());
        match runtime.block_on(loader.load()) {
            Ok(manifest) => {
                for category in manifest.categories() {
                    println!(
                        "{}\t{}\t{}",
                        category.folder_key,
                        category.display_name,
                        category.assets.as_ref().map_or(0, Vec::len)
                    );
                }
            }
            Err(error) => {
                eprintln!("{}", error.user_message());
                error!(%error, "manifest check failed");
                std::process::exit(1);
            }
        }
        return;
    }

    info!(base_url = %config.base_url, "opening gallery");
    if let Err(error) = ui::app_shell::launch_gallery_window(config, transport, runtime.handle().clone()) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("usage:");
    println!("  figurinhas [--base-url URL] [--manifest PATH] [--asset-root DIR]");
    println!("             [--delay-ms N] [--download-dir DIR] [--check]");
}
