//! Load an export bundle over HTTP the way the page would and print what
//! it contains.
//!
//!     check-bundle https://example.org/voice/ --patch-export export/patch.export.json

use clap::Parser;

use voicechanger_web::bundle;
use voicechanger_web::fetch::HttpFetcher;
use voicechanger_web::BootstrapConfig;

#[derive(Parser, Debug)]
#[command(name = "check-bundle")]
#[command(about = "Check an RNBO export bundle served for the voice changer page", long_about = None)]
struct Args {
    /// Page URL the bundle paths are relative to
    base_url: String,

    /// Device description path
    #[arg(long, value_name = "PATH", default_value = "patch.export.json")]
    patch_export: String,

    /// Dependency list path
    #[arg(long, value_name = "PATH", default_value = "dependencies.json")]
    dependencies: String,

    /// Directory prefixed to dependency files
    #[arg(long, value_name = "DIR", default_value = "export/")]
    export_dir: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let fetcher = match HttpFetcher::new(&args.base_url) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    let config = BootstrapConfig {
        patch_export_url: args.patch_export,
        dependencies_url: args.dependencies,
        export_dir: args.export_dir,
        ..BootstrapConfig::default()
    };

    match bundle::inspect(&fetcher, &config).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                log::error!("cannot print report: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
