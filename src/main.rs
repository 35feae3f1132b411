use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use spineshot::cli::CliArgs;
use spineshot::config::RenderOptions;
use spineshot::info::{build_report, print_report};
use spineshot::render::{RenderContext, SoftwareBackend, render_all};
use spineshot::runtime::Spine2dRuntime;

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Use eprintln instead of error! so fatal errors reach stderr
        // even though the logger writes to stdout
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = match CliArgs::try_parse() {
        Ok(cli) => cli,
        // --help and --version exit 0, usage errors exit 2 by default
        Err(e) if !e.use_stderr() => e.exit(),
        // Usage errors exit 1 like every other failure
        Err(e) => {
            e.print().context("failed to print usage error")?;
            std::process::exit(1);
        }
    };

    // Initialize logging before option resolution so its warnings show up
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .target(env_logger::Target::Stdout)
        .init();

    let options = RenderOptions::from_args(&cli)?;
    let runtime = Spine2dRuntime::new(options.runtime);

    if options.info {
        let report = build_report(&runtime, &options)?;
        return print_report(&report, options.info_json);
    }

    info!("spineshot v{}", env!("CARGO_PKG_VERSION"));

    let mut ctx = RenderContext::new(&options, SoftwareBackend::new(options.premultiplied_alpha));
    let written = render_all(&runtime, &mut ctx).with_context(|| {
        format!(
            "failed to render {}",
            options
                .skeleton
                .as_deref()
                .unwrap_or(options.atlas.as_path())
                .display()
        )
    })?;

    info!("Done! {} file(s) in {}", written.len(), options.out_dir.display());

    Ok(())
}
