mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command};
use sosdisk::fs::build_tree;
use sosdisk::image::open_image;
use sosdisk::listing::{render, render_json, RenderOptions};

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut image = open_image(&args.image, args.sector_order())
        .with_context(|| format!("failed to open {}", args.image.display()))?;
    let tree = build_tree(&mut image).context("not a readable SOS/ProDOS volume")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Ls {
            recursive,
            long,
            json,
        } => {
            if json {
                render_json(&tree, &mut out)?;
            } else {
                let options = RenderOptions { recursive, long };
                render(&tree, &mut image, &options, &mut out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
