mod cli;
mod config;

use std::io::IsTerminal;

use aid_installer::{InstallOutcome, Installer};
use anyhow::Result;
use clap::Parser;
use log::{error, info};

fn main() {
    let args = cli::Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(args)) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main(args: cli::Args) -> Result<()> {
    let cfg = match config::InstallerConfig::load(args.config.as_deref()) {
        Ok(cfg) => cfg.with_overrides(&args),
        Err(e) => {
            error!("Installation failed: {e:#}");
            let fallback = config::InstallerConfig::default()
                .with_overrides(&args)
                .into_install_options(&args, false);
            eprintln!("\n{}", Installer::new(fallback).remediation());
            std::process::exit(1);
        }
    };
    let show_progress = !args.quiet && std::io::stderr().is_terminal();
    let installer = Installer::new(cfg.into_install_options(&args, show_progress));

    match installer.run().await {
        Ok(InstallOutcome::AlreadyInstalled(binary)) => {
            info!(
                "aid {} is up to date at {}",
                binary.reported_version.as_deref().unwrap_or("?"),
                binary.path.display()
            );
            Ok(())
        }
        Ok(InstallOutcome::Installed(binary)) => {
            info!("AI Distiller installed successfully: {}", binary.path.display());
            Ok(())
        }
        Ok(InstallOutcome::Planned(plan)) => {
            println!("platform: {}", plan.platform);
            println!("url:      {}", plan.target.download_url);
            println!("binary:   {}", plan.binary_path.display());
            Ok(())
        }
        Err(e) => {
            error!("Installation failed: {:#}", anyhow::Error::new(e));
            eprintln!("\n{}", installer.remediation());
            std::process::exit(1);
        }
    }
}
