// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use nodedash_app::{DashboardState, JoinParams};
use nodedash_source::Client;
use nodedash_tui::DashboardRuntime;
use runtime::SourceRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    if let Some(url) = &options.join_url {
        let params = JoinParams::from_url(url)?;
        print!("{}", join_summary(&params));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `nodedash --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_file = config.log_file()?;
    logging::init(config.log_level(), &log_file).with_context(|| {
        format!(
            "set up logging at {}; set [log].file to a writable path",
            log_file.display()
        )
    })?;

    let mut runtime = build_runtime(&options, &config)?;
    if options.check_only {
        let count = runtime
            .probe()
            .with_context(|| format!("check source {}", runtime.source_label()))?;
        println!("ok: {count} machines from {}", runtime.source_label());
        return Ok(());
    }

    let mut state = DashboardState::with_sort(config.sort(), config.page_size());
    info!(
        config = %options.config_path.display(),
        source = %runtime.source_label(),
        "starting dashboard"
    );
    nodedash_tui::run_app(&mut state, &mut runtime)
}

fn build_runtime(options: &CliOptions, config: &Config) -> Result<SourceRuntime> {
    if options.demo {
        return Ok(SourceRuntime::demo());
    }

    if let Some(path) = options.machines_file.clone().or_else(|| config.machines_file()) {
        return Ok(SourceRuntime::File(path));
    }

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [source] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    Ok(SourceRuntime::Http(client))
}

fn join_summary(params: &JoinParams) -> String {
    let flake = if params.needs_flake_input() {
        "(none; the join form asks for a flake url)"
    } else {
        params.flake_url.as_str()
    };
    format!("flake: {flake}\nattr: {}\n", params.flake_attr)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    machines_file: Option<PathBuf>,
    join_url: Option<String>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        machines_file: None,
        join_url: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--machines-file" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--machines-file requires a JSON file path"))?;
                options.machines_file = Some(PathBuf::from(value.as_ref()));
            }
            "--join" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--join requires a join url"))?;
                options.join_url = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("nodedash: machine fleet dashboard");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with a seeded demo fleet (in-memory)");
    println!("  --machines-file <path>   Read machines from a JSON file instead of the web API");
    println!("  --join <url>             Print the flake and attribute carried by a join link");
    println!("  --check                  Validate config and probe the machine source");
    println!("  --help                   Show this help");
}
