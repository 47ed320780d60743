pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod hooks;
pub mod matrix;
pub mod render;
pub mod session;
pub mod task;
pub mod validate;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::split_rc_overrides(&raw_args);
    let cli = cli::GlobalCli::parse_from(pre.clap_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting zenmatrix CLI"
    );
    debug!(?pre.overrides, "positional rc overrides");

    let mut cfg = config::Config::load(cli.rc_file.as_deref())?;
    cfg.apply_overrides(pre.overrides.into_iter().chain(cli.rc_overrides));

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let mut store = session::StateDir::open(&data_dir)?;

    let api_location = cfg
        .get("api.location")
        .unwrap_or_else(|| "http://localhost:5000".to_string());
    let api = api::ApiClient::new(&api_location);

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest);

    commands::dispatch(&mut store, &cfg, &mut renderer, &api, inv)
}
