// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

mod args;
mod workload;

use crate::args::Args;
use clap::Parser;
use eyre::WrapErr;
use mperf::{BenchRunner, Session};
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

fn init_tracing(debug: bool) -> Result<(), eyre::Report> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::new(if debug { "debug" } else { "info" }),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("Unable to configure logging: {e}"))
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.debug)?;

    let config = args.load_config()?;
    debug!(?config, "loaded configuration");

    let mut session = Session::new(config.session.clone())
        .wrap_err_with(|| format!("Unable to create session {:?}", config.session.name))?;
    let mut runner = BenchRunner::new(config.bench)?;
    let mut buffer = vec![0.0f32; args.size];

    for (i, workload) in args.workloads.iter().enumerate() {
        let report_name = format!("{} Report{}", session.name(), i + 1);
        session.add_custom_metric("workload", workload.name());
        session.add_custom_metric("size", args.size.to_string());
        let outcome = runner
            .run(&mut session, &report_name, || workload.run(&mut buffer))
            .wrap_err_with(|| format!("Benchmark {report_name:?} failed"))?;
        debug!(
            workload = workload.name(),
            iterations = outcome.iterations,
            "workload complete"
        );
    }

    if let Some(path) = &runner.config().report_path {
        info!("Reports appended to {}", path.display());
    }
    Ok(())
}
