//! real-timer: ITIMER_REAL の遅延をスケジューリングポリシーごとに観測する
//!
//! 使用例: real-timer 1 0 2 0 r 10 0
//! 1秒後に最初の SIGALRM、以降2秒ごと。呼び出し元を SCHED_RR 優先度10にする。

use anyhow::{anyhow, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use sched_timer_probe::cli::{self, Cli};
use sched_timer_probe::{Harness, HarnessError};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Cli::parse();

    // ログは stderr へ（stdout はレポート表のみ）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    if args.list_policies {
        for line in cli::policy_listing() {
            println!("{}", line);
        }
        return Ok(());
    }

    let invocation = match args.invocation() {
        Ok(invocation) => invocation,
        Err(HarnessError::Argument(msg)) => {
            Cli::command().error(ErrorKind::ValueValidation, msg).exit()
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        timer = ?invocation.timer,
        scheduling = ?invocation.scheduling,
        "starting probe"
    );

    let harness = Harness::new(
        invocation.config,
        invocation.timer,
        invocation.scheduling,
        io::stdout(),
    );
    match harness.run() {
        Ok(never) => match never {},
        Err(err) => {
            // 計測を続けると以降のサンプルが壊れるので即終了
            eprintln!("real-timer: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}
