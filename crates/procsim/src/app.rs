use anyhow::Result;
use los_proc::LifecycleConfig;

use crate::cli::{Cli, Cmd};
use crate::scenarios;

pub fn run(cli: Cli) -> Result<()> {
    crate::logger::init(cli.log_level.into())?;
    let config = LifecycleConfig::new().with_max_pid(cli.max_pid);

    let report = match cli.cmd {
        Cmd::Tree { width, depth, code } => scenarios::tree(config, width, depth, code)?,
        Cmd::Orphans { count } => scenarios::orphans(config, count)?,
        Cmd::Zombies { count } => scenarios::zombies(config, count)?,
    };

    println!("{report}");
    Ok(())
}
