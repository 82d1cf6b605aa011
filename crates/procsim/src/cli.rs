use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use los_proc::LifecycleConfig;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "procsim")]
#[command(about = "Run process lifecycle scenarios on host threads and check for leaks")]
pub struct Cli {
    /// Most verbose log level printed to stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    /// Highest PID the allocator hands out.
    #[arg(long, default_value_t = LifecycleConfig::DEFAULT_MAX_PID, global = true)]
    pub max_pid: usize,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Build a fork tree. Every inner node waits for all of its children.
    Tree {
        /// Children per inner node.
        #[arg(long, default_value_t = 3)]
        width: usize,

        /// Levels below init.
        #[arg(long, default_value_t = 3)]
        depth: usize,

        /// Exit code of every node.
        #[arg(long, default_value_t = 7)]
        code: i32,
    },

    /// A parent exits before its children, which finish as orphans.
    Orphans {
        #[arg(long, default_value_t = 8)]
        count: usize,
    },

    /// A parent exits without reaping its exited children.
    Zombies {
        #[arg(long, default_value_t = 8)]
        count: usize,
    },
}
