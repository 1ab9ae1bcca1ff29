use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod catalog;
mod inspect;
mod replay;

pub use catalog::Catalog;
pub use inspect::Inspect;
pub use replay::Replay;

/// alertctl examines journals of persisted alert state.
#[derive(Debug, clap::Parser)]
#[clap(author, about, version)]
pub struct Cli {
    #[clap(subcommand)]
    cmd: Command,

    #[clap(flatten)]
    pub log: LogArgs,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Print each frame of a journal as a line of JSON.
    Inspect(Inspect),
    /// Bootstrap the alerts of a catalog from a journal, and report what
    /// state would be recovered for each.
    ///
    /// Nothing is written: replay is a dry run of an evaluator's startup.
    Replay(Replay),
}

#[derive(Debug, clap::Args)]
pub struct LogArgs {
    /// Default level of logs written to stderr. RUST_LOG directives take precedence.
    #[clap(long = "log.level", default_value = "warn", env = "ALERTCTL_LOG_LEVEL")]
    pub level: LevelFilter,
    #[clap(long = "log.format", value_enum, default_value = "text", env = "ALERTCTL_LOG_FORMAT")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

pub fn init_logging(args: &LogArgs) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(args.level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match args.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        match self.cmd {
            Command::Inspect(inspect) => inspect.run(&mut out).await,
            Command::Replay(replay) => replay.run(&mut out).await,
        }
    }
}

/// Parse a `--cutoff` value relative to `now_sec`: "now", an RFC 3339
/// timestamp, or a duration before now (like "15m").
pub fn parse_cutoff(value: &str, now_sec: i64) -> anyhow::Result<i64> {
    if value == "now" {
        return Ok(now_sec);
    }
    if let Ok(ts) = humantime::parse_rfc3339_weak(value) {
        let since_epoch = ts
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| anyhow::anyhow!("cutoff {value} is before the epoch"))?;
        return Ok(since_epoch.as_secs() as i64);
    }
    match humantime::parse_duration(value) {
        Ok(ago) => Ok(now_sec - ago.as_secs() as i64),
        Err(_) => anyhow::bail!(
            "invalid cutoff {value:?}: expected 'now', an RFC 3339 timestamp, or a duration"
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_parse_cutoff() {
        let now = 1_700_000_000;

        assert_eq!(parse_cutoff("now", now).unwrap(), now);
        assert_eq!(parse_cutoff("15m", now).unwrap(), now - 900);
        assert_eq!(
            parse_cutoff("2023-11-14T22:13:20Z", now).unwrap(),
            1_700_000_000
        );
        assert_eq!(
            parse_cutoff("yesterday", now).unwrap_err().to_string(),
            "invalid cutoff \"yesterday\": expected 'now', an RFC 3339 timestamp, or a duration"
        );
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "alertctl",
            "--log.level",
            "debug",
            "--log.format",
            "json",
            "replay",
            "--journal",
            "a.journal",
            "--catalog",
            "alerts.yaml",
            "--read-timeout",
            "250ms",
        ])
        .unwrap();

        assert_eq!(cli.log.level, LevelFilter::DEBUG);
        assert_eq!(cli.log.format, LogFormat::Json);

        let Command::Replay(replay) = cli.cmd else {
            panic!("expected replay")
        };
        assert_eq!(replay.cutoff, "now");
        assert_eq!(Duration::from(replay.read_timeout), Duration::from_millis(250));
    }
}
