use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompShell};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use streamload::commands::{charts, probe, run, suite, TargetArgs};
use streamload::logging;
use streamload::scenario::Protocol;

#[derive(Parser)]
#[command(name = "streamload")]
#[command(version)]
#[command(about = "Load tests a music-streaming API over REST, GraphQL, SOAP and gRPC")]
#[command(long_about = None)]
struct Cli {
    /// Increase diagnostic logging (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one load test scenario
    Run {
        #[command(flatten)]
        target: TargetArgs,
        /// Scenario to run (rest, graphql, soap, grpc, browse, catalog)
        #[arg(long = "scenario", short = 's', default_value = "rest")]
        scenario: String,
        /// Number of concurrent virtual users
        #[arg(long = "users", short = 'u')]
        users: Option<u32>,
        /// Users started per second
        #[arg(long = "spawn-rate", short = 'r')]
        spawn_rate: Option<f64>,
        /// Test duration (e.g. "60s", "5m")
        #[arg(long = "run-time", short = 't')]
        run_time: Option<String>,
        /// Progress report interval
        #[arg(long = "report-interval")]
        report_interval: Option<String>,
        /// Directory for the CSV result files
        #[arg(long = "results-dir")]
        results_dir: Option<PathBuf>,
        /// CSV file name prefix (defaults to <scenario>_<users>_users)
        #[arg(long = "csv-prefix")]
        prefix: Option<String>,
        /// Also write a JSON run report
        #[arg(long = "output")]
        output: Option<PathBuf>,
        /// Exit with an error when the failure percentage is above this value
        #[arg(long = "max-failure-rate")]
        max_failure_rate: Option<f64>,
    },
    /// Run every protocol against every user count
    Suite {
        #[command(flatten)]
        target: TargetArgs,
        /// Protocols to test (repeatable)
        #[arg(long = "protocol", short = 'p', value_enum)]
        protocols: Vec<Protocol>,
        /// User counts to test (repeatable)
        #[arg(long = "users", short = 'u')]
        user_counts: Vec<u32>,
        /// Users started per second
        #[arg(long = "spawn-rate", short = 'r')]
        spawn_rate: Option<f64>,
        /// Duration of each run
        #[arg(long = "run-time", short = 't')]
        run_time: Option<String>,
        /// Pause between runs
        #[arg(long = "cooldown")]
        cooldown: Option<String>,
        /// Directory for the CSV result files
        #[arg(long = "results-dir")]
        results_dir: Option<PathBuf>,
        /// Generate charts once the matrix finishes
        #[arg(long = "charts")]
        charts: bool,
        /// Directory for charts and reports
        #[arg(long = "charts-dir")]
        charts_dir: Option<PathBuf>,
    },
    /// Build comparison charts and reports from existing results
    Charts {
        /// Configuration file (defaults to ./streamload.yaml when present)
        #[arg(long = "config", short = 'c')]
        config: Option<PathBuf>,
        /// Directory holding the CSV result files
        #[arg(long = "results-dir")]
        results_dir: Option<PathBuf>,
        /// Directory for charts and reports
        #[arg(long = "charts-dir")]
        charts_dir: Option<PathBuf>,
        /// Protocols to include (repeatable)
        #[arg(long = "protocol", short = 'p', value_enum)]
        protocols: Vec<Protocol>,
        /// User counts to include (repeatable)
        #[arg(long = "users", short = 'u')]
        user_counts: Vec<u32>,
    },
    /// Send each request of a scenario once and show the responses
    Probe {
        #[command(flatten)]
        target: TargetArgs,
        /// Scenario to probe
        #[arg(long = "scenario", short = 's', default_value = "rest")]
        scenario: String,
        /// One line per request instead of request/response boxes
        #[arg(long = "quiet", short = 'q')]
        quiet: bool,
    },
    /// Generate shell completions (internal)
    #[command(hide = true)]
    Completions {
        /// Shell: bash, zsh, fish
        shell: String,
    },
    /// Generate man page (internal)
    #[command(hide = true)]
    Man,
}

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    let banner = format!(
        r#"
    ┌─┐┌┬┐┬─┐┌─┐┌─┐┌┬┐┬  ┌─┐┌─┐┌┬┐
    └─┐ │ ├┬┘├┤ ├─┤│││││  │ │├─┤ ││   streamload v{version}
    └─┘ ┴ ┴└─└─┘┴ ┴┴ ┴┴─┘└─┘┴ ┴─┴┘   REST · GraphQL · SOAP · gRPC
"#
    );

    if atty::is(atty::Stream::Stdout) {
        println!("{}", banner.cyan());
    } else {
        println!("streamload v{} - REST, GraphQL, SOAP and gRPC load tests", version);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Print banner for user-facing commands only
    if !matches!(
        cli.command,
        Commands::Probe { quiet: true, .. } | Commands::Completions { .. } | Commands::Man
    ) {
        print_banner();
    }

    match cli.command {
        Commands::Run {
            target,
            scenario,
            users,
            spawn_rate,
            run_time,
            report_interval,
            results_dir,
            prefix,
            output,
            max_failure_rate,
        } => {
            run::handle_run(run::RunOptions {
                target,
                scenario,
                users,
                spawn_rate,
                run_time,
                report_interval,
                results_dir,
                prefix,
                output,
                max_failure_rate,
            })
            .await?;
        }
        Commands::Suite {
            target,
            protocols,
            user_counts,
            spawn_rate,
            run_time,
            cooldown,
            results_dir,
            charts,
            charts_dir,
        } => {
            suite::handle_suite(suite::SuiteOptions {
                target,
                protocols,
                user_counts,
                spawn_rate,
                run_time,
                cooldown,
                results_dir,
                charts,
                charts_dir,
            })
            .await?;
        }
        Commands::Charts {
            config,
            results_dir,
            charts_dir,
            protocols,
            user_counts,
        } => {
            charts::handle_charts(charts::ChartsOptions {
                config,
                results_dir,
                charts_dir,
                protocols,
                user_counts,
            })
            .await?;
        }
        Commands::Probe {
            target,
            scenario,
            quiet,
        } => {
            probe::handle_probe(target, scenario, quiet).await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            let sh = match shell.as_str() {
                "bash" => CompShell::Bash,
                "zsh" => CompShell::Zsh,
                "fish" => CompShell::Fish,
                "powershell" | "pwsh" => CompShell::PowerShell,
                "elvish" => CompShell::Elvish,
                other => {
                    eprintln!(
                        "Unsupported shell: {} (use bash|zsh|fish|powershell|elvish)",
                        other
                    );
                    std::process::exit(2);
                }
            };
            generate(sh, &mut cmd, name, &mut std::io::stdout());
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
