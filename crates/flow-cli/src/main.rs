//! `flow-board`: formats Flow contributions from an entity dump

mod config;
mod feed;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::CliConfig;
use feed::LineRenderer;
use flow_actions::ActionTaxonomy;
use flow_formatter::{ContributionsFormatter, Formatter, FormatterConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn cli() -> Command {
    Command::new("flow-board")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Flow board entity formatter")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("contributions")
                .about("Print one formatted line per revision in a dump")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON entity dump (overrides the config file)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output entries as JSON"),
                ),
        )
        .subcommand(Command::new("taxonomy").about("List change types and legacy aliases"))
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs.unwrap_or(false) {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn contributions(config: &CliConfig, args: &ArgMatches) -> Result<()> {
    let Some(input) = args.get_one::<PathBuf>("input").or(config.input.as_ref()) else {
        bail!("no input dump: pass --input or set `input` in the config file");
    };
    let entities = feed::load_dump(input)?;
    let rows = feed::rows_of(&entities);
    info!(entities = entities.len(), rows = rows.len(), "loaded dump");

    let mut formatter_config = FormatterConfig::new();
    if let Some(namespace) = config.topic_namespace {
        formatter_config = formatter_config.with_topic_namespace(namespace);
    }
    if let Some(path) = &config.script_path {
        formatter_config = formatter_config.with_script_path(path.clone());
    }
    let formatter = Formatter::builder(Arc::new(feed::storage_of(&entities)))
        .config(formatter_config)
        .build();

    let entries = ContributionsFormatter::new(Arc::new(formatter))
        .format_rows(&rows, &config.viewer())
        .await
        .context("formatting contributions")?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    let renderer = LineRenderer::new(config.line_template())?;
    for entry in &entries {
        println!("{}", renderer.render(entry)?);
    }
    Ok(())
}

fn taxonomy() {
    let taxonomy = ActionTaxonomy::with_defaults();
    let mut change_types: Vec<&str> = taxonomy.change_types().collect();
    change_types.sort_unstable();
    for name in change_types {
        println!("{name}");
    }
    for (alias, target) in taxonomy.aliases() {
        println!("{alias} -> {target}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    init_tracing(&config);
    run(&config, &matches).await
}

async fn run(config: &CliConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("contributions", args)) => contributions(config, args).await,
        Some(("taxonomy", _)) => {
            taxonomy();
            Ok(())
        }
        Some((name, _)) => bail!("unknown subcommand `{name}`"),
        None => bail!("no subcommand given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_config_flag_follows_subcommand() {
        let matches = cli()
            .try_get_matches_from(["flow-board", "contributions", "--config", "flow.toml", "--json"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("flow.toml"))
        );
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "contributions");
        assert!(args.get_flag("json"));
    }

    #[tokio::test]
    async fn unknown_subcommand_is_an_error() {
        let matches = Command::new("flow-board")
            .subcommand(Command::new("export"))
            .try_get_matches_from(["flow-board", "export"])
            .unwrap();
        let err = run(&CliConfig::default(), &matches).await.unwrap_err();
        assert!(err.to_string().contains("export"));

        let bare = Command::new("flow-board").try_get_matches_from(["flow-board"]).unwrap();
        assert!(run(&CliConfig::default(), &bare).await.is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["flow-board"]).is_err());
    }
}
