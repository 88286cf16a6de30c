use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use formschema::{
    FormContext, FormOptions,
    form::{read_data_file, read_schema_file},
};
use serde_json::Value;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Options file (`.toml` or `.json`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Identifier of the root field
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Separator between identifier segments
    #[arg(long, global = true)]
    separator: Option<String>,

    /// Ceiling on nested schema expansion
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Input {
    /// JSON schema file
    #[arg(short, long)]
    schema: PathBuf,

    /// Form data file (`.toml` or `.json`)
    #[arg(short, long)]
    data: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the root schema resolved against the form data
    Resolve(Input),
    /// Print the field identifier tree
    Ids(Input),
    /// Print the data path tree
    Paths(Input),
    /// Print the form data completed with schema defaults
    Defaults(Input),
    /// Print the whole form state
    State(Input),
}

impl Commands {
    fn input(&self) -> &Input {
        match self {
            Self::Resolve(input)
            | Self::Ids(input)
            | Self::Paths(input)
            | Self::Defaults(input)
            | Self::State(input) => input,
        }
    }
}

impl Cli {
    fn options(&self) -> anyhow::Result<FormOptions> {
        let mut options = match &self.config {
            Some(path) => FormOptions::load(path)?,
            None => FormOptions::default(),
        };
        if let Some(prefix) = &self.prefix {
            options.id_prefix = prefix.clone();
        }
        if let Some(separator) = &self.separator {
            options.id_separator = separator.clone();
        }
        if let Some(max_depth) = self.max_depth {
            options.max_depth = max_depth;
        }
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;
    let input = cli.command.input();

    let schema = read_schema_file(&input.schema)?;
    let form_data = match &input.data {
        Some(path) => read_data_file(path)?,
        None => Value::Null,
    };
    log::debug!("options: {options:?}");

    let ctx = FormContext::from_values(schema, form_data, options);
    let output = match &cli.command {
        Commands::Resolve(_) => ctx.resolver().resolve(&ctx.schema, &ctx.form_data)?,
        Commands::Ids(_) => ctx.state()?.id_tree.to_json(),
        Commands::Paths(_) => ctx.state()?.path_tree.to_json(),
        Commands::Defaults(_) => ctx.default_form_state()?,
        Commands::State(_) => serde_json::to_value(ctx.state()?)?,
    };

    let text = serde_json::to_string_pretty(&output).context("Failed to render output")?;
    println!("{text}");
    Ok(())
}
