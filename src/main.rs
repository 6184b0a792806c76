//! Command-line front end: load a dataset, apply URL state and option
//! changes headlessly, and print what the views would show.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dms_viz::options::{ProteinOptions, ToolConfig};
use dms_viz::query::{self, QueryState, DATA_PARAM};
use dms_viz::tool::{
    example_dataset, parse_dataset, DataSource, Fetcher, MemoryPage, Tool, ToolCommand,
    UreqFetcher,
};
use dms_viz::views::Renderers;
use dms_viz::DmsVizError;

#[derive(Parser)]
#[command(name = "dms-viz", about = "Inspect antibody-escape datasets and tool state")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Source {
    /// Dataset path, http(s) URL, or `example`.
    data: String,
    /// Query string to start from (as it would appear in the page URL).
    #[arg(long, default_value = "")]
    query: String,
    /// Option change applied after loading, e.g. `summary=max`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// TOML display preset.
    #[arg(long)]
    preset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List experiments, epitopes, structures, and filter ranges.
    Inspect(Source),
    /// Print the per-site summary the chart would plot.
    Summarize(Source),
    /// Print the query string encoding the resulting state.
    Url(Source),
    /// Select sites and print the structure selection and colors.
    Select {
        #[command(flatten)]
        source: Source,
        /// Sequential site numbers, comma separated.
        #[arg(long, value_delimiter = ',')]
        sites: Vec<i64>,
    },
    /// Print the JSON Schema of the configuration.
    Schema,
    /// List the TOML presets in a directory.
    Presets {
        /// Preset directory.
        dir: PathBuf,
    },
}

/// Build the tool for `source`. Only an http(s) DATA is fetched; the
/// bundled example and local files ignore any `data` in `--query`.
fn load_tool(
    source: &Source,
    fetcher: &dyn Fetcher,
) -> Result<(Tool, MemoryPage), DmsVizError> {
    let renderers = Renderers::headless();
    let (mut tool, page) = if source.data.starts_with("http://")
        || source.data.starts_with("https://")
    {
        let mut query = QueryState::parse(&source.query);
        query.set(DATA_PARAM, source.data.clone());
        let page = MemoryPage::new(&query.to_query_string());
        (Tool::from_page(Box::new(page.clone()), renderers, fetcher)?, page)
    } else {
        let page = MemoryPage::new(&source.query);
        let (data_source, loaded) = if source.data == "example" {
            (DataSource::Example, example_dataset())
        } else {
            let loaded = std::fs::read_to_string(&source.data)
                .map_err(DmsVizError::from)
                .and_then(|text| parse_dataset(&text));
            (DataSource::LocalFile(source.data.clone()), loaded)
        };
        (
            Tool::new(Box::new(page.clone()), renderers, data_source, loaded)?,
            page,
        )
    };

    if let Some(path) = &source.preset {
        tool.execute(ToolCommand::ApplyPreset(ProteinOptions::load(path)?));
    }
    for assignment in &source.set {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(DmsVizError::InvalidOption {
                key: assignment.clone(),
                value: String::new(),
            });
        };
        tool.execute(ToolCommand::from_control(key, value)?);
    }
    if let Some(alert) = page.alerts().into_iter().next() {
        log::warn!("{alert}");
    }
    Ok((tool, page))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DmsVizError> {
    serde_json::to_string_pretty(value).map_err(|e| DmsVizError::OptionsParse(e.to_string()))
}

fn run(command: &Command) -> Result<String, DmsVizError> {
    match command {
        Command::Inspect(source) => {
            let (tool, _) = load_tool(source, &UreqFetcher)?;
            let mut out = String::new();
            for experiment in tool.dataset().iter() {
                out.push_str(&format!(
                    "{}\n  pdb: {}\n  metric: {}\n  epitopes: {}\n  rows: {}\n",
                    experiment.name,
                    experiment.pdb,
                    experiment.metric_col,
                    experiment.epitopes.join(", "),
                    experiment.mutations.len(),
                ));
                for range in experiment.filter_ranges() {
                    out.push_str(&format!(
                        "  filter {} ({}): {} to {}\n",
                        range.column, range.label, range.min, range.max
                    ));
                }
            }
            out.push_str("config: ");
            out.push_str(&to_json(tool.config())?);
            out.push('\n');
            Ok(out)
        }
        Command::Summarize(source) => {
            let (tool, _) = load_tool(source, &UreqFetcher)?;
            to_json(&tool.chart().data())
        }
        Command::Url(source) => {
            let (tool, _) = load_tool(source, &UreqFetcher)?;
            let mut query = QueryState::parse(&source.query);
            if let DataSource::Remote(url) = tool.source() {
                query.set(DATA_PARAM, url.clone());
            }
            query::write_config(&mut query, tool.config());
            Ok(format!("?{}\n", query.to_query_string()))
        }
        Command::Select { source, sites } => {
            let (mut tool, _) = load_tool(source, &UreqFetcher)?;
            tool.execute(ToolCommand::SelectSites {
                sites: sites.clone(),
            });
            let protein = tool.protein();
            let scheme = protein.color_scheme();
            let mut out = String::new();
            match protein.selection_layer() {
                Some(layer) => out.push_str(&format!("selection: {}\n", layer.selection)),
                None => out.push_str("selection: (none)\n"),
            }
            for row in protein.selection() {
                let color = row
                    .site_protein
                    .residue_number()
                    .map_or(scheme.fallback, |resno| scheme.atom_color(resno));
                out.push_str(&format!(
                    "  site {} ({} chain {}): {color}\n",
                    row.site, row.site_protein, row.site_chain
                ));
            }
            Ok(out)
        }
        Command::Schema => to_json(&ToolConfig::json_schema()),
        Command::Presets { dir } => Ok(list_presets(dir)),
    }
}

fn list_presets(dir: &Path) -> String {
    ProteinOptions::list_presets(dir)
        .into_iter()
        .map(|name| format!("{name}\n"))
        .collect()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(&cli.command) {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(output.as_bytes()) {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
