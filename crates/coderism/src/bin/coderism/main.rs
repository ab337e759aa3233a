mod cli;

use coderism::parameters::RichParameter;
use indexmap::IndexMap;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CODERISM_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(2);
        }
    }
}

/// Returns `false` if error diagnostics were reported
fn run(cli: &cli::Cli) -> anyhow::Result<bool> {
    let mut graph = load(&cli.input)?;
    let input = coderism::Input {
        parameter_values: cli.input.parameters.clone(),
    };

    let output = coderism::extract(&mut graph, &input);

    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }

    let report = Report {
        parameters: &output.parameters,
        tags: output.tags(),
        unknown_tags: output.unknown_tags(),
    };
    match cli.output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &report)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &report)?,
    };

    Ok(!output.has_errors())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<coderism::ModuleGraph> {
    let mut graph = coderism::ModuleGraph::new();
    for dir_path in &input.directories {
        let module = coderism::Module::load_directory(dir_path).map_err(|err| {
            anyhow::Error::new(err).context(format!("Failed to load {}", dir_path.display()))
        })?;
        graph.push(module);
    }

    anyhow::ensure!(!graph.is_empty(), "No modules loaded");

    Ok(graph)
}

#[derive(serde::Serialize)]
struct Report<'a> {
    parameters: &'a [RichParameter],
    tags: IndexMap<String, String>,
    unknown_tags: Vec<String>,
}
