mod commands;
mod logging;
mod progress;

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ProjectCommand, ResourceCommand, SearchCommand};
use dotenv::dotenv;
use progress::CliReporter;
use sagegui_core::compiler::{DiannCompiler, SageCompiler, SearchCompiler, SearchParameters};
use sagegui_core::config::StoreProtocol;
use sagegui_core::store::{LocalStore, RemoteStore, SftpStore};
use sagegui_core::submit::{JobSubmitter, LocalJobSubmitter, SshJobSubmitter, SubmissionReceipt};
use sagegui_core::{AppConfig, ResourceKind, ResultTable, SearchTool, WorkspaceManager};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match sagegui_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::PrintConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Some(command) => {
            if let Err(err) = run(&config, command) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run(config: &AppConfig, command: Commands) -> anyhow::Result<()> {
    match config.tool {
        SearchTool::Diann => {
            let workspace = open_workspace(config, DiannCompiler::from_config(config))?;
            execute(&workspace, command)
        }
        SearchTool::Sage => {
            let workspace = open_workspace(config, SageCompiler::from_config(config))?;
            execute(&workspace, command)
        }
    }
}

fn open_workspace<C: SearchCompiler>(
    config: &AppConfig,
    compiler: C,
) -> anyhow::Result<WorkspaceManager<C>> {
    let submit = config.scheduler.submit_command.clone();
    let (store, submitter): (Box<dyn RemoteStore>, Box<dyn JobSubmitter>) =
        match config.store.protocol {
            StoreProtocol::Sftp => {
                let ctx = config.store.connection_context();
                let store = SftpStore::connect(&ctx)
                    .with_context(|| format!("connecting to {}", ctx.address()))?;
                info!("Connected to {} as {}", ctx.address(), ctx.username);
                (Box::new(store), Box::new(SshJobSubmitter::new(ctx, submit)))
            }
            StoreProtocol::Local => (
                Box::new(LocalStore::new()),
                Box::new(LocalJobSubmitter::new(submit)),
            ),
        };

    let root = workspace_root(config)?;
    let workspace = WorkspaceManager::open(store, submitter, compiler, &root)?
        .with_reporter(Box::new(CliReporter::new()));
    Ok(workspace)
}

/// Relative roots are resolved against the working directory for the local protocol.
fn workspace_root(config: &AppConfig) -> anyhow::Result<String> {
    let root = Path::new(&config.store.workspace_root);
    if config.store.protocol != StoreProtocol::Local || root.is_absolute() {
        return Ok(config.store.workspace_root.clone());
    }
    let absolute = env::current_dir()
        .context("resolving the working directory")?
        .join(root);
    absolute
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("workspace root {} is not valid UTF-8", absolute.display()))
}

fn execute<C: SearchCompiler>(
    workspace: &WorkspaceManager<C>,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Project(cmd) => run_project(workspace, cmd),
        Commands::Resource(cmd) => run_resource(workspace, cmd),
        Commands::Search(cmd) => run_search(workspace, cmd),
        Commands::PrintConfig => Ok(()),
    }
}

fn run_project<C: SearchCompiler>(
    workspace: &WorkspaceManager<C>,
    command: ProjectCommand,
) -> anyhow::Result<()> {
    match command {
        ProjectCommand::Create { name } => {
            workspace.create_project(&name)?;
            println!("{} Created project {}", "✓".green(), name.bold());
        }
        ProjectCommand::Remove { name, yes } => {
            let prompt = format!(
                "Are you SURE you want to DELETE project '{}' and all of its searches?",
                name
            );
            if !yes && !prompt_confirm(&prompt, Some(false))? {
                return Ok(());
            }
            workspace.remove_project(&name)?;
            println!("{} Removed project {}", "✓".green(), name.bold());
        }
        ProjectCommand::List => {
            print_names("projects", &workspace.list_projects()?);
        }
    }
    Ok(())
}

fn run_resource<C: SearchCompiler>(
    workspace: &WorkspaceManager<C>,
    command: ResourceCommand,
) -> anyhow::Result<()> {
    match command {
        ResourceCommand::Add {
            project,
            file,
            kind,
            name,
        } => {
            let name = match name {
                Some(name) => name,
                None => local_file_name(&file)?,
            };
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            workspace.add_resource(&project, kind.into(), &name, &data)?;
        }
        ResourceCommand::Remove {
            project,
            name,
            kind,
        } => {
            workspace.remove_resource(&project, kind.into(), &name)?;
            println!("{} Removed {}", "✓".green(), name.bold());
        }
        ResourceCommand::List { project, kind } => {
            let kind = ResourceKind::from(kind);
            let label = workspace.layout().schema().collection(kind).to_string();
            print_names(&label, &workspace.list_resources(&project, kind)?);
        }
        ResourceCommand::Fetch {
            project,
            name,
            kind,
            output,
        } => {
            let data = workspace.fetch_resource(&project, kind.into(), &name)?;
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            write_output(&output, &data)?;
        }
    }
    Ok(())
}

fn run_search<C: SearchCompiler>(
    workspace: &WorkspaceManager<C>,
    command: SearchCommand,
) -> anyhow::Result<()> {
    match command {
        SearchCommand::Create {
            project,
            search,
            params,
            inputs,
            libraries,
            submit,
        } => {
            let mut parameters: C::Params = load_parameters(params.as_deref())?;
            let mut references = parameters.references();
            if !inputs.is_empty() {
                references.inputs = inputs;
            }
            if !libraries.is_empty() {
                references.libraries = libraries;
            }
            parameters.set_references(references)?;

            let created = workspace.create_search(&project, &search, &parameters)?;
            println!(
                "{} Created search {} ({})",
                "✓".green(),
                format!("{}/{}", project, search).bold(),
                created.script_path
            );
            println!("{}", created.compiled.command.render().dimmed());
            if submit {
                print_receipt(&workspace.submit_search(&project, &search)?);
            }
        }
        SearchCommand::Submit { project, search } => {
            print_receipt(&workspace.submit_search(&project, &search)?);
        }
        SearchCommand::Remove {
            project,
            search,
            yes,
        } => {
            let prompt = format!(
                "Are you SURE you want to DELETE search '{}/{}' and its results?",
                project, search
            );
            if !yes && !prompt_confirm(&prompt, Some(false))? {
                return Ok(());
            }
            workspace.remove_search(&project, &search)?;
            println!("{} Removed search {}/{}", "✓".green(), project, search);
        }
        SearchCommand::List { project } => {
            print_names("searches", &workspace.list_searches(&project)?);
        }
        SearchCommand::Results { project, search } => {
            print_names("files", &workspace.list_result_files(&project, &search)?);
        }
        SearchCommand::View {
            project,
            search,
            file,
            limit,
        } => {
            let table = workspace.fetch_result_file(&project, &search, &file)?;
            print_table(&table, limit);
        }
        SearchCommand::Download {
            project,
            search,
            output,
        } => {
            let archive = workspace.fetch_results_archive(&project, &search)?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.zip", search)));
            write_output(&output, &archive)?;
        }
    }
    Ok(())
}

/// Tool defaults when no file is given; `.toml` files parse as TOML, anything else as JSON.
fn load_parameters<P: SearchParameters>(path: Option<&Path>) -> anyhow::Result<P> {
    let Some(path) = path else {
        return Ok(P::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parameters = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?,
        _ => serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?,
    };
    Ok(parameters)
}

fn local_file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot take a file name from {}", path.display()))
}

fn write_output(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "{} Saved {} ({} bytes)",
        "✓".green(),
        path.display().to_string().bold(),
        data.len()
    );
    Ok(())
}

fn print_names(label: &str, names: &[String]) {
    if names.is_empty() {
        println!("No {}", label);
        return;
    }
    println!("{} {}", names.len().to_string().cyan(), label);
    for name in names {
        println!("  {}", name);
    }
}

fn print_receipt(receipt: &SubmissionReceipt) {
    match receipt.job_id() {
        Some(id) => println!("{} Submitted job {}", "✓".green(), id.cyan()),
        None => println!("{} Submitted {}", "✓".green(), receipt.script_path),
    }
    let stderr = receipt.stderr.trim();
    if !stderr.is_empty() {
        println!("{}", stderr.yellow());
    }
}

fn print_table(table: &ResultTable, limit: usize) {
    println!("{}", table.columns.join("\t").bold());
    for row in table.rows.iter().take(limit) {
        println!("{}", row.join("\t"));
    }
    if table.len() > limit {
        println!(
            "{}",
            format!("... {} more rows", table.len() - limit).dimmed()
        );
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
