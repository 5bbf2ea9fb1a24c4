use clap::{Parser, Subcommand, ValueEnum};
use sagegui_core::ResourceKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sagegui")]
#[command(about = "Manage proteomics search projects on a cluster workspace", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create, remove and list projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Upload, remove, list and download project files
    #[command(subcommand)]
    Resource(ResourceCommand),
    /// Compile, submit and inspect searches
    #[command(subcommand)]
    Search(SearchCommand),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    Create {
        name: String,
    },
    /// Delete a project and everything in it
    Remove {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Raw data files
    Input,
    /// Spectral libraries or FASTA databases
    Library,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Input => ResourceKind::Input,
            KindArg::Library => ResourceKind::Library,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Upload a local file into a project collection
    Add {
        project: String,
        file: PathBuf,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Remote file name, defaults to the local file name
        #[arg(long)]
        name: Option<String>,
    },
    Remove {
        project: String,
        name: String,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    List {
        project: String,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    /// Download a single project file
    Fetch {
        project: String,
        name: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SearchCommand {
    /// Compile parameters into a job script
    Create {
        project: String,
        search: String,
        /// Parameter file (.json or .toml); tool defaults when omitted
        #[arg(long)]
        params: Option<PathBuf>,
        /// Input file name, repeatable; replaces the inputs in --params
        #[arg(long = "input")]
        inputs: Vec<String>,
        /// Library file name, repeatable; replaces the library in --params
        #[arg(long = "library")]
        libraries: Vec<String>,
        /// Submit right after creating
        #[arg(long)]
        submit: bool,
    },
    Submit {
        project: String,
        search: String,
    },
    Remove {
        project: String,
        search: String,
        #[arg(long)]
        yes: bool,
    },
    List {
        project: String,
    },
    /// List files produced by a search
    Results {
        project: String,
        search: String,
    },
    /// Show a tab-separated result file as a table
    View {
        project: String,
        search: String,
        #[arg(default_value = "report.tsv")]
        file: String,
        /// Maximum rows to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Download every result file as one zip archive
    Download {
        project: String,
        search: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
