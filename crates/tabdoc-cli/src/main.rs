mod importer;

use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use importer::FsImporter;
use tabdoc_core::{split_lines, Config, Document, Edit, Editor, Engine, ScopePath};

/// Tabdoc - indentation-structured configuration documents
///
/// Validate, export, fingerprint, query and edit tabdoc files.
#[derive(Parser)]
#[command(name = "tabdoc", version, about, long_about = None)]
struct Cli {
    /// JSON file with engine settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log engine activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and report the first error
    Validate {
        /// Path to .tdoc file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export displayable variables as nested JSON
    Export {
        /// Path to .tdoc file
        file: PathBuf,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Compute the SHA-256 fingerprint of the exported JSON
    Hash {
        /// Path to .tdoc file
        file: PathBuf,
    },

    /// Print the value of one displayable variable
    Get {
        /// Path to .tdoc file
        file: PathBuf,
        /// Dotted variable path
        path: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the line declaring an element
    #[command(group(ArgGroup::new("change").required(true).args(["name", "datatype", "value"])))]
    Edit {
        /// Path to .tdoc file
        file: PathBuf,
        /// Dotted element path (scope path with --classbox)
        path: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New datatype
        #[arg(long)]
        datatype: Option<String>,
        /// New raw value
        #[arg(long)]
        value: Option<String>,
        /// Edit the classbox of the scope at PATH
        #[arg(long, requires = "datatype")]
        classbox: bool,
        /// Rewrite the file in place
        #[arg(long)]
        write: bool,
    },

    /// Show version information
    Version,
}

// ── Failures ──────────────────────────────────────────────

enum Failure {
    /// Bad input file, config or arguments
    Io(String),
    /// The document itself is invalid
    Document(tabdoc_core::Error),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Io(_) => 2,
            Failure::Document(_) => 1,
        }
    }

    fn report(&self) {
        let message = match self {
            Failure::Io(message) => message.clone(),
            Failure::Document(e) => e.to_string(),
        };
        eprintln!("{} {}", "error:".red().bold(), message);
    }
}

impl From<tabdoc_core::Error> for Failure {
    fn from(e: tabdoc_core::Error) -> Self {
        Failure::Document(e)
    }
}

// ── Helpers ───────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "tabdoc=debug" } else { "tabdoc=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, Failure> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| Failure::Io(format!("cannot read config {}: {}", path.display(), e)))?;
    Config::from_json(&text).map_err(|e| Failure::Io(e.to_string()))
}

fn read_source(file: &Path) -> Result<String, Failure> {
    std::fs::read_to_string(file)
        .map_err(|e| Failure::Io(format!("cannot read {}: {}", file.display(), e)))
}

fn parse_lines<S: AsRef<str>>(file: &Path, lines: &[S], config: &Config) -> Result<Document, Failure> {
    let document = Engine::new(config.clone())
        .with_importer(Box::new(FsImporter::for_file(file, config.clone())))
        .parse(lines)?;
    Ok(document)
}

fn load_document(file: &Path, config: &Config) -> Result<Document, Failure> {
    let text = read_source(file)?;
    parse_lines(file, &split_lines(&text), config)
}

/// `\r\n` when the source uses it, else `\n`
fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn pretty(json: &serde_json::Value) -> Result<String, Failure> {
    serde_json::to_string_pretty(json).map_err(|e| Failure::Io(e.to_string()))
}

// ── Commands ──────────────────────────────────────────────

fn validate(file: &Path, json: bool, quiet: bool, config: &Config) -> Result<i32, Failure> {
    let text = read_source(file)?;
    let result = parse_lines(file, &split_lines(&text), config);
    if json {
        let report = match &result {
            Ok(document) => serde_json::json!({
                "valid": true,
                "errors": 0,
                "elements": document.len(),
            }),
            Err(Failure::Document(e)) => serde_json::json!({
                "valid": false,
                "errors": 1,
                "message": e.root().to_string(),
                "line": e.line(),
            }),
            Err(Failure::Io(message)) => return Err(Failure::Io(message.clone())),
        };
        println!("{}", pretty(&report)?);
        return Ok(if result.is_ok() { 0 } else { 1 });
    }
    result?;
    if !quiet {
        println!("{} {} is valid", "✓".green(), file.display());
    }
    Ok(0)
}

fn export(file: &Path, output: Option<&Path>, quiet: bool, config: &Config) -> Result<i32, Failure> {
    let document = load_document(file, config)?;
    let text = pretty(&document.to_json()?)?;
    match output {
        Some(output) => {
            std::fs::write(output, format!("{}\n", text))
                .map_err(|e| Failure::Io(format!("cannot write {}: {}", output.display(), e)))?;
            if !quiet {
                eprintln!("{} wrote {}", "✓".green(), output.display());
            }
        }
        None => println!("{}", text),
    }
    Ok(0)
}

fn get(file: &Path, path: &str, json: bool, config: &Config) -> Result<i32, Failure> {
    let document = load_document(file, config)?;
    let key = ScopePath::parse(path);
    let variable = document
        .variable(&key)
        .filter(|v| v.visibility.displayable())
        .ok_or_else(|| tabdoc_core::Error::SetPathNotFound(key.to_string()))?;
    if json {
        println!("{}", pretty(&variable.value.to_json())?);
    } else {
        println!("{}", variable.value);
    }
    Ok(0)
}

struct EditArgs<'a> {
    path: &'a str,
    name: Option<&'a str>,
    datatype: Option<&'a str>,
    value: Option<&'a str>,
    classbox: bool,
    write: bool,
}

fn edit(file: &Path, args: EditArgs<'_>, quiet: bool, config: &Config) -> Result<i32, Failure> {
    let text = read_source(file)?;
    let mut lines: Vec<String> = split_lines(&text).into_iter().map(String::from).collect();
    let document = parse_lines(file, &lines, config)?;
    let editor = Editor::new(&document).with_config(config);

    let change: Edit = match (args.name, args.datatype, args.value) {
        (Some(name), _, _) => editor.rename(args.path, name)?,
        (_, Some(datatype), _) if args.classbox => editor.retype_classbox(args.path, datatype)?,
        (_, Some(datatype), _) => editor.retype(args.path, datatype)?,
        (_, _, Some(value)) => editor.revalue(args.path, value)?,
        _ => return Err(Failure::Io("one of --name, --datatype or --value is required".into())),
    };

    if !args.write {
        println!("{}", change.line);
        return Ok(0);
    }
    change.apply(&mut lines)?;
    // the edited file must still parse before it is written back
    parse_lines(file, &lines, config)?;
    std::fs::write(file, lines.join(line_ending(&text)))
        .map_err(|e| Failure::Io(format!("cannot write {}: {}", file.display(), e)))?;
    if !quiet {
        eprintln!("{} line {} of {} updated", "✓".green(), change.line_number, file.display());
    }
    Ok(0)
}

fn run(cli: Cli) -> Result<i32, Failure> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Validate { file, json } => validate(&file, json, cli.quiet, &config),
        Commands::Export { file, output } => export(&file, output.as_deref(), cli.quiet, &config),
        Commands::Hash { file } => {
            let document = load_document(&file, &config)?;
            println!("{}", document.fingerprint()?);
            Ok(0)
        }
        Commands::Get { file, path, json } => get(&file, &path, json, &config),
        Commands::Edit {
            file,
            path,
            name,
            datatype,
            value,
            classbox,
            write,
        } => {
            let args = EditArgs {
                path: &path,
                name: name.as_deref(),
                datatype: datatype.as_deref(),
                value: value.as_deref(),
                classbox,
                write,
            };
            edit(&file, args, cli.quiet, &config)
        }
        Commands::Version => {
            println!("tabdoc {} (tabdoc-core {})", env!("CARGO_PKG_VERSION"), tabdoc_core::VERSION);
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(failure) => {
            failure.report();
            failure.exit_code()
        }
    };

    process::exit(exit_code);
}
