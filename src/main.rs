use anyhow::{Context, Result, bail};
use assetpack::extension::is_textual;
use assetpack::{
    BatchReport, EncryptionEvent, FileCodec, KeyRepository, KeyStore, PACKED_DIR, PackWorker,
    Project, RunRequest, Selection, default_repository,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "assetpack")]
#[command(
    version,
    about = "Packs game asset trees into encrypted, runtime-loadable containers."
)]
struct Cli {
    /// Directory holding the project key pairs
    #[arg(long, global = true, value_name = "PATH", env = "ASSETPACK_KEYS_DIR")]
    keys_dir: Option<PathBuf>,

    /// Log per-file progress
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manages project key pairs
    #[command(subcommand)]
    Keys(KeysCommand),

    /// Packs every file below a raw asset root
    #[command(arg_required_else_help = true)]
    Pack {
        project: String,
        raw_root: PathBuf,
        #[command(flatten)]
        output: PackArgs,
    },

    /// Packs only the listed files
    #[command(arg_required_else_help = true)]
    PackFiles {
        project: String,
        raw_root: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        output: PackArgs,
    },

    /// Decrypts one container
    #[command(arg_required_else_help = true)]
    Decrypt {
        project: String,
        container: PathBuf,

        /// Output file (default: Decrypted_<name> next to the container)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Treat the container as text
        #[arg(long, conflicts_with = "binary")]
        text: bool,

        /// Treat the container as binary
        #[arg(long)]
        binary: bool,
    },
}

#[derive(Debug, Subcommand)]
enum KeysCommand {
    /// Loads a key pair, creating it if missing
    #[command(arg_required_else_help = true)]
    Init { name: String },

    /// Generates a new key pair
    #[command(arg_required_else_help = true)]
    Create {
        name: String,
        /// Replace an existing key pair
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, clap::Args)]
struct PackArgs {
    /// Destination of the packed tree (default: <RAW_ROOT>/Packed)
    #[arg(long, value_name = "DIR")]
    packed: Option<PathBuf>,

    /// Re-encrypt files that already have a container
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Print the run report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn resolve_repository(dir: Option<PathBuf>) -> Result<KeyRepository> {
    match dir {
        Some(d) => Ok(KeyRepository::new(d)),
        None => Ok(default_repository()?),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let repository = resolve_repository(args.keys_dir)?;

    match args.command {
        Commands::Keys(KeysCommand::Init { name }) => {
            let existed = repository.contains(&name)?;
            KeyStore::new(repository).init_keys(&name)?;
            if existed {
                println!("key pair '{name}' loaded");
            } else {
                println!("key pair '{name}' created");
            }
        }
        Commands::Keys(KeysCommand::Create { name, force }) => {
            if repository.contains(&name)? && !force {
                bail!("key pair '{name}' already exists (use --force to replace it)");
            }
            KeyStore::new(repository).create_keys(&name)?;
            println!("key pair '{name}' created");
        }
        Commands::Pack {
            project,
            raw_root,
            output,
        } => {
            run_pack(repository, project, raw_root, Selection::Tree, &output)?;
        }
        Commands::PackFiles {
            project,
            raw_root,
            files,
            output,
        } => {
            run_pack(repository, project, raw_root, Selection::Files(files), &output)?;
        }
        Commands::Decrypt {
            project,
            container,
            out,
            text,
            binary,
        } => {
            let keys = repository.load(&project)?;
            let as_textual = text || (!binary && is_textual(&container));
            let plain = FileCodec::new(&keys).decode(&container, as_textual)?;

            let out = match out {
                Some(p) => p,
                None => decrypted_path(&container)?,
            };
            fs::write(&out, &plain)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("decrypted {} -> {}", container.display(), out.display());
        }
    }

    Ok(())
}

fn run_pack(
    repository: KeyRepository,
    name: String,
    raw_root: PathBuf,
    selection: Selection,
    output: &PackArgs,
) -> Result<()> {
    let packed_root = output
        .packed
        .clone()
        .unwrap_or_else(|| raw_root.join(PACKED_DIR));
    let project = Project::new(name, raw_root, packed_root);
    if !project.is_valid() {
        bail!("project name, raw root and packed root must not be empty");
    }

    let mut store = KeyStore::new(repository);
    store.init_keys(project.name())?;
    let worker = PackWorker::spawn(store.into_active()?)?;

    let cancel = worker.cancel_flag();
    ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let json = output.json;
    let report = worker.run(
        RunRequest {
            config: project.run_config(output.force),
            selection,
        },
        |event| {
            if !json {
                print_event(event);
            }
        },
    )?;
    worker.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.failed() > 0 {
        bail!("{} file(s) failed to pack", report.failed());
    }
    Ok(())
}

fn print_event(event: &EncryptionEvent) {
    match event {
        EncryptionEvent::Encrypting(p) => println!("encrypting {}", p.display()),
        EncryptionEvent::Skipped(p) => println!("skipped    {}", p.display()),
        EncryptionEvent::FileDone(p) => println!("packed     {}", p.display()),
        EncryptionEvent::AllDone => {}
    }
}

fn print_summary(report: &BatchReport) {
    for (source, reason) in report.failures() {
        eprintln!("failed {}: {reason}", source.display());
    }
    println!(
        "{} packed, {} skipped, {} failed{}",
        report.encrypted(),
        report.skipped(),
        report.failed(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

fn decrypted_path(container: &Path) -> Result<PathBuf> {
    let name = container
        .file_name()
        .with_context(|| format!("{} has no file name", container.display()))?;
    let mut out_name = std::ffi::OsString::from("Decrypted_");
    out_name.push(name);
    Ok(container.with_file_name(out_name))
}
