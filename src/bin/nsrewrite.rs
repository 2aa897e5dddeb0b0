//! nsrewrite CLI
//!
//! Inject, strip, or tokenize package namespaces in a directory tree or zip
//! archive, clean `-meta.xml` descriptors, and generate `package.xml` files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nsrewrite::{
    copy_entries, package_xml_from_dict, DirContainer, MetaXmlCleaner, NamespaceTransformer,
    RewriteSummary, Rewriter, TracingLogger, ZipContainer,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "nsrewrite")]
#[command(version)]
#[command(about = "Namespace rewriting for metadata package artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct RewriteArgs {
    /// Source directory or .zip archive
    input: PathBuf,

    /// Destination directory or .zip archive (must differ from the input)
    #[arg(short = 'o', long)]
    output: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve namespace placeholders
    Inject {
        #[command(flatten)]
        paths: RewriteArgs,

        /// Package namespace
        #[arg(short = 'n', long, env = "NSREWRITE_NAMESPACE")]
        namespace: String,

        /// Deploy as a managed package
        #[arg(long, env = "NSREWRITE_MANAGED")]
        managed: bool,

        /// Target org carries the namespace itself
        #[arg(long, env = "NSREWRITE_NAMESPACED_ORG")]
        namespaced_org: bool,
    },

    /// Remove a namespace prefix
    Strip {
        #[command(flatten)]
        paths: RewriteArgs,

        #[arg(short = 'n', long, env = "NSREWRITE_NAMESPACE")]
        namespace: String,
    },

    /// Replace namespace references with placeholders
    Tokenize {
        #[command(flatten)]
        paths: RewriteArgs,

        #[arg(short = 'n', long, env = "NSREWRITE_NAMESPACE")]
        namespace: String,
    },

    /// Remove an element (default: packageVersions) from -meta.xml files
    CleanMetaXml {
        #[command(flatten)]
        paths: RewriteArgs,

        /// Element to remove
        #[arg(long, default_value = nsrewrite::metaxml::PACKAGE_VERSIONS_TAG)]
        tag: String,

        /// Clean descriptors in every directory, not only the default ones
        #[arg(long)]
        all_dirs: bool,
    },

    /// Generate a package.xml
    PackageXml {
        /// Metadata members as Type=Member1,Member2 (repeatable)
        #[arg(short = 't', long = "type", value_name = "TYPE=MEMBERS", required = true)]
        types: Vec<String>,

        /// API version
        #[arg(long, default_value = "58.0")]
        api_version: String,

        /// Package name written as <fullName>
        #[arg(long)]
        name: Option<String>,

        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Extract a zip archive into a directory
    #[command(name = "x")]
    Extract {
        /// Archive to extract
        input: PathBuf,

        /// Directory to extract to
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Only extract entries under this folder, relative to it
        #[arg(long)]
        subfolder: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let logger = TracingLogger;

    match cli.command {
        Commands::Inject { paths, namespace, managed, namespaced_org } => {
            let transformer = NamespaceTransformer::inject(namespace, managed, namespaced_org).with_logger(&logger);
            let summary = rewrite_paths(&paths, transformer.as_fn())?;
            report(&paths, &summary);
        }
        Commands::Strip { paths, namespace } => {
            let transformer = NamespaceTransformer::strip(namespace).with_logger(&logger);
            let summary = rewrite_paths(&paths, transformer.as_fn())?;
            report(&paths, &summary);
        }
        Commands::Tokenize { paths, namespace } => {
            let transformer = NamespaceTransformer::tokenize(namespace).with_logger(&logger);
            let summary = rewrite_paths(&paths, transformer.as_fn())?;
            report(&paths, &summary);
        }
        Commands::CleanMetaXml { paths, tag, all_dirs } => {
            let mut cleaner = MetaXmlCleaner::new().with_tag(tag).with_logger(&logger);
            if all_dirs {
                cleaner = cleaner.with_dirs(None);
            }
            let summary = rewrite_paths(&paths, |name, content| cleaner.clean(name, content))?;
            cleaner.finish();
            report(&paths, &summary);
        }
        Commands::PackageXml { types, api_version, name, output } => {
            let items = parse_types(&types)?;
            let xml = package_xml_from_dict(&items, &api_version, name.as_deref());
            match output {
                Some(path) => fs::write(&path, xml + "\n")
                    .with_context(|| format!("Failed to write: {}", path.display()))?,
                None => println!("{}", xml),
            }
        }
        Commands::Extract { input, directory, subfolder } => {
            let mut zip = ZipContainer::from_path(&input)
                .with_context(|| format!("Failed to open archive: {}", input.display()))?;
            if let Some(folder) = subfolder {
                zip = zip.subfolder(&folder)?;
            }
            let mut dest = DirContainer::create(&directory)?;
            let count = copy_entries(&mut zip, &mut dest)?;
            tracing::info!("Extracted {} files to {}", count, directory.display());
        }
    }

    Ok(())
}

fn is_zip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn rewrite_paths<F>(paths: &RewriteArgs, transform: F) -> Result<RewriteSummary>
where
    F: FnMut(&str, &str) -> nsrewrite::Result<(String, String)>,
{
    let RewriteArgs { input, output } = paths;
    if input == output || nsrewrite::rewrite::same_directory(input, output) {
        bail!("Output must differ from input: {}", input.display());
    }

    let rewriter = Rewriter::new();
    if input.is_dir() {
        let mut source = DirContainer::open(input)?;
        let mut dest = DirContainer::create(output)?;
        Ok(rewriter.rewrite(&mut source, &mut dest, transform)?)
    } else if is_zip(input) {
        let mut source = ZipContainer::from_path(input)
            .with_context(|| format!("Failed to open archive: {}", input.display()))?;
        let mut dest = ZipContainer::create();
        let summary = rewriter.rewrite(&mut source, &mut dest, transform)?;
        dest.write_to(output)
            .with_context(|| format!("Failed to write: {}", output.display()))?;
        Ok(summary)
    } else {
        bail!("Input must be a directory or a .zip archive: {}", input.display());
    }
}

fn report(paths: &RewriteArgs, summary: &RewriteSummary) {
    tracing::info!(
        "Wrote {} entries to {} ({} text, {} binary, {} renamed)",
        summary.entries,
        paths.output.display(),
        summary.text,
        summary.binary,
        summary.renamed
    );
}

fn parse_types(pairs: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut items: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in pairs {
        let Some((md_type, members)) = pair.split_once('=') else {
            bail!("Expected TYPE=MEMBERS, got '{}'", pair);
        };
        let md_type = md_type.trim();
        if md_type.is_empty() {
            bail!("Missing metadata type in '{}'", pair);
        }
        items.entry(md_type.to_string()).or_default().extend(
            members
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        );
    }
    Ok(items)
}
