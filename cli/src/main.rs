mod config;
mod test_runner;

use std::fs;
use std::io::{self, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use interpreter::{IncludeResolver, ScriptEvaluator, WeaveError, weave_until_settled};
use mash::{Address, Tree};

use crate::config::Config;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

/// Options whose value is the next argument.
const VALUE_OPTIONS: &[&str] = &["-o", "--output", "-I", "--include-dir", "--config"];

const STDIN_NAME: &str = "<stdin>";

#[derive(Parser)]
#[command(name = "mash", version, about = "Weave literate documents with embedded code")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log scheduling decisions (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Weave a document
    Run(RunArgs),

    /// Run .test.mash test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Document to weave; reads stdin when omitted
    file: Option<String>,

    /// Clear the build and archive directories first
    #[arg(short, long)]
    clear: bool,

    /// Print the parsed frame tree and exit
    #[arg(long)]
    tree: bool,

    /// Write the woven text of the document root here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra include directory, searched before configured ones. Repeatable.
    #[arg(short = 'I', long = "include-dir")]
    include_dirs: Vec<PathBuf>,

    /// Configuration file (default: ./mash.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.mash file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let args = with_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// `mash file.mash` means `mash run file.mash`, and so does a bare `mash`.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut rest = args.iter().skip(1);
    let mut first_positional = None;
    while let Some(arg) = rest.next() {
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with('-') {
            first_positional = Some(arg.as_str());
            break;
        }
    }

    let asks_for_info = args
        .iter()
        .any(|a| matches!(a.as_str(), "-h" | "--help" | "-V" | "--version"));
    let inject = match first_positional {
        Some(name) => !SUBCOMMANDS.contains(&name),
        None => !asks_for_info,
    };
    if inject {
        let at = args.len().min(1);
        args.insert(at, "run".to_string());
    }
    args
}

fn do_run(args: RunArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.clear {
        for dir in [&config.build_dir, &config.archive_dir] {
            if let Err(e) = clear_dir(dir) {
                eprintln!("error: cannot clear '{}': {}", dir.display(), e);
                process::exit(1);
            }
        }
        if args.file.is_none() {
            return;
        }
    }

    let (name, source) = match read_source(args.file.as_deref()) {
        Ok(pair) => pair,
        Err(e) => {
            let shown = args.file.as_deref().unwrap_or(STDIN_NAME);
            eprintln!("error: cannot read '{}': {}", shown, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(name.clone(), source.clone());
    let writer = StandardStream::stderr(color_choice);

    if args.tree {
        match mash::Parser::new(source.as_str(), name.as_str()).parse() {
            Ok(tree) => {
                if let Some(root) = tree.root() {
                    print!("{}", tree.render(root));
                }
                return;
            }
            Err(e) => {
                emit_weave_error(&writer, &mut files, file_id, &WeaveError::Parse(e));
                process::exit(1);
            }
        }
    }

    let working_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let resolver =
        IncludeResolver::new(working_root).with_library_dirs(config.library_dirs(&args.include_dirs));
    log::debug!("include search path: {:?}", resolver.search_path());

    // Restarts re-read the file; stdin can only be read once.
    let load = || -> Result<Tree, WeaveError> {
        let text = match &args.file {
            Some(path) => fs::read_to_string(path)?,
            None => source.clone(),
        };
        Ok(mash::Parser::new(text, name.as_str()).parse()?)
    };
    let result = weave_until_settled(
        load,
        || ScriptEvaluator::new(io::stdout()),
        &resolver,
        config.max_restarts,
    );

    match result {
        Ok(settled) => {
            let report = settled.report;
            if let Some(output) = &args.output {
                if let Err(e) = fs::write(output, &report.text) {
                    eprintln!("error: cannot write '{}': {}", output.display(), e);
                    process::exit(1);
                }
            }
            eprintln!(
                "{}; {:.02} seconds",
                report.stats,
                report.elapsed.as_secs_f64()
            );
        }
        Err(error) => {
            emit_weave_error(&writer, &mut files, file_id, &error);
            process::exit(1);
        }
    }
}

fn read_source(file: Option<&str>) -> io::Result<(String, String)> {
    match file {
        Some(path) => Ok((path.to_string(), fs::read_to_string(path)?)),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok((STDIN_NAME.to_string(), source))
        }
    }
}

/// Remove `dir` and everything in it. A missing directory is already clear.
fn clear_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            log::info!("cleared {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Render through codespan when the addressed file can be shown, falling
/// back to the plain `error: (file, line L, pos P): message` form.
fn emit_weave_error(
    writer: &StandardStream,
    files: &mut SimpleFiles<String, String>,
    main_id: usize,
    error: &WeaveError,
) {
    let Some(address) = error.address() else {
        eprintln!("error: {}", error);
        return;
    };

    let Some((file_id, span)) = locate(files, main_id, address, marker_width(error)) else {
        eprintln!("error: {}", error);
        return;
    };

    let diagnostic = match error {
        WeaveError::Parse(err) => err.to_diagnostic(file_id, span),
        WeaveError::IncludeNotFound {
            target, searched, ..
        } => Diagnostic::error()
            .with_message(format!("cannot find '{}' to include", target))
            .with_labels(vec![Label::primary(file_id, span).with_message("included here")])
            .with_notes(
                searched
                    .iter()
                    .map(|p| format!("searched {}", p.display()))
                    .collect(),
            ),
        WeaveError::IncludeCycle { target, path, .. } => Diagnostic::error()
            .with_message(format!("'{}' includes itself", target))
            .with_labels(vec![Label::primary(file_id, span).with_message("included here")])
            .with_notes(vec![format!("{} is already being included", path.display())]),
        WeaveError::Read { path, source, .. } => Diagnostic::error()
            .with_message(format!("cannot read '{}': {}", path.display(), source))
            .with_labels(vec![Label::primary(file_id, span).with_message("included here")]),
        WeaveError::Evaluation(err) => Diagnostic::error()
            .with_message(err.message.clone())
            .with_labels(vec![Label::primary(file_id, span)]),
        other => Diagnostic::error().with_message(other.to_string()),
    };

    let config = term::Config::default();
    if term::emit_to_write_style(&mut writer.lock(), &config, &*files, &diagnostic).is_err() {
        eprintln!("error: {}", error);
    }
}

fn marker_width(error: &WeaveError) -> usize {
    match error {
        WeaveError::Parse(_) => 3,
        _ => 1,
    }
}

/// Find the file an address points into and the byte span it names,
/// registering included files on first use.
fn locate(
    files: &mut SimpleFiles<String, String>,
    main_id: usize,
    address: &Address,
    width: usize,
) -> Option<(usize, Range<usize>)> {
    let in_main = files
        .get(main_id)
        .is_ok_and(|main| main.name().as_str() == &*address.source_name);
    let file_id = if in_main {
        main_id
    } else {
        let name = address.source_name.to_string();
        let text = fs::read_to_string(&name).ok()?;
        files.add(name, text)
    };
    let source = files.get(file_id).ok()?.source();
    let span = byte_span(source, address, width)?;
    Some((file_id, span))
}

/// Byte range of `width` characters starting at a 1-based line and
/// character offset, clipped to the end of the line.
fn byte_span(source: &str, address: &Address, width: usize) -> Option<Range<usize>> {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(address.line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let line = source.get(line_start..)?.split('\n').next()?;
    let mut chars = line.char_indices().skip(address.offset.saturating_sub(1));
    let start = chars.next().map(|(i, _)| i).unwrap_or(line.len());
    let end = line[start..]
        .char_indices()
        .nth(width)
        .map(|(i, _)| start + i)
        .unwrap_or(line.len());
    Some(line_start + start..line_start + end)
}
