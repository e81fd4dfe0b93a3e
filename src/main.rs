// zsedit: a terminal ZScript editor with cross-file semantic highlighting

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::LevelFilter;
use ratatui::{Terminal, backend::CrosstermBackend};

use zsedit::project::{FileKind, Project};
use zsedit::ui::App;

#[derive(Parser, Debug)]
#[command(name = "zsedit", version, about)]
struct Args {
    /// Project directory or a single ZScript file
    path: PathBuf,

    /// Print diagnostics and exit; the exit code is non-zero on errors
    #[arg(long)]
    check: bool,

    /// Also print every file's semantic tokens (implies --check)
    #[arg(long)]
    dump_tokens: bool,

    /// Write the log to this file (the TUI owns the terminal)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

fn setup_logging(args: &Args, interactive: bool) -> Result<(), fern::InitError> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level);

    match (&args.log, interactive) {
        (Some(path), _) => dispatch.chain(fern::log_file(path)?).apply()?,
        // Logging to stderr would draw over the TUI.
        (None, true) => {}
        (None, false) => dispatch.chain(io::stderr()).apply()?,
    }
    Ok(())
}

fn check(project: &Project) -> ExitCode {
    let mut errors = 0;
    let mut warnings = 0;
    for document in project.documents() {
        for diagnostic in document.diagnostics() {
            println!("{}: {}", document.path, diagnostic);
        }
        if let Some(unit) = &document.unit {
            errors += unit.errors().count();
            warnings += unit.warnings().count();
        }
    }
    println!(
        "{} file(s), {} error(s), {} warning(s)",
        project.documents().len(),
        errors,
        warnings
    );
    if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn dump_tokens(project: &Project) {
    for document in project.documents() {
        if document.kind != FileKind::ZScript {
            continue;
        }
        println!("== {}", document.path);
        for token in document.semantic() {
            let text = document.text.get(token.start..token.end).unwrap_or("");
            println!("{:6}..{:<6} {:12} {:?}", token.start, token.end, token.kind.to_string(), text);
            if let Some(name) = &token.qualified_name {
                println!("{:15} -> {}", "", name);
            }
        }
    }
}

fn run_tui(project: Project) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(project);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn main() -> ExitCode {
    let args = Args::parse();
    let interactive = !args.check && !args.dump_tokens;

    if let Err(e) = setup_logging(&args, interactive) {
        eprintln!("Error: cannot set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let project = match Project::open(&args.path) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error: cannot open '{}': {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.dump_tokens {
        dump_tokens(&project);
    }
    if args.check || args.dump_tokens {
        return check(&project);
    }

    match run_tui(project) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
