use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossterm::style::Stylize;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use muscheme::interpreter;

#[derive(Parser, Debug)]
#[command(name = "muscheme", version, about = "A small Scheme-flavored interpreter")]
struct Args {
    /// Script to run; starts a REPL when omitted
    script: Option<PathBuf>,

    /// Print the parsed AST as JSON instead of evaluating
    #[arg(long)]
    dump_ast: bool,

    /// Write trace logs to a file under this directory instead of stderr
    #[arg(long, env = "MUSCHEME_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let _guard = init_tracing(args.log_dir.as_deref());
    info!(?args, "starting");

    match &args.script {
        Some(path) => run_script(path, args.dump_ast),
        None => repl(args.dump_ast),
    }
}

// The guard must outlive main or buffered file logs are dropped.
fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
    tracing_log::LogTracer::init().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let file = tracing_appender::rolling::never(dir, "muscheme.log");
            let (writer, guard) = tracing_appender::non_blocking(file);
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
            Some(guard)
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
            None
        }
    }
}

fn run_script(path: &std::path::Path, dump_ast: bool) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}", format!("cannot read {}: {}", path.display(), err).red());
            process::exit(1);
        }
    };
    let result = if dump_ast {
        interpreter::dump_ast(&source).map(|json| println!("{}", json))
    } else {
        interpreter::new().execute(&source).map(|_| ())
    };
    if let Err(message) = result {
        eprintln!("{}", message.red());
        process::exit(1);
    }
}

fn repl(dump_ast: bool) {
    println!("muscheme {} (Ctrl-D exits)", env!("CARGO_PKG_VERSION"));
    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("scheme".to_string()),
        DefaultPromptSegment::Empty,
    );
    let mut interpreter = interpreter::new();

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let result = if dump_ast {
                    interpreter::dump_ast(&line).map(|json| println!("{}", json))
                } else {
                    interpreter.execute(&line).map(|_| ())
                };
                if let Err(message) = result {
                    eprintln!("{}", message.red());
                }
            }
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("{}", format!("input error: {}", err).red());
                break;
            }
        }
    }
}
