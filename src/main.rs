use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use crossterm::event::{poll as event_poll, read as event_read};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use termdialog::app::App;
use termdialog::config::Config;
use termdialog::services::terminal::{TerminalCommand, PtyTerminal};
use termdialog::services::terminal_modes::{self, TerminalModes};
use termdialog::services::{log_dirs, tracing_setup};
use termdialog::view::dialogs::editor::{self, EditorDialogConfig};
use termdialog::view::dialogs::{
    ghdash, lazygit, DialogConfig, DialogId, DialogResult, ScreenCursor, TermDialog,
};
use termdialog::view::theme::Theme;

/// Run terminal programs inside a modal dialog
#[derive(Parser, Debug)]
#[command(name = "termdialog")]
#[command(about = "Run terminal programs inside a modal dialog", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Path to log file (default: state dir, see --show-paths)
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Theme name, overriding the configured one
    #[arg(long, value_name = "NAME", global = true)]
    theme: Option<String>,

    /// Print the directories used by termdialog and exit
    #[arg(long)]
    show_paths: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit a copy of FILE in a terminal editor and print the result
    Edit {
        file: PathBuf,

        /// Editor command line (default: config, $VISUAL, $EDITOR, nvim)
        #[arg(long, value_name = "CMD")]
        editor: Option<String>,
    },
    /// Run lazygit
    Lazygit {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Run the GitHub dashboard (gh dash)
    GhDash {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Run any command
    Run {
        /// Dialog title (default: the program name)
        #[arg(long)]
        title: Option<String>,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    if args.show_paths {
        log_dirs::print_all_paths();
        return Ok(());
    }

    let Some(command) = args.command else {
        anyhow::bail!("No command given, see `termdialog --help`");
    };

    let log_file = args.log_file.clone().unwrap_or_else(log_dirs::main_log_path);
    if let Err(e) = tracing_setup::init_global(&log_file) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }
    log_dirs::cleanup_stale_logs();
    tracing::info!("termdialog starting");

    let config = Config::load(args.config.as_deref())?;
    let theme = Theme::from_name(args.theme.as_deref().unwrap_or(&config.theme));
    tracing::info!("Using theme '{}'", theme.name);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("termdialog-rt")
        .build()
        .context("Failed to create tokio runtime")?;
    let cancel = CancellationToken::new();

    let dialog = build_dialog(command, &config, &theme, cancel.clone())?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    let (width, height) = crossterm::terminal::size().context("Failed to query terminal size")?;
    let mut app = App::new(runtime.handle().clone(), theme, width, height);

    let loop_result = {
        let _modes = TerminalModes::enable(&config.keyboard)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))
            .context("Failed to create terminal")?;
        terminal.clear()?;

        app.open_dialog(dialog);
        let result = run_event_loop(&mut app, &mut terminal);
        app.close_all();
        result
        // Terminal modes are restored here, before anything is printed
    };

    cancel.cancel();
    let results = app.take_results();
    drop(app);
    runtime.shutdown_timeout(Duration::from_millis(200));

    loop_result?;
    print_results(results)
}

fn build_dialog(
    command: Command,
    config: &Config,
    theme: &Theme,
    cancel: CancellationToken,
) -> AnyhowResult<TermDialog> {
    let options = config.terminal.options(theme);

    let dialog = match command {
        Command::Edit { file, editor } => {
            let editor = editor.unwrap_or_else(|| config.editor.resolve_command());
            if !editor::is_tui_editor(&editor) {
                tracing::warn!("'{}' is not a known terminal editor", editor);
            }
            let copy = copy_for_editing(&file)?;
            editor::new_dialog(
                cancel,
                EditorDialogConfig {
                    file_path: copy,
                    editor,
                    working_dir: file.parent().map(Path::to_path_buf),
                },
                options,
            )
        }
        Command::Lazygit { dir } => lazygit::new_dialog(cancel, dir, theme, options),
        Command::GhDash { dir } => ghdash::new_dialog(cancel, dir, theme, options),
        Command::Run { title, command } => {
            let mut words = command.into_iter();
            let program = words.next().context("No program given")?;
            let title = title.unwrap_or_else(|| program.clone());
            let command = TerminalCommand::new(program).args(words);
            tracing::info!("Running '{}'", command.display());

            TermDialog::new(DialogConfig {
                id: DialogId::from("run"),
                title,
                loading_msg: None,
                terminal: Box::new(PtyTerminal::new(command, options, cancel)),
                on_close: None,
            })
        }
    };
    Ok(dialog)
}

/// Copy `file` (if it exists) to a temporary file the editor dialog may delete
fn copy_for_editing(file: &Path) -> AnyhowResult<PathBuf> {
    let suffix = file
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let temp = tempfile::Builder::new()
        .prefix("termdialog-edit-")
        .suffix(&suffix)
        .tempfile()
        .context("Failed to create temporary file")?;

    if file.exists() {
        std::fs::copy(file, temp.path())
            .with_context(|| format!("Failed to read {}", file.display()))?;
    }

    let (_, path) = temp.keep().context("Failed to keep temporary file")?;
    Ok(path)
}

fn print_results(results: Vec<DialogResult>) -> AnyhowResult<()> {
    for result in results {
        match result {
            DialogResult::Editor(editor) => {
                let content = editor.result?;
                println!("{}", content);
            }
        }
    }
    Ok(())
}

fn run_event_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> AnyhowResult<()> {
    const FRAME_DURATION: Duration = Duration::from_millis(16); // 60fps
    let mut last_render = Instant::now();
    let mut needs_render = true;
    let mut last_cursor: Option<ScreenCursor> = None;

    loop {
        // Task results: output to draw, exits, start errors
        if app.process_async_messages() {
            needs_render = true;
        }

        if app.should_quit() {
            break;
        }

        if needs_render && last_render.elapsed() >= FRAME_DURATION {
            let cursor = app.cursor();
            terminal.draw(|frame| {
                app.render(frame);
                if let Some(cursor) = cursor {
                    frame.set_cursor_position((cursor.x, cursor.y));
                }
            })?;
            if let Some(cursor) = cursor {
                if last_cursor != Some(cursor) {
                    terminal_modes::apply_cursor_style(&cursor);
                }
            }
            last_cursor = cursor;
            last_render = Instant::now();
            needs_render = false;
        }

        let timeout = FRAME_DURATION.saturating_sub(last_render.elapsed());
        if event_poll(timeout)? && app.handle_terminal_event(event_read()?) {
            needs_render = true;
        }
    }

    Ok(())
}
