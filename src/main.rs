use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod app;
mod attachment;
mod cli;
mod config;
mod core;
mod fs;
mod input;
mod models;
mod ui;

use app::App;
use cli::{Cli, CliContext};
use crate::core::TaskStore;
use crate::fs::JsonFileStorage;

fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = config::load_config()?;
    if let Some(path) = args.data_file.clone() {
        config.data_file = Some(path);
    }

    init_logging();

    // 图片压缩在后台线程池中运行
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let data_file = config.data_file();
    tracing::info!("opening {}", data_file.display());
    let mut store = TaskStore::open(JsonFileStorage::new(data_file));

    // 处理 CLI 命令
    let should_run_tui = {
        let stdin = io::stdin();
        let mut ctx = CliContext {
            store: &mut store,
            config: &config,
            runtime: runtime.handle(),
            input: stdin.lock(),
            out: io::stdout(),
        };
        cli::handle_cli(args.command, &mut ctx)?
    };

    // 如果 CLI 命令已处理，直接退出
    if !should_run_tui {
        return Ok(());
    }

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 创建应用
    let mut app = App::new(store, config, runtime.handle().clone());

    // 运行应用
    let res = run_app(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("terminal loop failed: {:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// 日志写入数据目录下的 taskdeck.log（TUI 占用了 stdout）
/// 级别由 TASKDECK_LOG 控制，默认 info
fn init_logging() {
    let dir = config::get_data_dir();
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("taskdeck.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env("TASKDECK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // 图片处理结果、通知过期、跨日刷新
        app.poll_background();

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if !input::handle_key_input(app, key) {
                    app.close_modal();
                    return Ok(()); // 退出应用
                }
            }
        }
    }
}
