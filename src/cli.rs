use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;

use crate::attachment::ImageJob;
use crate::config::{self, Config};
use crate::core::TaskStore;
use crate::fs::storage::parse_export;
use crate::models::{Priority, Status, Task, TaskDraft, TaskId};

/// 终端看板
#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "A kanban task board for the terminal")]
pub struct Cli {
    /// 覆盖配置中的数据文件
    #[arg(long, global = true, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List tasks, optionally filtered by status
    List {
        #[arg(long)]
        status: Option<Status>,
    },
    /// Show one task with its comments
    Show { id: TaskId },
    /// Create a task
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Image file to compress and attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Change fields of a task
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, conflicts_with = "remove_image")]
        image: Option<PathBuf>,
        #[arg(long)]
        remove_image: bool,
    },
    /// Move a task to another column
    Move {
        id: TaskId,
        #[arg(long)]
        to: Status,
    },
    /// Append a comment to a task
    Comment {
        id: TaskId,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Delete a task and its comments
    Delete {
        id: TaskId,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Print all tasks as JSON
    Export,
    /// Replace all tasks with the contents of an exported file
    Import { file: PathBuf },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
}

/// CLI 运行所需的上下文
pub struct CliContext<'a, R: BufRead, W: Write> {
    pub store: &'a mut TaskStore,
    pub config: &'a Config,
    pub runtime: &'a Handle,
    pub input: R,
    pub out: W,
}

/// 处理 CLI 命令
/// 返回 true 表示应该继续进入 TUI，false 表示已处理完毕应该退出
pub fn handle_cli<R: BufRead, W: Write>(
    command: Option<Commands>,
    ctx: &mut CliContext<'_, R, W>,
) -> Result<bool> {
    let Some(command) = command else {
        return Ok(true);
    };

    match command {
        Commands::List { status } => task_list(ctx, status)?,
        Commands::Show { id } => task_show(ctx, id)?,
        Commands::Add {
            title,
            description,
            priority,
            due,
            image,
        } => {
            let image = match image {
                Some(path) => Some(load_image(ctx, &path)?),
                None => None,
            };
            let draft = TaskDraft {
                title,
                description,
                priority: Some(priority),
                due_date: Some(due.unwrap_or_else(|| chrono::Local::now().date_naive())),
                image,
            };
            let id = ctx.store.create(draft)?;
            writeln!(ctx.out, "Created task #{}", id)?;
        }
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            image,
            remove_image,
        } => {
            let Some(task) = ctx.store.get(id) else {
                bail!("Task {} not found", id);
            };
            let mut draft = TaskDraft::from(task);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if priority.is_some() {
                draft.priority = priority;
            }
            if due.is_some() {
                draft.due_date = due;
            }
            if let Some(path) = image {
                draft.image = Some(load_image(ctx, &path)?);
            }
            if remove_image {
                draft.image = None;
            }
            ctx.store.update(id, draft)?;
            writeln!(ctx.out, "Updated task #{}", id)?;
        }
        Commands::Move { id, to } => {
            let Some(from) = ctx.store.get(id).map(|t| t.status) else {
                bail!("Task {} not found", id);
            };
            if ctx.store.set_status(id, to)? {
                writeln!(ctx.out, "Moved task #{} from '{}' to '{}'", id, from, to)?;
            } else {
                writeln!(ctx.out, "Task #{} is already in '{}'", id, to)?;
            }
        }
        Commands::Comment { id, text } => {
            let comment_id = ctx.store.add_comment(id, &text.join(" "))?;
            writeln!(ctx.out, "Added comment #{} to task #{}", comment_id, id)?;
        }
        Commands::Delete { id, yes } => task_delete(ctx, id, yes)?,
        Commands::Export => {
            let json = serde_json::to_string_pretty(ctx.store.all())?;
            writeln!(ctx.out, "{}", json)?;
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let tasks = parse_export(&content)
                .with_context(|| format!("{} is not a task export", file.display()))?;
            let count = tasks.len();
            ctx.store.replace_all(tasks)?;
            writeln!(ctx.out, "Imported {} tasks", count)?;
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => config::show_config(ctx.config, &mut ctx.out)?,
            ConfigAction::Path => writeln!(ctx.out, "{}", config::get_config_path().display())?,
            ConfigAction::Init => {
                let path = config::get_config_path();
                if path.exists() {
                    writeln!(ctx.out, "Config already exists: {}", path.display())?;
                } else {
                    config::save_config_to(&Config::default(), &path)?;
                    writeln!(ctx.out, "Wrote default config to {}", path.display())?;
                }
            }
        },
    }

    Ok(false)
}

fn load_image<R: BufRead, W: Write>(ctx: &CliContext<'_, R, W>, path: &Path) -> Result<String> {
    let job = ImageJob::from_file(ctx.runtime, path, ctx.config.codec_options())
        .with_context(|| format!("cannot attach {}", path.display()))?;
    let encoded = ctx
        .runtime
        .block_on(job.wait())
        .with_context(|| format!("cannot attach {}", path.display()))?;
    Ok(encoded.data_uri)
}

fn task_list<R: BufRead, W: Write>(ctx: &mut CliContext<'_, R, W>, status: Option<Status>) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let tasks: Vec<&Task> = ctx
        .store
        .all()
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();

    if tasks.is_empty() {
        writeln!(ctx.out, "No tasks found.")?;
        return Ok(());
    }

    writeln!(
        ctx.out,
        "ID             TITLE                                PRIORITY  DUE         STATUS"
    )?;
    writeln!(
        ctx.out,
        "-------------  -----------------------------------  --------  ----------  -----------"
    )?;

    for task in tasks {
        let mut due = task.due_date.format("%Y-%m-%d").to_string();
        if task.is_overdue(today) {
            due.push('!');
        }
        writeln!(
            ctx.out,
            "{:<13}  {:<35}  {:<8}  {:<10}  {}",
            task.id,
            truncate(&task.title, 35),
            task.priority,
            due,
            task.status
        )?;
    }

    Ok(())
}

fn task_show<R: BufRead, W: Write>(ctx: &mut CliContext<'_, R, W>, id: TaskId) -> Result<()> {
    let Some(task) = ctx.store.get(id) else {
        bail!("Task {} not found", id);
    };

    writeln!(ctx.out, "Task #{}", task.id)?;
    writeln!(ctx.out, "Title: {}", task.title)?;
    writeln!(ctx.out, "Status: {}", task.status.label())?;
    writeln!(ctx.out, "Priority: {}", task.priority.label())?;
    writeln!(ctx.out, "Due: {}", task.due_date.format("%Y-%m-%d"))?;
    writeln!(
        ctx.out,
        "Image: {}",
        if task.image.is_some() { "attached" } else { "-" }
    )?;
    if !task.description.is_empty() {
        writeln!(ctx.out, "\n{}", task.description)?;
    }
    if !task.comments.is_empty() {
        writeln!(ctx.out, "\nComments:")?;
        for comment in &task.comments {
            writeln!(
                ctx.out,
                "  [{}] {}",
                comment.timestamp.format("%Y-%m-%d %H:%M"),
                comment.text
            )?;
        }
    }

    Ok(())
}

fn task_delete<R: BufRead, W: Write>(ctx: &mut CliContext<'_, R, W>, id: TaskId, yes: bool) -> Result<()> {
    let Some(task) = ctx.store.get(id) else {
        bail!("Task {} not found", id);
    };

    if !yes {
        write!(ctx.out, "Delete task #{} \"{}\"? [y/N] ", id, task.title)?;
        ctx.out.flush()?;
        let mut answer = String::new();
        ctx.input.read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            writeln!(ctx.out, "Cancelled")?;
            return Ok(());
        }
    }

    ctx.store.remove(id)?;
    writeln!(ctx.out, "Deleted task #{}", id)?;
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    }
}
