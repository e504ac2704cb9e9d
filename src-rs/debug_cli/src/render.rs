use std::io::{self, Write};

use crate::models::{CLIConfig, TaskInfo, TaskListItem};

pub fn banner(cfg: &CLIConfig) {
    println!("Task Tracker Debug CLI");
    println!("API: {}", cfg.base_url);
    println!("Type /help for commands.");
}

pub fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub fn help() {
    println!("Commands:");
    println!("  /help                          Show commands");
    println!("  /exit | /quit                  Exit");
    println!("  /create                        Create a task");
    println!("  /get [id]                      Show a task");
    println!("  /list                          List all tasks");
    println!("  /filter [status|-] [limit] [offset]");
    println!("                                 Filter tasks by status, paged");
    println!("  /cancel [id]                   Cancel a running task");
    println!("  /delete [id]                   Delete a task");
    println!("  /watch [id]                    Poll a task until it finishes");
    println!("  /health                        Check the server");
    println!("  /config                        Show current config");
    println!("  /base <url>                    Update base URL");
    println!("Without an id, commands use the last created task.");
}

pub fn task(task: &TaskInfo) {
    println!("task {}", task.id);
    println!("  status:   {}", task.status);
    println!("  created:  {}", task.created_at);
    if let Some(started) = &task.started_at {
        println!("  started:  {}", started);
    }
    if let Some(ended) = &task.ended_at {
        println!("  ended:    {}", ended);
    }
    if let Some(duration) = &task.duration {
        println!("  duration: {}", duration);
    }
    if let Some(result) = &task.result {
        println!("  result:   {}", result);
    }
}

pub fn status_line(task: &TaskInfo) {
    println!("[{}] {}", task.status, task.id);
}

pub fn tasks(tasks: &[TaskInfo]) {
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        status_line(task);
    }
}

pub fn list(items: &[TaskListItem]) {
    if items.is_empty() {
        println!("no tasks");
        return;
    }
    for item in items {
        match &item.duration {
            Some(duration) => println!("[{}] {} ({})", item.status, item.id, duration),
            None => println!("[{}] {}", item.status, item.id),
        }
    }
}

pub fn config(cfg: &CLIConfig) {
    println!("config:");
    println!("  base: {}", cfg.base_url);
    println!("  poll: {}ms", cfg.poll_interval_ms);
    println!("  timeout: {}s", cfg.timeout_secs);
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}
