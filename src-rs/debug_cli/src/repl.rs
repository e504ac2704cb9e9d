use std::io;
use std::thread;
use std::time::Duration;

use crate::client::HTTPClient;
use crate::models::CLIConfig;
use crate::render;

const MAX_WATCH_POLLS: usize = 600;

pub struct REPL {
    pub config: CLIConfig,
    pub client: HTTPClient,
    pub last_id: Option<String>,
}

impl REPL {
    pub fn new(config: CLIConfig, client: HTTPClient) -> Self {
        Self {
            config,
            client,
            last_id: None,
        }
    }

    pub fn run(&mut self) {
        render::banner(&self.config);
        loop {
            render::prompt();
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.handle_command(line) {
                break;
            }
        }
    }

    fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("").trim_start_matches('/');
        let args: Vec<&str> = parts.collect();
        match cmd {
            "exit" | "quit" => return true,
            "help" => render::help(),
            "create" => match self.client.create() {
                Ok(task) => {
                    self.last_id = Some(task.id.clone());
                    render::task(&task);
                }
                Err(err) => render::error(&err),
            },
            "get" => {
                if let Some(id) = self.resolve_id(&args) {
                    match self.client.get(&id) {
                        Ok(task) => render::task(&task),
                        Err(err) => render::error(&err),
                    }
                }
            }
            "list" => match self.client.list() {
                Ok(items) => render::list(&items),
                Err(err) => render::error(&err),
            },
            "filter" => {
                let status = args.first().copied().filter(|s| *s != "-");
                let limit = args.get(1).and_then(|raw| raw.parse::<usize>().ok());
                let offset = args.get(2).and_then(|raw| raw.parse::<usize>().ok());
                match self.client.filter(status, limit, offset) {
                    Ok(tasks) => render::tasks(&tasks),
                    Err(err) => render::error(&err),
                }
            }
            "cancel" => {
                if let Some(id) = self.resolve_id(&args) {
                    match self.client.cancel(&id) {
                        Ok(()) => render::info(&format!("cancel requested for {}", id)),
                        Err(err) => render::error(&err),
                    }
                }
            }
            "delete" => {
                if let Some(id) = self.resolve_id(&args) {
                    match self.client.delete(&id) {
                        Ok(()) => {
                            if self.last_id.as_deref() == Some(id.as_str()) {
                                self.last_id = None;
                            }
                            render::info(&format!("deleted {}", id));
                        }
                        Err(err) => render::error(&err),
                    }
                }
            }
            "watch" => {
                if let Some(id) = self.resolve_id(&args) {
                    self.watch(&id);
                }
            }
            "health" => match self.client.health() {
                Ok(body) => render::info(&format!("health: {}", body)),
                Err(err) => render::error(&err),
            },
            "config" => render::config(&self.config),
            "base" => match args.first() {
                None => render::info(&format!("base: {}", self.config.base_url)),
                Some(url) => match HTTPClient::new(url, self.config.timeout_secs) {
                    Ok(client) => {
                        self.config.base_url = url.to_string();
                        self.client = client;
                        render::info("base url updated");
                    }
                    Err(err) => render::error(&err),
                },
            },
            _ => render::info("unknown command, type /help"),
        }
        false
    }

    /// Explicit id argument, else the last created task.
    fn resolve_id(&self, args: &[&str]) -> Option<String> {
        match args.first() {
            Some(id) => Some(id.to_string()),
            None => {
                if self.last_id.is_none() {
                    render::error("task id required");
                }
                self.last_id.clone()
            }
        }
    }

    fn watch(&self, id: &str) {
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(50));
        let mut last_status = String::new();
        for _ in 0..MAX_WATCH_POLLS {
            match self.client.get(id) {
                Ok(task) => {
                    if task.status != last_status {
                        render::status_line(&task);
                        last_status = task.status.clone();
                    }
                    if task.is_terminal() {
                        render::task(&task);
                        return;
                    }
                }
                Err(err) => {
                    render::error(&err);
                    return;
                }
            }
            thread::sleep(interval);
        }
        render::info("stopped watching");
    }
}
