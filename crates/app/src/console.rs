//! Line-oriented console over a [`SessionController`].
//!
//! Reads commands from any async line source and writes results and notices
//! to any async sink, so the same loop serves stdin/stdout and tests.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use stocktake_infra::{InventoryStore, Outcome};
use stocktake_inventory::{Item, SortKey, StatusFilter};

use crate::notice::Notice;
use crate::session::{CodeLookup, Confirmation, SessionController, SessionError, persistence_notice};

pub const HELP: &str = "\
commands:
  <code> | scan <code>     look up an item (offers to create unknown codes)
  q <n> | qty <n>          add a counted quantity to the selected item (0N subtracts N)
  filter <status>          all, unchecked, match, shortage, excess
  search <text>            filter by code or name
  sort <key>               import, code, name, status
  list                     show the filtered item list
  diff                     show shortages and excesses
  stats                    show progress and per-status counts
  open <path>              import a workbook (replaces current data)
  save [path]              export the reconciliation report
  clear                    delete all data (asks for confirmation)
  help                     show this text
  quit                     exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan(String),
    Quantity(String),
    Filter(String),
    Search(String),
    Sort(String),
    List,
    Diff,
    Stats,
    Open(PathBuf),
    Save(Option<PathBuf>),
    Clear,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`; anything that is not a
    /// keyword is treated as a code.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };

        let cmd = match (word.to_lowercase().as_str(), rest.is_empty()) {
            ("scan", false) => Command::Scan(rest.to_string()),
            ("q" | "qty", _) => Command::Quantity(rest.to_string()),
            ("filter", _) => Command::Filter(rest.to_string()),
            ("search", _) => Command::Search(rest.to_string()),
            ("sort", _) => Command::Sort(rest.to_string()),
            ("list" | "ls", true) => Command::List,
            ("diff", true) => Command::Diff,
            ("stats", true) => Command::Stats,
            ("open", false) => Command::Open(PathBuf::from(rest)),
            ("save", true) => Command::Save(None),
            ("save", false) => Command::Save(Some(PathBuf::from(rest))),
            ("clear", true) => Command::Clear,
            ("help" | "?", true) => Command::Help,
            ("quit" | "exit", true) => Command::Quit,
            _ => Command::Scan(line.to_string()),
        };
        Some(cmd)
    }
}

pub struct Console<S, R, W>
where
    S: InventoryStore + ?Sized + 'static,
{
    session: SessionController<S>,
    input: Lines<R>,
    out: W,
}

impl<S, R, W> Console<S, R, W>
where
    S: InventoryStore + ?Sized + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: SessionController<S>, input: R, out: W) -> Self {
        Self {
            session,
            input: input.lines(),
            out,
        }
    }

    /// Run until `quit` or end of input, then hand the session back.
    pub async fn run(mut self) -> std::io::Result<SessionController<S>> {
        self.say("stocktake ready; type 'help' for commands").await?;

        loop {
            self.prompt("> ").await?;
            let Some(line) = self.input.next_line().await? else {
                break;
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if command == Command::Quit {
                break;
            }
            self.dispatch(command).await?;

            for notice in self.session.drain_persistence_failures() {
                self.notify(&notice).await?;
            }
        }

        self.session.flush().await;
        for notice in self.session.drain_persistence_failures() {
            self.notify(&notice).await?;
        }
        self.out.flush().await?;
        Ok(self.session)
    }

    async fn dispatch(&mut self, command: Command) -> std::io::Result<()> {
        match command {
            Command::Scan(code) => self.scan(&code).await,
            Command::Quantity(raw) => {
                let result = self.session.submit_quantity(&raw).await;
                self.report_item(result, "counted").await
            }
            Command::Filter(raw) => match raw.parse::<StatusFilter>() {
                Ok(filter) => {
                    self.session.set_status_filter(filter);
                    self.list().await
                }
                Err(err) => self.notify(&Notice::error(err.to_string())).await,
            },
            Command::Search(text) => {
                self.session.set_search(text);
                self.list().await
            }
            Command::Sort(raw) => match raw.parse::<SortKey>() {
                Ok(sort) => {
                    self.session.set_sort(sort);
                    self.list().await
                }
                Err(err) => self.notify(&Notice::error(err.to_string())).await,
            },
            Command::List => self.list().await,
            Command::Diff => self.diff().await,
            Command::Stats => self.stats().await,
            Command::Open(path) => match self.session.import_workbook(&path).await {
                Ok(outcome) => {
                    self.notify(&Notice::success(format!("file loaded: {} items", outcome.value)))
                        .await?;
                    self.warn_unsaved(&outcome).await
                }
                Err(err) => self.notify(&Notice::error(err.to_string())).await,
            },
            Command::Save(path) => match self.session.export_report(path.as_deref()) {
                Ok(target) => {
                    self.notify(&Notice::success(format!("report saved: {}", target.display())))
                        .await
                }
                Err(err) => self.notify(&Notice::error(err.to_string())).await,
            },
            Command::Clear => self.clear().await,
            Command::Help => self.say(HELP).await,
            Command::Quit => Ok(()),
        }
    }

    async fn scan(&mut self, raw: &str) -> std::io::Result<()> {
        match self.session.submit_code(raw) {
            Ok(CodeLookup::Found(item)) => {
                self.say(&describe(&item)).await?;
                self.notify(&Notice::info(format!("found: {}", item.name()))).await
            }
            Ok(CodeLookup::Missing(code)) => {
                self.prompt(&format!("item {code} not found; name for new item (blank to cancel): "))
                    .await?;
                let name = self.input.next_line().await?.unwrap_or_default();
                let result = self.session.create_item(code, &name).await;
                self.report_item(result, "new item added").await
            }
            Err(err) => self.notify(&Notice::error(err.to_string())).await,
        }
    }

    async fn clear(&mut self) -> std::io::Result<()> {
        self.prompt("type 'yes' to delete all inventory data: ").await?;
        let answer = self.input.next_line().await?.unwrap_or_default();
        let confirmation = if answer.trim().eq_ignore_ascii_case("yes") {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        };

        match self.session.clear_all(confirmation).await {
            Ok(outcome) => {
                self.notify(&Notice::success("all data cleared")).await?;
                self.warn_unsaved(&outcome).await
            }
            Err(SessionError::ConfirmationRequired) => self.notify(&Notice::info("clear cancelled")).await,
            Err(err) => self.notify(&Notice::error(err.to_string())).await,
        }
    }

    async fn report_item(
        &mut self,
        result: Result<Outcome<Item>, SessionError>,
        verb: &str,
    ) -> std::io::Result<()> {
        match result {
            Ok(outcome) => {
                self.say(&describe(&outcome.value)).await?;
                self.notify(&Notice::success(format!("{verb}: {}", outcome.value.name())))
                    .await?;
                self.warn_unsaved(&outcome).await
            }
            Err(SessionError::Cancelled) => self.notify(&Notice::info("item creation cancelled")).await,
            Err(err) => self.notify(&Notice::error(err.to_string())).await,
        }
    }

    async fn warn_unsaved<T>(&mut self, outcome: &Outcome<T>) -> std::io::Result<()> {
        match persistence_notice(outcome) {
            Some(notice) => self.notify(&notice).await,
            None => Ok(()),
        }
    }

    async fn list(&mut self) -> std::io::Result<()> {
        let mut text = String::new();
        let view = self.session.view();
        if view.rows.is_empty() {
            text.push_str("(no items)");
        }
        for item in &view.rows {
            text.push_str(&table_row(item));
            text.push('\n');
        }
        let shown = view.rows.len();
        let total = view.stats.total;
        self.say(text.trim_end()).await?;
        self.say(&format!("{shown} of {total} items")).await
    }

    async fn diff(&mut self) -> std::io::Result<()> {
        let rows = self.session.discrepancies();
        if rows.is_empty() {
            return self.say("no discrepancies").await;
        }
        let mut text = String::new();
        for row in &rows {
            text.push_str(&format!(
                "{:<14} {:<28} expected {:>6}  actual {:>6}  {:+}\n",
                row.code, row.name, row.expected, row.actual, row.difference
            ));
        }
        self.say(text.trim_end()).await
    }

    async fn stats(&mut self) -> std::io::Result<()> {
        let stats = self.session.view().stats;
        let mut text = format!(
            "checked {}/{} ({:.0}%)  match {}  shortage {}  excess {}  unchecked {}",
            stats.checked,
            stats.total,
            stats.progress_percent(),
            stats.matched,
            stats.shortage,
            stats.excess,
            stats.unchecked
        );
        if let Some(meta) = self.session.engine().metadata() {
            text.push_str(&format!(
                "\nsource: {} (loaded {})",
                meta.source_name,
                meta.loaded_at.format("%Y-%m-%d %H:%M")
            ));
        }
        self.say(&text).await
    }

    async fn notify(&mut self, notice: &Notice) -> std::io::Result<()> {
        self.say(&notice.to_string()).await
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn prompt(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await
    }
}

fn quantity(q: Option<u64>) -> String {
    q.map_or_else(|| "-".to_string(), |q| q.to_string())
}

fn describe(item: &Item) -> String {
    format!(
        "{} | {} | expected {} | actual {} | {}",
        item.code(),
        item.name(),
        item.expected_quantity(),
        quantity(item.actual_quantity()),
        item.status().label()
    )
}

fn table_row(item: &Item) -> String {
    format!(
        "{:<14} {:<28} {:>6} {:>6}  {}",
        item.code().as_str(),
        item.name(),
        item.expected_quantity(),
        quantity(item.actual_quantity()),
        item.status().label()
    )
}
