//! Interactive terminal driver
//!
//! Owns every view and is the only task that mutates them. Input lines,
//! live events and finished requests all arrive on channels and are handled
//! one at a time in a single `select!` loop.

use crate::command::{Command, HELP};
use crate::logtail::{spawn_log_tail, LogTailConfig};
use crate::render;
use crate::route::Route;
use crate::shell::{AppShell, ShellLoad};
use crate::sidebar::{LinePrompt, Sidebar};
use crate::viewer::{ViewKind, Viewer};
use reskit_core::{ProjectId, ResearchApi, Result, Session, User};
use reskit_provider_live::{LiveChannel, LiveClient, LiveConfig, LiveEvent};
use reskit_view_chat::{ChatUpdate, ChatView, TimelineEntry};
use reskit_view_search::{SearchUpdate, SearchView};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const LIVE_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Terminal options
#[derive(Debug, Clone, Default)]
pub struct TerminalConfig {
    /// Log events mirrored on screen
    pub log_tail: LogTailConfig,
}

enum Flow {
    Stay,
    Navigate(Route),
    Exit,
}

/// Line-oriented front-end over the API and the live channel
pub struct Terminal {
    api: Arc<dyn ResearchApi>,
    session: Session,
    live: LiveConfig,
    config: TerminalConfig,
}

impl Terminal {
    /// Create a terminal front-end
    pub fn new(
        api: Arc<dyn ResearchApi>,
        session: Session,
        live: LiveConfig,
        config: TerminalConfig,
    ) -> Self {
        Self {
            api,
            session,
            live,
            config,
        }
    }

    /// Follow routes until the user quits, presses Ctrl-C or lands on `/auth`
    pub async fn run(&self, start: Route) -> Result<()> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_with(start, spawn_stdin_lines(), ctrl_c).await
    }

    /// [`Terminal::run`] over a given line source and shutdown signal
    ///
    /// When `shutdown` resolves the active views are unmounted the same way
    /// `/quit` unmounts them.
    pub async fn run_with<F>(
        &self,
        start: Route,
        mut lines: mpsc::UnboundedReceiver<String>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let _tail = spawn_log_tail(self.config.log_tail.clone());
        tokio::pin!(shutdown);
        let mut route = start;

        loop {
            info!(%route, "Opening route");
            let next = match &route {
                Route::Auth => {
                    println!("You are not signed in. Run `reskit login` or `reskit register`.");
                    None
                }
                Route::App { project_id } => {
                    self.run_app(project_id.clone(), &mut lines, shutdown.as_mut())
                        .await?
                }
            };
            match next {
                Some(next) => route = next,
                None => break,
            }
        }
        Ok(())
    }

    async fn run_app<F>(
        &self,
        requested: Option<ProjectId>,
        lines: &mut mpsc::UnboundedReceiver<String>,
        mut shutdown: Pin<&mut F>,
    ) -> Result<Option<Route>>
    where
        F: Future<Output = ()>,
    {
        let shell = match AppShell::load(self.api.as_ref(), &self.session).await {
            ShellLoad::Ready(shell) => shell,
            ShellLoad::Redirect(route) => return Ok(Some(route)),
        };

        let mut client = LiveClient::new(self.live.clone());
        let mut live_events = match client.connect().await {
            Ok(events) => Some(events),
            Err(e) => {
                warn!(error = %e, "Live channel unavailable; chat will not update by itself");
                None
            }
        };
        let live: Arc<dyn LiveChannel> = Arc::new(client);

        let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
        let (search_tx, mut search_rx) = mpsc::unbounded_channel();
        let mut screen = Screen::new(
            self.api.clone(),
            self.session.clone(),
            shell,
            requested,
            live,
            chat_tx,
            search_tx,
        );
        screen.greet();

        let flow = loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        break None;
                    };
                    match screen.handle(Command::parse(&line), lines).await {
                        Flow::Stay => {}
                        Flow::Navigate(route) => break Some(route),
                        Flow::Exit => break None,
                    }
                }
                event = next_live_event(&mut live_events) => match event {
                    Some(event) => screen.on_live_event(event),
                    None => {
                        debug!("Live channel stream ended");
                        live_events = None;
                    }
                },
                Some(update) = chat_rx.recv() => screen.on_chat_update(update),
                Some(update) = search_rx.recv() => screen.on_search_update(update),
                _ = shutdown.as_mut() => {
                    info!("Shutting down");
                    break None;
                }
            }
        };

        screen.chat.unmount();
        // let the leave and close frames reach the server
        if let Some(events) = live_events.as_mut() {
            let drained = tokio::time::timeout(LIVE_CLOSE_GRACE, async {
                while events.recv().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!("Live channel did not close in time");
            }
        }
        Ok(flow)
    }
}

async fn next_live_event(events: &mut Option<mpsc::UnboundedReceiver<LiveEvent>>) -> Option<LiveEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

fn spawn_stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Error reading input");
                    break;
                }
            }
        }
    });
    rx
}

/// Rows of the chat already on screen
#[derive(Debug, Default)]
struct ChatPane {
    epoch: u64,
    printed: usize,
    failures: usize,
}

impl ChatPane {
    fn refresh(&mut self, chat: &ChatView, me: Option<&User>, reprint: bool) {
        if reprint || chat.epoch() != self.epoch || chat.messages().len() < self.printed {
            self.epoch = chat.epoch();
            self.printed = 0;
            self.failures = 0;
        }

        let timeline = chat.timeline();
        let committed: Vec<_> = timeline
            .iter()
            .filter(|row| matches!(row, TimelineEntry::Committed { .. }))
            .collect();
        for row in committed.iter().skip(self.printed) {
            println!("{}", render::timeline_row(row, me));
        }
        self.printed = committed.len();

        let failed: Vec<_> = chat.failed().collect();
        for (text, reason) in failed.iter().skip(self.failures) {
            println!("! Not delivered ({}): {}", reason, text);
        }
        self.failures = failed.len();
    }
}

struct Screen {
    api: Arc<dyn ResearchApi>,
    session: Session,
    user: User,
    viewer: Viewer,
    sidebar: Sidebar,
    chat: ChatView,
    search: SearchView,
    pane: ChatPane,
}

impl Screen {
    fn new(
        api: Arc<dyn ResearchApi>,
        session: Session,
        shell: AppShell,
        requested: Option<ProjectId>,
        live: Arc<dyn LiveChannel>,
        chat_updates: mpsc::UnboundedSender<ChatUpdate>,
        search_updates: mpsc::UnboundedSender<SearchUpdate>,
    ) -> Self {
        let viewer = Viewer::new(requested.as_ref(), &shell.projects);
        let sidebar = Sidebar::new(shell.projects, viewer.project().cloned());
        let mut chat = ChatView::new(api.clone(), live, Some(shell.user.clone()), chat_updates);
        chat.set_project(viewer.project().cloned());
        let search = SearchView::new(api.clone(), search_updates);
        Self {
            api,
            session,
            user: shell.user,
            viewer,
            sidebar,
            chat,
            search,
            pane: ChatPane::default(),
        }
    }

    fn greet(&self) {
        println!("Signed in as {}", self.user.username);
        println!("{}", render::project_list(self.sidebar.projects(), self.sidebar.active()));
        match self.viewer.project() {
            Some(id) => println!("[chat] project {}  (/help for commands)", id),
            None => println!("[chat] no project  (/help for commands)"),
        }
    }

    async fn handle(&mut self, command: Command, lines: &mut mpsc::UnboundedReceiver<String>) -> Flow {
        match command {
            Command::Text(text) => match self.viewer.kind() {
                ViewKind::Chat => {
                    self.chat.set_composer(text);
                    if self.chat.send().is_some() {
                        println!("  (sending)");
                    } else if self.chat.project().is_none() {
                        println!("Create a project first with /new <name>.");
                    }
                }
                ViewKind::Search => {
                    self.search.set_query(text);
                    if self.search.submit().is_some() {
                        println!("Searching {}...", self.search.category());
                    }
                }
            },
            Command::View(kind) => {
                self.viewer.switch(kind);
                match kind {
                    ViewKind::Chat => self.pane.refresh(&self.chat, Some(&self.user), true),
                    ViewKind::Search => println!("[search] category: {}", self.search.category()),
                }
            }
            Command::Category(category) => {
                self.search.set_category(category);
                println!("Category: {}", category);
                if self.viewer.kind() == ViewKind::Search && self.search.submit().is_some() {
                    println!("Searching {}...", category);
                }
            }
            Command::Projects => {
                println!("{}", render::project_list(self.sidebar.projects(), self.sidebar.active()));
            }
            Command::Open(id) => return Flow::Navigate(self.sidebar.open_project(id)),
            Command::New(name) => {
                let route = match name {
                    Some(name) => self.sidebar.create_named(self.api.as_ref(), &name).await,
                    None => {
                        let mut prompt = LinePrompt::new(lines, tokio::io::stdout());
                        self.sidebar.create_project(self.api.as_ref(), &mut prompt).await
                    }
                };
                match route {
                    Some(route) => return Flow::Navigate(route),
                    None => println!("No project created."),
                }
            }
            Command::Attach(paths) => {
                for path in self.chat.attach(&paths) {
                    println!("Skipped {}: only pdf, image and text files can be attached.", path.display());
                }
                if self.chat.uploads_in_flight() > 0 {
                    println!("Uploading {} file(s)...", self.chat.uploads_in_flight());
                }
            }
            Command::Detach(file_id) => {
                if self.chat.remove_attachment(&file_id) {
                    println!("Removed {}", file_id);
                } else {
                    println!("No attachment {}", file_id);
                }
            }
            Command::History => self.pane.refresh(&self.chat, Some(&self.user), true),
            Command::Logout => {
                if let Err(e) = self.session.end() {
                    error!(error = %e, "Error clearing session");
                }
                return Flow::Navigate(self.sidebar.go_to_auth());
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Exit,
            Command::Empty => {}
            Command::Invalid(reason) => println!("{}", reason),
        }
        Flow::Stay
    }

    fn on_live_event(&mut self, event: LiveEvent) {
        self.chat.handle_live_event(event);
        if self.viewer.kind() == ViewKind::Chat {
            self.pane.refresh(&self.chat, Some(&self.user), false);
        }
    }

    fn on_chat_update(&mut self, update: ChatUpdate) {
        let reprint = matches!(update, ChatUpdate::History { .. });
        let attached = self.chat.attachments().len();
        self.chat.apply(update);

        for attachment in self.chat.attachments().iter().skip(attached) {
            println!("Attached {} as {}", attachment.name, attachment.file_id);
        }
        if self.viewer.kind() == ViewKind::Chat {
            self.pane.refresh(&self.chat, Some(&self.user), reprint);
        }
    }

    fn on_search_update(&mut self, update: SearchUpdate) {
        if !self.search.apply(update) {
            return;
        }
        match self.search.error() {
            Some(message) => println!("{}", message),
            None => println!("{}", render::search_results(self.search.results())),
        }
    }
}
