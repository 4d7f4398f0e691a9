//! App state and main loop: input handling, background polling, per-tab actions and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hostdash_client::api::DEFAULT_PROCESS_PAGE_SIZE;
use hostdash_client::listing::{AlertListState, BulkAction, BulkPlan, Sort};
use hostdash_client::types::{
    AgentId, AlertFilters, AlertId, AlertLevel, AlertType, MetricsQuery, NotificationChannel,
    ProcessSnapshot, Threshold,
};
use hostdash_client::workflow::ApprovalQueues;
use hostdash_client::{ApiClient, ApiError, PollingStore, Snapshot};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::ui::alerts::draw_alerts;
use crate::ui::form::{draw_form, Form, FormInput};
use crate::ui::header::{draw_footer, draw_header, draw_tabs};
use crate::ui::login::{
    draw_login, registration_form, registration_from_form, LoginForm, LoginInput,
};
use crate::ui::modal::{draw_confirm, draw_input, draw_message};
use crate::ui::overview::{draw_agents, draw_metrics, draw_recent_alerts, draw_stats};
use crate::ui::processes::{
    draw_processes, merged_rows, processes_clamp, processes_handle_key, ProcSortBy,
};
use crate::ui::registrations::{draw_registrations, QueueFocus};
use crate::ui::settings::{
    channel_form, channel_from_form, draw_settings, threshold_form, threshold_from_form,
    SettingsDraft, SettingsFocus,
};

const METRICS_HOURS: u32 = 24;
const PROCS_INTERVAL: Duration = Duration::from_secs(5);
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Alerts,
    Registrations,
    Settings,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Overview, Tab::Alerts, Tab::Registrations, Tab::Settings];

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn hints(self) -> &'static str {
        match self {
            Tab::Overview => "↑↓ agent  j/k PgUp/PgDn processes  s sort  A (de)activate  r refresh",
            Tab::Alerts => "space select  a all  c clear  R/U/D bulk  x/u/d row  n note  f/l/t/h filter  o/O sort  ←→ page",
            Tab::Registrations => "←→ queue  ↑↓ move  y approve  x reject/disapprove  r refresh",
            Tab::Settings => "←→ list  ↑↓ move  n new  e edit  space toggle active  d delete  r refresh",
        }
    }
}

/// Writes that wait for a yes/no.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Bulk(BulkPlan),
    DeleteAlert(AlertId),
    SetAgentActive { id: AgentId, host: String, active: bool },
    DeleteThreshold { id: i64, name: String },
    DeleteChannel { id: i64, name: String },
}

impl Pending {
    fn prompt(&self) -> String {
        match self {
            Pending::Bulk(plan) => plan.prompt(),
            Pending::DeleteAlert(id) => format!("Delete alert #{id}?"),
            Pending::SetAgentActive { host, active, .. } => {
                format!("{} agent {host}?", if *active { "Activate" } else { "Deactivate" })
            }
            Pending::DeleteThreshold { name, .. } => format!("Delete threshold '{name}'?"),
            Pending::DeleteChannel { name, .. } => format!("Delete notification channel '{name}'?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Modal {
    Confirm(Pending),
    Note {
        alert: AlertId,
        text: String,
        error: Option<String>,
    },
    /// Text lives in the approval queues' draft.
    Reason,
    SettingsForm {
        form: Form,
        draft: SettingsDraft,
    },
    Message(String),
}

enum Screen {
    Login(LoginForm),
    Register(Form),
    Main,
}

fn is_due(last: Option<Instant>, every: Duration, now: Instant) -> bool {
    last.map_or(true, |t| now.saturating_duration_since(t) >= every)
}

fn clamp_cursor(cursor: &mut usize, len: usize) {
    *cursor = (*cursor).min(len.saturating_sub(1));
}

fn move_cursor(cursor: &mut usize, key: KeyCode, len: usize) {
    match key {
        KeyCode::Up => *cursor = cursor.saturating_sub(1),
        KeyCode::Down => *cursor = cursor.saturating_add(1),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = len,
        _ => {}
    }
    clamp_cursor(cursor, len);
}

fn next_resolved_filter(v: Option<bool>) -> Option<bool> {
    match v {
        None => Some(false),
        Some(false) => Some(true),
        Some(true) => None,
    }
}

fn next_level_filter(v: Option<AlertLevel>) -> Option<AlertLevel> {
    match v {
        None => Some(AlertLevel::ALL[0]),
        Some(level) => AlertLevel::ALL
            .iter()
            .position(|l| *l == level)
            .and_then(|i| AlertLevel::ALL.get(i + 1).copied()),
    }
}

fn next_type_filter(v: Option<AlertType>) -> Option<AlertType> {
    match v {
        None => Some(AlertType::ALL[0]),
        Some(kind) => AlertType::ALL
            .iter()
            .position(|t| *t == kind)
            .and_then(|i| AlertType::ALL.get(i + 1).copied()),
    }
}

/// All agents, then each known agent id in turn, then back to all.
fn next_agent_filter(current: Option<&str>, agents: &[AgentId]) -> Option<String> {
    let next = match current {
        None => agents.first(),
        Some(cur) => agents
            .iter()
            .position(|id| id.to_string() == cur)
            .and_then(|i| agents.get(i + 1)),
    };
    next.map(|id| id.to_string())
}

pub struct App {
    client: ApiClient,
    api_label: String,
    poll_interval: Duration,
    store: Option<PollingStore<ApiClient>>,
    snapshot: Snapshot,
    screen: Screen,
    tab: Tab,
    modal: Option<Modal>,
    status: Option<String>,
    should_quit: bool,
    last_email: String,

    // Overview
    agent_cursor: usize,
    metrics_agent: Option<AgentId>,
    processes: Option<ProcessSnapshot>,
    procs_scroll: usize,
    procs_sort: ProcSortBy,
    last_procs_poll: Option<Instant>,
    last_procs_area: Option<Rect>,

    // Alerts
    alerts: AlertListState,
    alert_cursor: usize,
    alerts_stale: bool,
    last_alerts_fetch: Option<Instant>,

    // Registrations
    queues: ApprovalQueues,
    queue_focus: QueueFocus,
    queue_cursor: usize,
    queues_stale: bool,

    // Settings
    thresholds: Vec<Threshold>,
    channels: Vec<NotificationChannel>,
    settings_focus: SettingsFocus,
    settings_cursor: usize,
    settings_stale: bool,
}

impl App {
    pub fn new(client: ApiClient, poll_interval: Duration) -> Self {
        let api_label = client.base_url().as_str().trim_end_matches('/').to_string();
        Self {
            client,
            api_label,
            poll_interval,
            store: None,
            snapshot: Snapshot::default(),
            screen: Screen::Login(LoginForm::default()),
            tab: Tab::Overview,
            modal: None,
            status: None,
            should_quit: false,
            last_email: String::new(),
            agent_cursor: 0,
            metrics_agent: None,
            processes: None,
            procs_scroll: 0,
            procs_sort: ProcSortBy::CpuDesc,
            last_procs_poll: None,
            last_procs_area: None,
            alerts: AlertListState::default(),
            alert_cursor: 0,
            alerts_stale: true,
            last_alerts_fetch: None,
            queues: ApprovalQueues::default(),
            queue_focus: QueueFocus::Requests,
            queue_cursor: 0,
            queues_stale: true,
            thresholds: Vec::new(),
            channels: Vec::new(),
            settings_focus: SettingsFocus::Thresholds,
            settings_cursor: 0,
            settings_stale: true,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        if self.client.session().is_authenticated().await {
            self.enter_main().await;
        }

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        if let Some(store) = self.store.take() {
            store.shutdown();
        }
        info!("hostdash exiting");
        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind == KeyEventKind::Press {
                        self.handle_key(k).await;
                    }
                }
            }
            if self.should_quit {
                break;
            }

            self.tick().await;
            terminal.draw(|f| self.draw(f))?;
            sleep(TICK).await;
        }
        Ok(())
    }

    // ---------- session ----------

    async fn enter_main(&mut self) {
        self.client.initialize_csrf().await;
        let store = PollingStore::with_interval(self.client.clone(), self.poll_interval);
        store.start();
        self.store = Some(store);
        self.screen = Screen::Main;
        self.alerts_stale = true;
        self.queues_stale = true;
        self.settings_stale = true;
        self.metrics_agent = None;
    }

    fn expire_session(&mut self) {
        info!("session expired, back to login");
        // dropping the store stops its poller
        self.store = None;
        self.snapshot = Snapshot::default();
        self.modal = None;
        self.screen = Screen::Login(LoginForm::expired(&self.last_email));
    }

    /// Route a failed write: expired sessions go to login, the rest become a message.
    fn fail(&mut self, e: ApiError) {
        if e.is_session_expired() {
            self.expire_session();
        } else {
            debug!(error = %e, "action failed");
            self.modal = Some(Modal::Message(e.user_message()));
        }
    }

    async fn logout(&mut self) {
        self.client.logout().await;
        self.store = None;
        self.snapshot = Snapshot::default();
        self.screen = Screen::Login(LoginForm {
            email: self.last_email.clone(),
            ..LoginForm::default()
        });
    }

    // ---------- periodic work ----------

    async fn tick(&mut self) {
        if !matches!(self.screen, Screen::Main) {
            return;
        }
        if !self.client.session().is_authenticated().await {
            self.expire_session();
            return;
        }
        if let Some(store) = self.store.as_ref() {
            self.snapshot = store.snapshot().await;
        }
        clamp_cursor(&mut self.agent_cursor, self.snapshot.agents.len());
        self.sync_metrics_agent().await;
        self.expire_alerts(Instant::now());
        self.load_tab().await;
        self.poll_processes().await;
    }

    fn selected_agent(&self) -> Option<(AgentId, String)> {
        self.snapshot
            .agents
            .get(self.agent_cursor)
            .map(|a| (a.id, a.hostname.clone()))
    }

    /// Point the store's metrics at the agent under the cursor.
    async fn sync_metrics_agent(&mut self) {
        let selected = self.selected_agent().map(|(id, _)| id);
        if selected == self.metrics_agent {
            return;
        }
        self.metrics_agent = selected;
        self.processes = None;
        self.procs_scroll = 0;
        self.last_procs_poll = None;
        if let (Some(store), Some(id)) = (self.store.as_ref(), selected) {
            store
                .set_metrics_query(MetricsQuery::for_agent(id, METRICS_HOURS))
                .await;
            store.fetch_metrics().await;
            self.snapshot = store.snapshot().await;
        }
    }

    async fn poll_processes(&mut self) {
        if self.tab != Tab::Overview {
            return;
        }
        let due = is_due(self.last_procs_poll, PROCS_INTERVAL, Instant::now());
        let Some((_, host)) = self.selected_agent().filter(|_| due) else {
            return;
        };
        self.processes = Some(
            self.client
                .processes(&host, 1, DEFAULT_PROCESS_PAGE_SIZE)
                .await,
        );
        self.last_procs_poll = Some(Instant::now());
    }

    async fn load_tab(&mut self) {
        match self.tab {
            Tab::Alerts if self.alerts_stale => self.reload_alerts().await,
            Tab::Registrations if self.queues_stale => {
                self.queues.load(&self.client).await;
                self.queues_stale = false;
                clamp_cursor(&mut self.queue_cursor, self.queue_focus.len(&self.queues));
            }
            Tab::Settings if self.settings_stale => {
                let (thresholds, channels) = tokio::join!(
                    self.client.thresholds(),
                    self.client.notification_channels()
                );
                self.thresholds = thresholds;
                self.channels = channels;
                self.settings_stale = false;
                let len = self.settings_len();
                clamp_cursor(&mut self.settings_cursor, len);
            }
            _ => {}
        }
    }

    /// Alerts refetch on the same cadence as the overview poller, but never under an open dialog.
    fn expire_alerts(&mut self, now: Instant) {
        if self.modal.is_none() && is_due(self.last_alerts_fetch, self.poll_interval, now) {
            self.alerts_stale = true;
        }
    }

    async fn reload_alerts(&mut self) {
        self.alerts_stale = false;
        self.last_alerts_fetch = Some(Instant::now());
        if let Err(e) = self.alerts.reload(&self.client).await {
            if e.is_session_expired() {
                self.expire_session();
                return;
            }
            self.status = Some(format!("alerts: {}", e.user_message()));
        }
        clamp_cursor(&mut self.alert_cursor, self.alerts.view().len());
    }

    async fn refresh(&mut self) {
        if let Some(store) = self.store.as_ref() {
            store.refresh_all().await;
        }
        self.alerts_stale = true;
        self.queues_stale = true;
        self.settings_stale = true;
        self.last_procs_poll = None;
        self.status = Some("Refreshed".into());
    }

    // ---------- input ----------

    async fn handle_key(&mut self, k: KeyEvent) {
        if let Screen::Login(form) = &mut self.screen {
            match form.handle_key(k) {
                LoginInput::Quit => self.should_quit = true,
                LoginInput::Submit => self.submit_login().await,
                LoginInput::Register => self.screen = Screen::Register(registration_form()),
                LoginInput::Edited => {}
            }
            return;
        }
        if let Screen::Register(form) = &mut self.screen {
            match form.handle_key(k) {
                FormInput::Cancel => self.screen = Screen::Login(LoginForm::default()),
                FormInput::Submit => self.submit_registration().await,
                FormInput::Edited => {}
            }
            return;
        }
        if self.modal.is_some() {
            self.modal_key(k).await;
            return;
        }

        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.switch_tab(Tab::ALL[(c as u8 - b'1') as usize]);
                return;
            }
            KeyCode::Tab => {
                self.switch_tab(self.tab.next());
                return;
            }
            KeyCode::Char('r') => {
                self.refresh().await;
                return;
            }
            KeyCode::Char('L') => {
                self.logout().await;
                return;
            }
            _ => {}
        }

        match self.tab {
            Tab::Overview => self.overview_key(k),
            Tab::Alerts => self.alerts_key(k).await,
            Tab::Registrations => self.registrations_key(k).await,
            Tab::Settings => self.settings_key(k).await,
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if tab != self.tab {
            self.tab = tab;
            self.status = None;
        }
    }

    async fn submit_login(&mut self) {
        let Screen::Login(form) = &self.screen else {
            return;
        };
        let (email, password) = (form.email.clone(), form.password.clone());
        match self.client.login(&email, &password).await {
            Ok(()) => {
                self.last_email = email;
                self.enter_main().await;
            }
            Err(e) => {
                if let Screen::Login(form) = &mut self.screen {
                    form.error = Some(e.user_message());
                    form.password.clear();
                }
            }
        }
    }

    async fn submit_registration(&mut self) {
        let Screen::Register(form) = &self.screen else {
            return;
        };
        let registration = registration_from_form(form);
        match self.client.register(&registration).await {
            Ok(()) => {
                self.screen = Screen::Login(LoginForm {
                    email: registration.email,
                    notice: Some("Account created, pending admin approval".into()),
                    ..LoginForm::default()
                });
            }
            Err(e) => {
                if let Screen::Register(form) = &mut self.screen {
                    form.error = Some(e.user_message());
                }
            }
        }
    }

    async fn modal_key(&mut self, k: KeyEvent) {
        let Some(modal) = self.modal.take() else {
            return;
        };
        match modal {
            Modal::Confirm(pending) => match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.execute(pending).await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.status = Some("Cancelled".into());
                }
                _ => self.modal = Some(Modal::Confirm(pending)),
            },
            Modal::Note {
                alert,
                mut text,
                error,
            } => match k.code {
                KeyCode::Esc => {}
                KeyCode::Enter => match self.alerts.add_note(&self.client, alert, &text).await {
                    Ok(()) => self.status = Some(format!("Note added to alert #{alert}")),
                    Err(ApiError::Validation(msg)) => {
                        self.modal = Some(Modal::Note {
                            alert,
                            text,
                            error: Some(msg),
                        })
                    }
                    Err(e) => self.fail(e),
                },
                KeyCode::Backspace => {
                    text.pop();
                    self.modal = Some(Modal::Note { alert, text, error });
                }
                KeyCode::Char(c) => {
                    text.push(c);
                    self.modal = Some(Modal::Note { alert, text, error });
                }
                _ => self.modal = Some(Modal::Note { alert, text, error }),
            },
            Modal::Reason => match k.code {
                KeyCode::Esc => self.queues.cancel_draft(),
                KeyCode::Enter => match self.queues.submit_draft(&self.client).await {
                    Ok(()) => {
                        self.status = Some("Done".into());
                        self.after_queue_change().await;
                    }
                    Err(e) if e.is_session_expired() => self.expire_session(),
                    // draft carries the message; stay open
                    Err(_) => self.modal = Some(Modal::Reason),
                },
                KeyCode::Backspace => {
                    if let Some(d) = self.queues.draft_mut() {
                        d.text.pop();
                    }
                    self.modal = Some(Modal::Reason);
                }
                KeyCode::Char(c) => {
                    if let Some(d) = self.queues.draft_mut() {
                        d.text.push(c);
                    }
                    self.modal = Some(Modal::Reason);
                }
                _ => self.modal = Some(Modal::Reason),
            },
            Modal::SettingsForm { mut form, draft } => match form.handle_key(k) {
                FormInput::Cancel => {}
                FormInput::Submit => self.save_setting(form, draft).await,
                FormInput::Edited => self.modal = Some(Modal::SettingsForm { form, draft }),
            },
            Modal::Message(_) => {}
        }
    }

    /// Create or update from a submitted form; problems keep the form open with the message inline.
    async fn save_setting(&mut self, mut form: Form, draft: SettingsDraft) {
        let result = match &draft {
            SettingsDraft::Threshold { id } => match threshold_from_form(&form, *id) {
                Ok(t) => {
                    let saved = match *id {
                        Some(id) => self.client.update_threshold(id, &t).await,
                        None => self.client.create_threshold(&t).await,
                    };
                    saved.map(|saved| {
                        let name = saved.name.clone();
                        let slot = self
                            .thresholds
                            .iter_mut()
                            .find(|t| t.id.is_some() && t.id == saved.id);
                        match slot {
                            Some(slot) => *slot = saved,
                            None => self.thresholds.push(saved),
                        }
                        format!("Saved threshold '{name}'")
                    })
                }
                Err(e) => Err(e),
            },
            SettingsDraft::Channel { base } => match channel_from_form(&form, base.as_ref()) {
                Ok(c) => {
                    let saved = match c.id {
                        Some(id) => self.client.update_notification_channel(id, &c).await,
                        None => self.client.create_notification_channel(&c).await,
                    };
                    saved.map(|saved| {
                        let name = saved.name.clone();
                        let slot = self
                            .channels
                            .iter_mut()
                            .find(|c| c.id.is_some() && c.id == saved.id);
                        match slot {
                            Some(slot) => *slot = saved,
                            None => self.channels.push(saved),
                        }
                        format!("Saved channel '{name}'")
                    })
                }
                Err(e) => Err(e),
            },
        };
        match result {
            Ok(msg) => self.status = Some(msg),
            Err(e) if e.is_session_expired() => self.expire_session(),
            Err(e) => {
                form.error = Some(e.user_message());
                self.modal = Some(Modal::SettingsForm { form, draft });
            }
        }
    }

    async fn execute(&mut self, pending: Pending) {
        let result = match pending {
            Pending::Bulk(plan) => match self.alerts.execute_bulk(&self.client, &plan, true).await {
                Ok(outcome) => {
                    let message = outcome
                        .map(|r| r.message)
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| format!("{} {} alerts", plan.action.verb(), plan.count()));
                    self.status = Some(message);
                    if plan.action == BulkAction::Delete {
                        clamp_cursor(&mut self.alert_cursor, self.alerts.view().len());
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Pending::DeleteAlert(id) => self.alerts.delete(&self.client, id).await.map(|()| {
                self.status = Some(format!("Deleted alert #{id}"));
                clamp_cursor(&mut self.alert_cursor, self.alerts.view().len());
            }),
            Pending::SetAgentActive { id, host, active } => {
                let r = if active {
                    self.client.activate_agent(id).await
                } else {
                    self.client.deactivate_agent(id).await
                };
                if r.is_ok() {
                    self.status = Some(format!(
                        "{host} {}",
                        if active { "activated" } else { "deactivated" }
                    ));
                    if let Some(store) = self.store.as_ref() {
                        store.fetch_agents().await;
                    }
                }
                r
            }
            Pending::DeleteThreshold { id, name } => {
                self.client.delete_threshold(id).await.map(|()| {
                    self.thresholds.retain(|t| t.id != Some(id));
                    self.status = Some(format!("Deleted threshold '{name}'"));
                })
            }
            Pending::DeleteChannel { id, name } => {
                self.client.delete_notification_channel(id).await.map(|()| {
                    self.channels.retain(|c| c.id != Some(id));
                    self.status = Some(format!("Deleted channel '{name}'"));
                })
            }
        };
        if let Err(e) = result {
            self.fail(e);
        }
        let len = self.settings_len();
        clamp_cursor(&mut self.settings_cursor, len);
    }

    fn overview_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up | KeyCode::Down => {
                move_cursor(&mut self.agent_cursor, k.code, self.snapshot.agents.len());
            }
            KeyCode::Char('s') => self.procs_sort = self.procs_sort.toggle(),
            KeyCode::Char('A') => {
                if let Some(a) = self.snapshot.agents.get(self.agent_cursor) {
                    self.modal = Some(Modal::Confirm(Pending::SetAgentActive {
                        id: a.id,
                        host: a.hostname.clone(),
                        active: !a.is_active,
                    }));
                }
            }
            _ => {
                let page = self
                    .last_procs_area
                    .map(|a| a.height.saturating_sub(3).max(1) as usize)
                    .unwrap_or(10);
                processes_handle_key(&mut self.procs_scroll, k, page);
                let total = self
                    .processes
                    .as_ref()
                    .map(|p| merged_rows(p, self.procs_sort).len())
                    .unwrap_or(0);
                processes_clamp(&mut self.procs_scroll, total, page);
            }
        }
    }

    fn cursor_alert(&self) -> Option<AlertId> {
        self.alerts.view().get(self.alert_cursor).map(|a| a.id)
    }

    async fn set_alert_filters(&mut self, filters: AlertFilters) {
        self.alerts.set_filters(filters);
        self.alert_cursor = 0;
        self.reload_alerts().await;
    }

    async fn alerts_key(&mut self, k: KeyEvent) {
        let rows = self.alerts.view().len();
        match k.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                move_cursor(&mut self.alert_cursor, k.code, rows);
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.cursor_alert() {
                    self.alerts.toggle(id);
                }
            }
            KeyCode::Char('a') => self.alerts.select_all_visible(),
            KeyCode::Char('c') => self.alerts.clear_selection(),
            KeyCode::Char(c @ ('R' | 'U' | 'D')) => {
                let action = match c {
                    'R' => BulkAction::Resolve,
                    'U' => BulkAction::Unresolve,
                    _ => BulkAction::Delete,
                };
                match self.alerts.plan_bulk(action) {
                    Ok(plan) => self.modal = Some(Modal::Confirm(Pending::Bulk(plan))),
                    Err(e) => self.fail(e),
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.cursor_alert() {
                    match self.alerts.resolve(&self.client, id).await {
                        Ok(()) => self.status = Some(format!("Resolved alert #{id}")),
                        Err(e) => self.fail(e),
                    }
                }
            }
            KeyCode::Char('u') => {
                if let Some(id) = self.cursor_alert() {
                    match self.alerts.unresolve(&self.client, id).await {
                        Ok(()) => self.status = Some(format!("Reopened alert #{id}")),
                        Err(e) => self.fail(e),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.cursor_alert() {
                    self.modal = Some(Modal::Confirm(Pending::DeleteAlert(id)));
                }
            }
            KeyCode::Char('n') => {
                if let Some(id) = self.cursor_alert() {
                    self.modal = Some(Modal::Note {
                        alert: id,
                        text: String::new(),
                        error: None,
                    });
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if self.alerts.step_page(k.code == KeyCode::Right) {
                    self.alert_cursor = 0;
                    self.reload_alerts().await;
                }
            }
            KeyCode::Char('f') => {
                let mut filters = self.alerts.filters().clone();
                filters.resolved = next_resolved_filter(filters.resolved);
                self.set_alert_filters(filters).await;
            }
            KeyCode::Char('l') => {
                let mut filters = self.alerts.filters().clone();
                filters.level = next_level_filter(filters.level);
                self.set_alert_filters(filters).await;
            }
            KeyCode::Char('t') => {
                let mut filters = self.alerts.filters().clone();
                filters.alert_type = next_type_filter(filters.alert_type);
                self.set_alert_filters(filters).await;
            }
            KeyCode::Char('h') => {
                let ids: Vec<AgentId> = self.snapshot.agents.iter().map(|a| a.id).collect();
                let mut filters = self.alerts.filters().clone();
                filters.agent = next_agent_filter(filters.agent.as_deref(), &ids);
                self.set_alert_filters(filters).await;
            }
            KeyCode::Char('o') => {
                let sort = self.alerts.sort();
                self.alerts.set_sort(Sort {
                    key: sort.key.next(),
                    ..sort
                });
            }
            KeyCode::Char('O') => {
                let sort = self.alerts.sort();
                self.alerts.set_sort(Sort {
                    descending: !sort.descending,
                    ..sort
                });
            }
            _ => {}
        }
    }

    async fn after_queue_change(&mut self) {
        clamp_cursor(&mut self.queue_cursor, self.queue_focus.len(&self.queues));
        if let Some(store) = self.store.as_ref() {
            tokio::join!(store.fetch_agents(), store.fetch_stats());
        }
    }

    async fn registrations_key(&mut self, k: KeyEvent) {
        let len = self.queue_focus.len(&self.queues);
        match k.code {
            KeyCode::Left | KeyCode::Right => {
                self.queue_focus = if k.code == KeyCode::Right {
                    self.queue_focus.next()
                } else {
                    self.queue_focus.prev()
                };
                self.queue_cursor = 0;
            }
            KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                move_cursor(&mut self.queue_cursor, k.code, len);
            }
            KeyCode::Char('y') | KeyCode::Enter => {
                let result = match self.queue_focus {
                    QueueFocus::Requests => {
                        let Some(id) = self.queues.requests().get(self.queue_cursor).map(|r| r.id)
                        else {
                            return;
                        };
                        self.queues
                            .approve_request(&self.client, id)
                            .await
                            .map(|agent| format!("Registration #{id} approved as agent #{agent}"))
                    }
                    QueueFocus::PendingAgents => {
                        let Some(id) = self
                            .queues
                            .pending_agents()
                            .get(self.queue_cursor)
                            .map(|a| a.id)
                        else {
                            return;
                        };
                        self.queues
                            .approve_agent(&self.client, id)
                            .await
                            .map(|()| format!("Agent #{id} approved"))
                    }
                    QueueFocus::ApprovedAgents => return,
                };
                match result {
                    Ok(msg) => {
                        self.status = Some(msg);
                        self.after_queue_change().await;
                    }
                    Err(e) => self.fail(e),
                }
            }
            KeyCode::Char('x') => match self.queue_focus {
                QueueFocus::Requests => {
                    if let Some(id) = self.queues.requests().get(self.queue_cursor).map(|r| r.id) {
                        match self.queues.begin_reject(id) {
                            Ok(()) => self.modal = Some(Modal::Reason),
                            Err(e) => self.fail(e),
                        }
                    }
                }
                QueueFocus::ApprovedAgents => {
                    if let Some(id) = self
                        .queues
                        .approved_agents()
                        .get(self.queue_cursor)
                        .map(|a| a.id)
                    {
                        self.queues.begin_disapprove(id);
                        self.modal = Some(Modal::Reason);
                    }
                }
                QueueFocus::PendingAgents => {
                    self.status = Some("Agent is already awaiting approval".into());
                }
            },
            _ => {}
        }
    }

    fn settings_len(&self) -> usize {
        match self.settings_focus {
            SettingsFocus::Thresholds => self.thresholds.len(),
            SettingsFocus::Channels => self.channels.len(),
        }
    }

    async fn settings_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Left | KeyCode::Right => {
                self.settings_focus = self.settings_focus.toggle();
                self.settings_cursor = 0;
            }
            KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                let len = self.settings_len();
                move_cursor(&mut self.settings_cursor, k.code, len);
            }
            KeyCode::Char(' ') => self.toggle_setting_active().await,
            KeyCode::Char('n') => {
                let (form, draft) = match self.settings_focus {
                    SettingsFocus::Thresholds => {
                        (threshold_form(None), SettingsDraft::Threshold { id: None })
                    }
                    SettingsFocus::Channels => {
                        (channel_form(None), SettingsDraft::Channel { base: None })
                    }
                };
                self.modal = Some(Modal::SettingsForm { form, draft });
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let editing = match self.settings_focus {
                    SettingsFocus::Thresholds => self.thresholds.get(self.settings_cursor).map(|t| {
                        (threshold_form(Some(t)), SettingsDraft::Threshold { id: t.id })
                    }),
                    SettingsFocus::Channels => self.channels.get(self.settings_cursor).map(|c| {
                        (
                            channel_form(Some(c)),
                            SettingsDraft::Channel {
                                base: Some(c.clone()),
                            },
                        )
                    }),
                };
                if let Some((form, draft)) = editing {
                    self.modal = Some(Modal::SettingsForm { form, draft });
                }
            }
            KeyCode::Char('d') => {
                let pending = match self.settings_focus {
                    SettingsFocus::Thresholds => self
                        .thresholds
                        .get(self.settings_cursor)
                        .and_then(|t| {
                            t.id.map(|id| Pending::DeleteThreshold {
                                id,
                                name: t.name.clone(),
                            })
                        }),
                    SettingsFocus::Channels => {
                        self.channels.get(self.settings_cursor).and_then(|c| {
                            c.id.map(|id| Pending::DeleteChannel {
                                id,
                                name: c.name.clone(),
                            })
                        })
                    }
                };
                if let Some(p) = pending {
                    self.modal = Some(Modal::Confirm(p));
                }
            }
            _ => {}
        }
    }

    async fn toggle_setting_active(&mut self) {
        let idx = self.settings_cursor;
        let result = match self.settings_focus {
            SettingsFocus::Thresholds => {
                let Some(mut t) = self.thresholds.get(idx).cloned() else {
                    return;
                };
                let Some(id) = t.id else { return };
                t.is_active = !t.is_active;
                match self.client.update_threshold(id, &t).await {
                    Ok(saved) => {
                        self.status = Some(format!(
                            "Threshold '{}' {}",
                            saved.name,
                            if saved.is_active { "enabled" } else { "disabled" }
                        ));
                        self.thresholds[idx] = saved;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            SettingsFocus::Channels => {
                let Some(mut c) = self.channels.get(idx).cloned() else {
                    return;
                };
                let Some(id) = c.id else { return };
                c.is_active = !c.is_active;
                match self.client.update_notification_channel(id, &c).await {
                    Ok(saved) => {
                        self.status = Some(format!(
                            "Channel '{}' {}",
                            saved.name,
                            if saved.is_active { "enabled" } else { "disabled" }
                        ));
                        self.channels[idx] = saved;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    // ---------- drawing ----------

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // tabs
                Constraint::Min(10),   // body
                Constraint::Length(1), // footer
            ])
            .split(area);

        match &self.screen {
            Screen::Login(form) => {
                draw_header(f, rows[0], &self.api_label, None);
                draw_login(f, area, &self.api_label, form);
                return;
            }
            Screen::Register(form) => {
                draw_header(f, rows[0], &self.api_label, None);
                draw_form(f, area, form);
                return;
            }
            Screen::Main => {}
        }

        draw_header(f, rows[0], &self.api_label, Some(&self.snapshot));
        draw_tabs(f, rows[1], self.tab.index());
        match self.tab {
            Tab::Overview => self.draw_overview(f, rows[2]),
            Tab::Alerts => {
                let host = self.filtered_host();
                draw_alerts(f, rows[2], &self.alerts, self.alert_cursor, host.as_deref())
            }
            Tab::Registrations => draw_registrations(
                f,
                rows[2],
                &self.queues,
                self.queue_focus,
                self.queue_cursor,
            ),
            Tab::Settings => draw_settings(
                f,
                rows[2],
                &self.thresholds,
                &self.channels,
                self.settings_focus,
                self.settings_cursor,
            ),
        }
        draw_footer(f, rows[3], self.status.as_deref(), self.tab.hints());

        match &self.modal {
            Some(Modal::Confirm(p)) => draw_confirm(f, area, &p.prompt()),
            Some(Modal::Note { alert, text, error }) => draw_input(
                f,
                area,
                &format!("Note for alert #{alert}"),
                "Note",
                text,
                error.as_deref(),
            ),
            Some(Modal::Reason) => {
                if let Some(d) = self.queues.draft() {
                    draw_input(
                        f,
                        area,
                        &d.target.title(),
                        "Reason (required)",
                        &d.text,
                        d.error.as_deref(),
                    );
                }
            }
            Some(Modal::SettingsForm { form, .. }) => draw_form(f, area, form),
            Some(Modal::Message(m)) => draw_message(f, area, m),
            None => {}
        }
    }

    fn filtered_host(&self) -> Option<String> {
        let id: AgentId = self.alerts.filters().agent.as_deref()?.parse().ok()?;
        self.snapshot
            .agents
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.hostname.clone())
    }

    fn draw_overview(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let error = self.snapshot.error();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(if error.is_some() { 4 } else { 3 }),
                Constraint::Percentage(50),
                Constraint::Min(6),
            ])
            .split(area);
        draw_stats(f, rows[0], &self.snapshot.stats, error.as_deref());

        let mid = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[1]);
        draw_agents(f, mid[0], &self.snapshot.agents, self.agent_cursor);
        let host = self
            .snapshot
            .agents
            .get(self.agent_cursor)
            .map(|a| a.hostname.as_str());
        draw_metrics(f, mid[1], host, &self.snapshot.metrics);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        self.last_procs_area = Some(bottom[0]);
        draw_processes(
            f,
            bottom[0],
            self.processes.as_ref(),
            self.procs_scroll,
            self.procs_sort,
        );
        draw_recent_alerts(f, bottom[1], &self.snapshot.alerts);
    }
}
