use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::widgets::Clear;
use std::sync::Arc;
use std::time::Duration;
use streamchat::api::HttpTransport;
use streamchat::config::{Config, ConfigStore, FileStorage};
use streamchat::state::{ConversationManager, ConversationUpdate};
use streamchat::terminal::TerminalGuard;
use streamchat::types::MessageStatus;
use streamchat::ui::command::{parse_command, Command, HELP_TEXT};
use streamchat::ui::input::{InputAction, InputLine};
use streamchat::ui::layout::split_chat_layout;
use streamchat::ui::render::{
    input_visual_rows, render_header, render_input, render_notice, render_transcript,
    HeaderState,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const MAX_EVENTS_PER_FRAME: usize = 256;
const SCROLL_STEP: usize = 5;

struct ChatFrontend {
    terminal: TerminalGuard,
    input: InputLine,
    notice: String,
    scroll_back: usize,
    awaiting_health: bool,
    quit: bool,
}

impl ChatFrontend {
    fn new(notice: String) -> Result<Self> {
        Ok(Self {
            terminal: TerminalGuard::setup()?,
            input: InputLine::new(),
            notice,
            scroll_back: 0,
            awaiting_health: false,
            quit: false,
        })
    }

    fn render(&mut self, conversation: &ConversationManager) {
        let header = HeaderState {
            model: &conversation.settings().model,
            connected: conversation.is_connected(),
            phase: conversation.phase(),
        };
        let input = self.input.buffer();
        let cursor = self.input.cursor();
        let notice = self.notice.as_str();
        let scroll_back = self.scroll_back;

        let drawn = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let input_width = area.width.saturating_sub(2).max(1) as usize;
            let input_rows = input_visual_rows(input, input_width).min(8) as u16;
            let panes = split_chat_layout(area, input_rows);

            render_header(frame, panes.header, &header);
            render_transcript(frame, panes.history, conversation.messages(), scroll_back);
            render_notice(frame, panes.notice, notice);
            render_input(frame, panes.input, input, cursor);
        });
        if let Err(error) = drawn {
            warn!(%error, "failed to draw frame");
        }
    }

    fn handle_terminal_events(&mut self, conversation: &mut ConversationManager) {
        for _ in 0..MAX_EVENTS_PER_FRAME {
            let Ok(true) = event::poll(Duration::ZERO) else {
                return;
            };
            let Ok(ev) = event::read() else {
                self.quit = true;
                return;
            };

            match ev {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    let action = self.input.apply_key(key);
                    self.handle_action(action, conversation);
                }
                Event::Paste(text) => self.input.insert_str(&text),
                _ => {}
            }
            if self.quit {
                return;
            }
        }
    }

    fn handle_action(&mut self, action: InputAction, conversation: &mut ConversationManager) {
        match action {
            InputAction::None => {}
            InputAction::Quit => self.quit = true,
            InputAction::Clear => self.clear(conversation),
            InputAction::ScrollUp => self.scroll_back = self.scroll_back.saturating_add(SCROLL_STEP),
            InputAction::ScrollDown => {
                self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP)
            }
            InputAction::Submit(text) => match parse_command(&text) {
                Some(Ok(command)) => self.run_command(command, conversation),
                Some(Err(message)) => self.notice = message,
                None => match conversation.submit(&text) {
                    Ok(_) => {
                        self.scroll_back = 0;
                        self.notice.clear();
                    }
                    Err(rejected) => self.notice = rejected.to_string(),
                },
            },
        }
    }

    fn run_command(&mut self, command: Command, conversation: &mut ConversationManager) {
        if let Some(next) = command.updated_settings(conversation.settings()) {
            match conversation.on_config_saved(next) {
                Ok(()) => {
                    self.notice = "settings saved; checking backend...".to_string();
                    self.awaiting_health = true;
                }
                Err(error) => self.notice = format!("could not save settings: {error}"),
            }
            return;
        }

        match command {
            Command::Clear => self.clear(conversation),
            Command::Health => {
                conversation.request_health_check();
                self.notice = "checking backend...".to_string();
                self.awaiting_health = true;
            }
            Command::Help => self.notice = HELP_TEXT.to_string(),
            Command::Quit => self.quit = true,
            Command::SetApiKey(_) | Command::SetModel(_) | Command::SetDeveloperMessage(_) => {}
        }
    }

    fn clear(&mut self, conversation: &mut ConversationManager) {
        conversation.clear();
        self.scroll_back = 0;
        self.notice = "conversation cleared".to_string();
    }

    fn health_reported(&mut self, healthy: bool) {
        if !self.awaiting_health {
            return;
        }
        self.awaiting_health = false;
        self.notice = if healthy {
            "backend is healthy".to_string()
        } else {
            "backend is not reachable".to_string()
        };
    }

    fn observe(&mut self, update: ConversationUpdate) {
        match update {
            ConversationUpdate::MessageFinalized {
                status: MessageStatus::Failed,
                ..
            } => self.notice = "the last reply failed".to_string(),
            ConversationUpdate::ConnectionChanged(false) => {
                self.notice = "backend is not reachable".to_string()
            }
            ConversationUpdate::ConnectionChanged(true) => {
                self.notice = "backend reconnected".to_string()
            }
            _ => {}
        }
    }
}

async fn run(
    frontend: &mut ChatFrontend,
    conversation: &mut ConversationManager,
    updates: &mut mpsc::UnboundedReceiver<ConversationUpdate>,
) {
    let mut tick = tokio::time::interval(FRAME_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while !frontend.quit {
        frontend.render(conversation);
        frontend.handle_terminal_events(conversation);

        let event = tokio::select! {
            _ = tick.tick() => None,
            event = conversation.next_event(), if conversation.is_in_flight() => event,
        };
        if let Some(event) = event {
            conversation.apply(event);
            conversation.apply_pending();
        }
        if let Some(healthy) = conversation.apply_pending_health() {
            frontend.health_reported(healthy);
        }

        while let Ok(update) = updates.try_recv() {
            frontend.observe(update);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    streamchat::telemetry::init(&config)?;
    info!(
        api_url = %config.api_url,
        local = config.is_local_endpoint(),
        settings_dir = %config.settings_dir.display(),
        "streamchat starting"
    );

    let transport = Arc::new(HttpTransport::new(&config)?);
    let store = ConfigStore::new(FileStorage::new(config.settings_dir.clone()));
    let mut conversation = ConversationManager::new(transport, store);
    let mut updates = conversation.subscribe();
    conversation.request_health_check();

    let notice = if conversation.settings().has_api_key() {
        HELP_TEXT.to_string()
    } else {
        "no API key configured; use /key <api-key>".to_string()
    };
    let mut frontend = ChatFrontend::new(notice)?;
    run(&mut frontend, &mut conversation, &mut updates).await;

    info!("streamchat exiting");
    Ok(())
}
