// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front-end
//!
//! Renders the navigation shell with ratatui. Photos and the live camera feed
//! are drawn with Unicode half-block characters for improved vertical
//! resolution. Async work runs on a tokio runtime and reports back through a
//! channel drained by the UI loop.

use crate::app::{Action, AppModel, GalleryStep, Message, NotificationKind, Route};
use crate::backends::camera::binder;
use crate::backends::camera::types::{
    CameraBackendType, CameraFrame, CameraSelector, FrameReceiver,
};
use crate::backends::permission;
use crate::config::Config;
use crate::constants::{messages, pipeline, timing};
use crate::pipelines::photo::PhotoPipeline;
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::channel::mpsc;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, List, ListItem, ListState, Widget},
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::Instant;
use tracing::{error, info};

/// Bounding box of the decoded gallery preview
const PREVIEW_MAX_WIDTH: u32 = 320;
const PREVIEW_MAX_HEIGHT: u32 = 240;

/// Run the terminal app
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let roots = storage::picture_storage_roots(&config);
    let output_dir = storage::resolve_output_directory(&roots)?;
    storage::ensure_output_directory(&output_dir)?;

    let runtime = tokio::runtime::Runtime::new()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &runtime, &config, output_dir);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.shutdown_timeout(timing::SHUTDOWN_TIMEOUT);
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &tokio::runtime::Runtime,
    config: &Config,
    output_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = std_mpsc::channel();
    let mut effects = Effects {
        runtime: runtime.handle().clone(),
        tx,
        backend_type: config.backend,
        photos: Arc::new(PhotoPipeline::new(config.jpeg_quality)),
        preview: None,
    };

    let (mut model, action) = AppModel::new(config, output_dir, !permission::access_required());
    effects.perform(action);

    loop {
        // Results of background work
        while let Ok(message) = rx.try_recv() {
            if !effects.perform(model.update(message)) {
                return Ok(());
            }
        }

        // Drain all available frames to get the latest
        if let Some(frame) = effects.latest_preview_frame() {
            model.update(Message::Frame(frame));
        }
        model.update(Message::Tick(Instant::now()));

        terminal.draw(|f| render(f, &model))?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(message) = key_to_message(model.route(), key)
            && !effects.perform(model.update(message))
        {
            return Ok(());
        }
    }
}

/// Runs [`Action`]s on behalf of the UI loop
struct Effects {
    runtime: tokio::runtime::Handle,
    tx: std_mpsc::Sender<Message>,
    backend_type: CameraBackendType,
    photos: Arc<PhotoPipeline>,
    /// Live frames of the most recent bind
    preview: Option<FrameReceiver>,
}

impl Effects {
    /// Perform an action; `false` means the app should exit
    fn perform(&mut self, action: Action) -> bool {
        let tx = self.tx.clone();

        match action {
            Action::None => {}
            Action::ListGallery(dir) => {
                self.preview = None;
                self.runtime.spawn(async move {
                    let photos = storage::list_photos_async(dir).await;
                    let _ = tx.send(Message::GalleryLoaded(photos));
                });
            }
            Action::LoadPreview(path) => {
                self.runtime.spawn(async move {
                    let frame =
                        storage::load_preview(path.clone(), PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT)
                            .await;
                    let _ = tx.send(Message::PreviewLoaded(path, frame));
                });
            }
            Action::RequestPermission => {
                self.runtime.spawn(async move {
                    let granted = permission::request_camera_access().await;
                    let _ = tx.send(Message::PermissionResult(granted));
                });
            }
            Action::BindCamera { scope, facing } => {
                let (sender, receiver) = mpsc::channel(pipeline::PREVIEW_CHANNEL_CAPACITY);
                self.preview = Some(receiver);

                let backend_type = self.backend_type;
                self.runtime.spawn(async move {
                    let result =
                        binder::bind(backend_type, &scope, CameraSelector::new(facing), sender)
                            .await;
                    let _ = tx.send(Message::CameraBound {
                        scope_id: scope.id(),
                        result,
                    });
                });
            }
            Action::Capture {
                scope_id,
                endpoint,
                output_dir,
            } => {
                let photos = Arc::clone(&self.photos);
                self.runtime.spawn(async move {
                    if let Some(result) = photos.take_picture(Some(&endpoint), &output_dir).await {
                        let _ = tx.send(Message::PictureSaved { scope_id, result });
                    }
                });
            }
            Action::Open(path) => {
                info!(path = %path.display(), "Opening photo");
                if let Err(e) = open::that_detached(&path) {
                    error!(error = %e, path = %path.display(), "Failed to open photo");
                }
            }
            Action::Quit => return false,
        }
        true
    }

    fn latest_preview_frame(&mut self) -> Option<CameraFrame> {
        let receiver = self.preview.as_mut()?;
        let mut latest = None;
        while let Ok(frame) = receiver.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

/// Map a key press to a shell message for the given destination
fn key_to_message(route: Route, key: KeyEvent) -> Option<Message> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Message::Quit);
    }

    match (route, key.code) {
        (_, KeyCode::Char('q')) => Some(Message::Quit),
        (_, KeyCode::Esc | KeyCode::Backspace) => Some(Message::Back),

        (Route::Home, KeyCode::Char('a')) => Some(Message::AddPhoto),
        (Route::Home, KeyCode::Up | KeyCode::Char('k')) => {
            Some(Message::GallerySelect(GalleryStep::Previous))
        }
        (Route::Home, KeyCode::Down | KeyCode::Char('j')) => {
            Some(Message::GallerySelect(GalleryStep::Next))
        }
        (Route::Home, KeyCode::Enter | KeyCode::Char('o')) => Some(Message::OpenSelected),
        (Route::Home, KeyCode::Char('r')) => Some(Message::Refresh),

        (Route::Add, KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter) => {
            Some(Message::TakePicture)
        }
        _ => None,
    }
}

fn render(f: &mut Frame, model: &AppModel) {
    let [body, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

    match model.route() {
        Route::Home => render_home(f, body, model),
        Route::Add => {
            let bind_failed = model.endpoint.is_none()
                && model
                    .notification
                    .as_ref()
                    .is_some_and(|n| n.kind == NotificationKind::Error);
            let placeholder = if bind_failed {
                messages::CAMERA_UNAVAILABLE
            } else {
                messages::WAITING_FOR_CAMERA
            };
            let widget = FrameWidget {
                frame: model.live_frame.as_ref(),
                placeholder,
            };
            f.render_widget(&widget, body);
        }
    }

    let (message, kind) = match model.visible_notification(Instant::now()) {
        Some(notification) => (notification.text.clone(), Some(notification.kind)),
        None => (help_text(model), None),
    };
    f.render_widget(
        StatusBar {
            message: &message,
            kind,
        },
        status_area,
    );
}

fn render_home(f: &mut Frame, area: Rect, model: &AppModel) {
    if model.photos.is_empty() {
        let widget = FrameWidget {
            frame: None,
            placeholder: messages::NO_PHOTOS,
        };
        f.render_widget(&widget, area);
        return;
    }

    let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Min(0)]).areas(area);

    let items: Vec<ListItem> = model
        .photos
        .iter()
        .map(|photo| ListItem::new(photo.file_name()))
        .collect();
    let title = format!(" {} ({}) ", model.output_dir.display(), model.photos.len());
    let list = List::new(items)
        .block(Block::bordered().title(title))
        .highlight_style(Style::new().reversed());
    let mut state = ListState::default().with_selected(Some(model.selected));
    f.render_stateful_widget(list, list_area, &mut state);

    let widget = FrameWidget {
        frame: model.preview.as_ref().map(|(_, frame)| frame),
        placeholder: "",
    };
    f.render_widget(&widget, preview_area);
}

fn help_text(model: &AppModel) -> String {
    match model.route() {
        Route::Home => "'a' add | ↑/↓ select | enter open | 'r' refresh | 'q' quit".to_string(),
        Route::Add => {
            let mut msg = "space take picture | esc back | 'q' quit".to_string();
            if model.captures_in_flight > 0 {
                msg.push_str(&format!(" | saving {}...", model.captures_in_flight));
            }
            msg
        }
    }
}

/// Widget that renders a frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    placeholder: &'a str,
}

impl Widget for &FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.chars().count() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = frame.pixel_rgb(x, y);
    Color::Rgb(r, g, b)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    kind: Option<NotificationKind>,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = match self.kind {
            Some(NotificationKind::Error) => Color::Red,
            Some(NotificationKind::Info) => Color::Blue,
            None => Color::DarkGray,
        };

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, Style::default().fg(Color::White).bg(bg));
    }
}
