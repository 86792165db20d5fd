//! Goal Planner Desktop — egui app state and UI.
//!
//! Four screens: Home, Register, Login, Chat. The chat screen is gated on the
//! stored session token and owns one Conversation per visit; network calls run
//! on worker threads and post results back over mpsc channels polled each frame.

use crate::markdown;
use eframe::egui;
use lib::api::{ApiClient, ApiError};
use lib::conversation::{Conversation, Message};
use lib::token::TokenStore;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

const FORM_FIELD_WIDTH: f32 = 320.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Home,
    Register,
    Login,
    Chat,
}

/// Run an async API call to completion on a fresh runtime (worker threads only).
fn block_on_api<T, F>(f: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, ApiError>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(f)
}

/// Form state for the Register screen.
#[derive(Default)]
struct RegisterForm {
    username: String,
    password: String,
    /// Inline error from validation or the server's detail string.
    error: Option<String>,
    /// When Some, a register request is in flight; we read the result here.
    receiver: Option<mpsc::Receiver<Result<(), String>>>,
}

/// Form state for the Login screen.
#[derive(Default)]
struct LoginForm {
    username: String,
    password: String,
    error: Option<String>,
    /// Shown after a successful registration.
    notice: Option<String>,
    /// When Some, a login request is in flight; Ok carries the access token.
    receiver: Option<mpsc::Receiver<Result<String, String>>>,
}

/// State owned by one visit to the chat screen. Dropped wholesale when the
/// screen is left, which also discards any reply that resolves afterwards.
struct ChatScreen {
    conversation: Conversation,
    input: String,
    /// When Some, a chat turn is in flight; we read the result here.
    turn_receiver: Option<mpsc::Receiver<Result<String, ApiError>>>,
}

impl ChatScreen {
    fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            input: String::new(),
            turn_receiver: None,
        }
    }
}

pub struct PlannerApp {
    /// Where the session token lives; written by login, cleared by logout.
    tokens: TokenStore,
    /// Base URL of the planning server (resolved from config at startup).
    server_url: String,
    current_screen: Screen,
    register: RegisterForm,
    login: LoginForm,
    /// Present only while the chat screen is open.
    chat: Option<ChatScreen>,
}

impl PlannerApp {
    /// Space between a screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (config, _) = lib::config::load_config(None)
            .unwrap_or((lib::config::Config::default(), PathBuf::new()));
        let server_url = lib::config::resolve_server_url(&config);
        log::info!("desktop started, planning server at {}", server_url);
        Self {
            tokens: TokenStore::default_location(),
            server_url,
            current_screen: Screen::default(),
            register: RegisterForm::default(),
            login: LoginForm::default(),
            chat: None,
        }
    }

    fn navigate(&mut self, screen: Screen) {
        if screen != Screen::Chat {
            self.chat = None;
        }
        self.current_screen = screen;
    }

    /// Clear the stored token and return to the home screen. The chat state is
    /// dropped with the screen, which also discards any in-flight reply.
    fn logout(&mut self) {
        if let Err(e) = self.tokens.clear() {
            log::warn!("clearing session token: {}", e);
        }
        self.navigate(Screen::Home);
    }

    /// Session guard for the chat screen, run once per entry (chat state not
    /// yet created): without a stored token we land on the login screen and
    /// never create the conversation. With one, a fresh conversation is
    /// created and the guard does not run again until the screen is re-entered.
    fn guard_chat_screen(&mut self) {
        if self.current_screen != Screen::Chat || self.chat.is_some() {
            return;
        }
        if !self.tokens.is_authorized() {
            log::info!("no session token, redirecting to login");
            self.current_screen = Screen::Login;
            return;
        }
        self.chat = Some(ChatScreen::new());
    }

    fn request_in_flight(&self) -> bool {
        self.register.receiver.is_some()
            || self.login.receiver.is_some()
            || self
                .chat
                .as_ref()
                .map(|c| c.turn_receiver.is_some())
                .unwrap_or(false)
    }

    /// Poll for a register result and clear the receiver when done. Call each frame.
    fn poll_register(&mut self) {
        if let Some(rx) = &self.register.receiver {
            if let Ok(result) = rx.try_recv() {
                self.register.receiver = None;
                match result {
                    Ok(()) => {
                        self.register = RegisterForm::default();
                        self.login.notice =
                            Some("Registration successful. Please log in.".to_string());
                        self.navigate(Screen::Login);
                    }
                    Err(e) => self.register.error = Some(e),
                }
            }
        }
    }

    /// Poll for a login result; on success the token is stored and we move to chat.
    fn poll_login(&mut self) {
        if let Some(rx) = &self.login.receiver {
            if let Ok(result) = rx.try_recv() {
                self.login.receiver = None;
                match result {
                    Ok(token) => match self.tokens.save(&token) {
                        Ok(()) => {
                            log::info!("login succeeded");
                            self.login = LoginForm::default();
                            self.navigate(Screen::Chat);
                        }
                        Err(e) => {
                            self.login.error =
                                Some(format!("could not store the session token: {}", e));
                        }
                    },
                    Err(e) => self.login.error = Some(e),
                }
            }
        }
    }

    /// Poll for a chat turn result and resolve the conversation. Call each frame.
    fn poll_chat_turn(&mut self) {
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        if let Some(rx) = &chat.turn_receiver {
            if let Ok(result) = rx.try_recv() {
                chat.turn_receiver = None;
                chat.conversation.resolve(result);
            }
        }
    }

    fn start_register(&mut self) {
        if self.register.receiver.is_some() {
            return;
        }
        let username = self.register.username.trim().to_string();
        let password = self.register.password.trim().to_string();
        if username.is_empty() || password.is_empty() {
            self.register.error = Some("Please enter username and password".to_string());
            return;
        }
        self.register.error = None;
        let server_url = self.server_url.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = block_on_api(async move {
                ApiClient::new(server_url)
                    .register(&username, &password)
                    .await
            })
            .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });
        self.register.receiver = Some(rx);
    }

    fn start_login(&mut self) {
        if self.login.receiver.is_some() {
            return;
        }
        let username = self.login.username.trim().to_string();
        let password = self.login.password.trim().to_string();
        if username.is_empty() || password.is_empty() {
            self.login.error = Some("Please enter username and password".to_string());
            return;
        }
        self.login.error = None;
        self.login.notice = None;
        let server_url = self.server_url.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = block_on_api(async move {
                ApiClient::new(server_url).login(&username, &password).await
            })
            .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });
        self.login.receiver = Some(rx);
    }

    /// Start a chat turn on a worker thread if the submission is accepted.
    /// The receiver lives in the chat-screen state, so leaving the screen
    /// drops it and a reply resolving afterwards is discarded.
    fn start_chat_turn(chat: &mut ChatScreen, server_url: &str) {
        if chat.turn_receiver.is_some() {
            return;
        }
        let Some(message) = chat.conversation.submit(&chat.input) else {
            return;
        };
        chat.input.clear();
        let conversation_id = chat.conversation.id().to_string();
        let server_url = server_url.to_string();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = block_on_api(async move {
                ApiClient::new(server_url)
                    .chat(&message, &conversation_id)
                    .await
            });
            let _ = tx.send(result);
        });
        chat.turn_receiver = Some(rx);
    }

    /// One chat message: user messages as plain strong text, assistant
    /// messages through the markdown pass.
    fn render_chat_message(ui: &mut egui::Ui, m: &Message) {
        let is_user = m.role == "user";
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&m.content).strong());
            } else {
                markdown::render_markdown(ui, &m.content);
            }
        });
    }

    fn ui_home(&mut self, ui: &mut egui::Ui) {
        ui.add_space(48.0);
        ui.heading("Do you want to plan any goals?");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
        ui.horizontal(|ui| {
            if ui.button("Create Account").clicked() {
                self.navigate(Screen::Register);
            }
            ui.add_space(8.0);
            if ui.button("Login").clicked() {
                self.navigate(Screen::Login);
            }
        });
    }

    fn ui_register(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Create Account");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
        let busy = self.register.receiver.is_some();
        let field_height = ui.spacing().interact_size.y + 6.0;
        let mut submit = false;
        ui.add_enabled_ui(!busy, |ui| {
            ui.add_sized(
                [FORM_FIELD_WIDTH, field_height],
                egui::TextEdit::singleline(&mut self.register.username).hint_text("Username"),
            );
            ui.add_space(8.0);
            let password = ui.add_sized(
                [FORM_FIELD_WIDTH, field_height],
                egui::TextEdit::singleline(&mut self.register.password)
                    .password(true)
                    .hint_text("Password"),
            );
            if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
        });
        ui.add_space(12.0);
        let label = if busy { "Registering..." } else { "Register" };
        if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
            submit = true;
        }
        if submit {
            self.start_register();
        }
        if let Some(ref err) = self.register.error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Have an account?");
            if ui.link("Login").clicked() {
                self.navigate(Screen::Login);
            }
        });
    }

    fn ui_login(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Login");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
        if let Some(ref notice) = self.login.notice {
            ui.colored_label(egui::Color32::from_rgb(60, 160, 90), notice);
            ui.add_space(8.0);
        }
        let busy = self.login.receiver.is_some();
        let field_height = ui.spacing().interact_size.y + 6.0;
        let mut submit = false;
        ui.add_enabled_ui(!busy, |ui| {
            ui.add_sized(
                [FORM_FIELD_WIDTH, field_height],
                egui::TextEdit::singleline(&mut self.login.username).hint_text("Username"),
            );
            ui.add_space(8.0);
            let password = ui.add_sized(
                [FORM_FIELD_WIDTH, field_height],
                egui::TextEdit::singleline(&mut self.login.password)
                    .password(true)
                    .hint_text("Password"),
            );
            if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
        });
        ui.add_space(12.0);
        let label = if busy { "Logging in..." } else { "Login" };
        if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
            submit = true;
        }
        if submit {
            self.start_login();
        }
        if let Some(ref err) = self.login.error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("New here?");
            if ui.link("Register").clicked() {
                self.navigate(Screen::Register);
            }
        });
    }

    /// Chat UI: flexible messages area with stick-to-bottom scrolling, input
    /// row pinned underneath.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let server_url = self.server_url.clone();
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        let pending = chat.conversation.pending();

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section_height = row_height + Self::SCREEN_FOOTER_SPACING;
        let messages_height =
            (ui.available_height() - bottom_section_height).max(CHAT_MESSAGES_MIN_HEIGHT);

        egui::ScrollArea::vertical()
            .max_height(messages_height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if chat.conversation.messages().is_empty() {
                    ui.add_space(12.0);
                    ui.label(egui::RichText::new("Welcome 👋").strong().size(16.0));
                    ui.label("What goal would you like to plan today?");
                }
                for m in chat.conversation.messages() {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
                if pending {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("AI is thinking...");
                    });
                }
            });

        ui.add_space(8.0);

        let mut send_now = false;
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.add_enabled(!pending, egui::Button::new("Send")).clicked() {
                send_now = true;
            }
            ui.add_space(8.0);
            let response = ui.add_sized(
                [ui.available_width(), ui.spacing().interact_size.y + 6.0],
                egui::TextEdit::singleline(&mut chat.input).hint_text("Type your goal..."),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_now = true;
                response.request_focus();
            }
        });
        if send_now {
            Self::start_chat_turn(chat, &server_url);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }
}

impl eframe::App for PlannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_register();
        self.poll_login();
        self.guard_chat_screen();
        self.poll_chat_turn();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(12.0);
                    ui.horizontal(|ui| {
                        ui.heading("Goal Planner");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            match self.current_screen {
                                Screen::Chat => {
                                    if ui.button("Logout").clicked() {
                                        self.logout();
                                    }
                                }
                                Screen::Home => {
                                    if ui.button("Register").clicked() {
                                        self.navigate(Screen::Register);
                                    }
                                    if ui.button("Login").clicked() {
                                        self.navigate(Screen::Login);
                                    }
                                }
                                _ => {
                                    if ui.button("Home").clicked() {
                                        self.navigate(Screen::Home);
                                    }
                                }
                            }
                        });
                    });
                    ui.add_space(12.0);
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Home => self.ui_home(ui),
                    Screen::Register => self.ui_register(ui),
                    Screen::Login => self.ui_login(ui),
                    Screen::Chat => self.ui_chat(ui),
                });
        });

        // Worker threads cannot wake the UI, so keep repainting while a
        // request is in flight to pick up its result.
        if self.request_in_flight() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
