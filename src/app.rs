//! WriteIQ main window: egui/eframe application.
//!
//! # Architecture
//!
//! [`WriteIqApp`] is the top-level [`eframe::App`].  It owns the
//! [`Orchestrator`] and does three things every frame:
//!
//! 1. drain background events (`poll_events`) and run due timers (`tick`);
//! 2. render the orchestrator's state;
//! 3. forward button clicks back to the orchestrator.
//!
//! # Layout
//!
//! | Area | Content |
//! |------|---------|
//! | Header | "⚙️ Settings" |
//! | Mode row | "📝 Grammar" / "🌍 Translate" |
//! | Language row | "Translate to:" combo (translate mode only) |
//! | Input | multiline editor |
//! | Output | read-only editor + copy button |
//! | Footer | Clear / Process, status line |

use std::time::{Duration, Instant};

use eframe::egui;

use crate::clipboard::SystemClipboard;
use crate::config::{model_label, Language, MODEL_OPTIONS};
use crate::llm::Mode;
use crate::pipeline::{NoticeLevel, Orchestrator, Phase};

const ACTIVE_MODE: egui::Color32 = egui::Color32::from_rgb(0, 120, 212);
const STATUS_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const TIMER_REPAINT: Duration = Duration::from_millis(100);

/// eframe application: the WriteIQ window.
pub struct WriteIqApp {
    orchestrator: Orchestrator,
    clipboard: SystemClipboard,
}

impl WriteIqApp {
    /// Wrap an already started orchestrator.
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            clipboard: SystemClipboard,
        }
    }

    // ── Main panel ───────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let settings = egui::Button::new(
                egui::RichText::new("⚙️ Settings").size(12.0).color(STATUS_COLOR),
            );
            if ui.add(settings).clicked() {
                self.orchestrator.open_settings(false);
            }
        });
    }

    fn draw_mode_row(&mut self, ui: &mut egui::Ui) {
        let current = self.orchestrator.mode();
        ui.horizontal(|ui| {
            for (mode, label) in [(Mode::GrammarFix, "📝 Grammar"), (Mode::Translate, "🌍 Translate")] {
                let mut text = egui::RichText::new(label).size(14.0);
                if mode == current {
                    text = text.color(egui::Color32::WHITE);
                }
                let button = egui::Button::new(text).fill(if mode == current {
                    ACTIVE_MODE
                } else {
                    ui.visuals().widgets.inactive.weak_bg_fill
                });
                if ui.add(button).clicked() {
                    self.orchestrator.set_mode(mode);
                }
            }
        });

        if self.orchestrator.language_selector_visible() {
            let mut selected = self.orchestrator.language();
            ui.horizontal(|ui| {
                ui.label("Translate to:");
                egui::ComboBox::from_id_salt("target_language")
                    .selected_text(selected.label())
                    .show_ui(ui, |ui| {
                        for lang in Language::ALL {
                            ui.selectable_value(&mut selected, lang, lang.label());
                        }
                    });
            });
            if selected != self.orchestrator.language() {
                self.orchestrator.set_language(selected.code());
            }
        }
    }

    fn draw_editors(&mut self, ui: &mut egui::Ui) {
        let pane_height = (ui.available_height() - 90.0).max(120.0) / 2.0;

        egui::ScrollArea::vertical()
            .id_salt("input")
            .max_height(pane_height)
            .show(ui, |ui| {
                ui.add_sized(
                    [ui.available_width(), pane_height],
                    egui::TextEdit::multiline(self.orchestrator.input_mut())
                        .hint_text("Enter text here..."),
                );
            });

        ui.add_space(6.0);
        let state = self.orchestrator.ui().clone();
        ui.horizontal(|ui| {
            ui.label("Output:");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(state.copy_enabled, egui::Button::new(state.copy_label))
                    .clicked()
                {
                    self.orchestrator.copy_output(&mut self.clipboard);
                }
            });
        });

        let mut output = self.orchestrator.output();
        egui::ScrollArea::vertical()
            .id_salt("output")
            .max_height(pane_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_sized(
                    [ui.available_width(), pane_height],
                    egui::TextEdit::multiline(&mut output).hint_text("Result will appear here..."),
                );
            });
    }

    fn draw_footer(&mut self, ui: &mut egui::Ui) {
        let state = self.orchestrator.ui().clone();

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(state.clear_enabled, egui::Button::new("Clear"))
                .clicked()
            {
                self.orchestrator.clear_all();
            }
            if ui
                .add_enabled(state.submit_enabled, egui::Button::new(state.submit_label))
                .clicked()
            {
                self.orchestrator.submit();
            }
            if state.phase == Phase::Processing {
                ui.spinner();
            }
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let color = if state.phase == Phase::Error {
                ERROR_COLOR
            } else {
                STATUS_COLOR
            };
            ui.label(egui::RichText::new(&state.status).size(12.0).color(color));
        });
    }

    // ── Modal windows ────────────────────────────────────────────────────

    fn draw_settings(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.orchestrator.dialog_mut() else {
            return;
        };

        let busy = dialog.is_busy();
        let mut open = true;
        let mut save = false;
        let mut cancel = false;

        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .fixed_size([380.0, 260.0])
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .open(&mut open)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!busy, |ui| {
                    ui.label("Gemini API Key");
                    ui.add(
                        egui::TextEdit::singleline(&mut dialog.api_key_input)
                            .password(true)
                            .hint_text("Enter your Gemini API key...")
                            .desired_width(f32::INFINITY),
                    );

                    ui.add_space(8.0);
                    ui.label("Default Translation Language");
                    egui::ComboBox::from_id_salt("default_language")
                        .selected_text(dialog.language.label())
                        .show_ui(ui, |ui| {
                            for lang in Language::ALL {
                                ui.selectable_value(&mut dialog.language, lang, lang.label());
                            }
                        });

                    ui.add_space(8.0);
                    ui.label("Gemini Model");
                    let selected_model = model_label(&dialog.model_name).to_string();
                    egui::ComboBox::from_id_salt("model")
                        .selected_text(selected_model)
                        .show_ui(ui, |ui| {
                            for (name, label) in MODEL_OPTIONS {
                                ui.selectable_value(&mut dialog.model_name, name.to_string(), label);
                            }
                        });
                });

                ui.add_space(8.0);
                ui.label(egui::RichText::new(dialog.status()).size(12.0).color(STATUS_COLOR));

                ui.add_space(8.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_enabled_ui(!busy, |ui| {
                        cancel = ui.button("Cancel").clicked();
                        save = ui.button("Save").clicked();
                    });
                });
            });

        if save {
            self.orchestrator.save_settings();
        } else if cancel || !open {
            self.orchestrator.cancel_settings();
        }
    }

    fn draw_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.orchestrator.notice() else {
            return;
        };

        let icon = match notice.level {
            NoticeLevel::Info => "ℹ",
            NoticeLevel::Warning => "⚠",
            NoticeLevel::Error => "⛔",
        };
        let mut dismissed = false;

        egui::Window::new(format!("{icon} {}", notice.title))
            .id(egui::Id::new("notice"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.label(notice.message.as_str());
                ui.add_space(8.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    dismissed = ui.button("OK").clicked();
                });
            });

        if dismissed {
            self.orchestrator.dismiss_notice();
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for WriteIqApp {
    /// Called every frame by eframe.  Drains events, runs timers, then
    /// renders the window.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Background events and timers ---------------------------------
        self.orchestrator.poll_events();
        self.orchestrator.tick(Instant::now());

        if self.orchestrator.has_pending_timer() {
            ctx.request_repaint_after(TIMER_REPAINT);
        }

        // --- Main panel ----------------------------------------------------
        let blocked = self.orchestrator.dialog().is_some() || self.orchestrator.notice().is_some();
        let frame = egui::Frame::new()
            .fill(ctx.style().visuals.panel_fill)
            .inner_margin(egui::Margin::same(20));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| {
                self.draw_header(ui);
                self.draw_mode_row(ui);
                ui.add_space(6.0);
                self.draw_editors(ui);
                self.draw_footer(ui);
            });
        });

        // --- Modals ----------------------------------------------------------
        self.draw_settings(ctx);
        self.draw_notice(ctx);

        if self.orchestrator.close_requested() && self.orchestrator.notice().is_none() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Stop background work before the window goes away.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.orchestrator.shutdown();
        log::info!("WriteIQ closing");
    }
}
