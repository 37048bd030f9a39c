//! # eLTER Toolbar GUI Application
//!
//! Map window with the toolbar panels of the eLTER site map. Pick a product
//! from the toolbox, choose a network and a site, set the parameters and
//! Apply; the compute service renders the raster and the map lists it.
//!
//! Configuration is read from `elter.json` (or the path in `ELTER_CONFIG`).
//! Pass `--demo` to run against the in-memory services.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use iced::widget::{column, container, row, Canvas, Space};
use iced::{Element, Length, Task};

use elter_core::config::DEFAULT_CONFIG_FILE;
use elter_core::memory::{InMemoryDirectory, RecordingCompute};
use elter_core::products::{ParamValue, ParamWidget};
use elter_core::{Catalog, MapHost, PanelController, ProductKind, Session, ToolbarConfig};

mod ui;

use ui::export_tab::ExportForm;
use ui::feedback_form::FeedbackDraft;
use ui::map_canvas::{MapCanvas, MapView};

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application(App::new, App::update, App::view)
        .title(App::title)
        .window_size((1280.0, 820.0))
        .run()
}

/// Tabs inside a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    Parameters,
    Export,
}

#[derive(Debug, Clone)]
pub enum Message {
    // Toolbox
    ToggleToolbox,
    OpenPanel(ProductKind),
    ClosePanel,
    ResetView,

    // Panel visibility
    PointerEntered,
    PointerLeft,
    TogglePinned,
    TabSelected(PanelTab),

    // Selectors and parameters
    NetworkSelected(String),
    SiteSelected(String),
    ParamChanged(String, ParamValue),
    DateTyped(String, String),
    DateCommitted(String),
    Apply,
    Reset,

    // Export tab
    ExportRasterSelected(String),
    ExportScaleChanged(f64),
    ExportCrsChanged(String),
    ExportFileNameChanged(String),
    Export,
    RefreshExports,

    // Layers
    LayerVisibility(String, bool),
    LayerOpacity(String, f32),

    // Feedback form
    ToggleFeedback,
    FeedbackName(String),
    FeedbackEmail(String),
    FeedbackSite(String),
    FeedbackYear(i32),
    FeedbackMetric(String),
    FeedbackDoy(u16),
    FeedbackWater(bool),
    FeedbackDepthLow(f64),
    FeedbackDepthHigh(f64),
    FeedbackTemperature(String),
    FeedbackLatitude(String),
    FeedbackLongitude(String),
    FeedbackBaseName(String),
    FeedbackPickCsv,
    FeedbackSubmit,
}

pub struct App {
    session: Option<Session>,
    map: MapView,
    panel: Option<PanelController>,
    toolbox_open: bool,
    tab: PanelTab,
    /// Date fields as typed, committed on Enter or Apply
    date_text: BTreeMap<String, String>,
    export_form: ExportForm,
    feedback: Option<FeedbackDraft>,
    status: String,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config_path = std::env::var("ELTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let demo = std::env::args().any(|a| a == "--demo");

        let (session, status) = match ToolbarConfig::load(&config_path) {
            Ok(config) if demo => match Catalog::builtin() {
                Ok(catalog) => (
                    Some(Session::new(
                        Rc::new(InMemoryDirectory::demo(&catalog)),
                        Rc::new(RecordingCompute::new()),
                        config,
                        catalog,
                    )),
                    "Demo mode: in-memory services".to_string(),
                ),
                Err(e) => (None, format!("Catalog error: {}", e)),
            },
            Ok(config) => match Session::connect(config) {
                Ok(session) => (Some(session), "Ready".to_string()),
                Err(e) => {
                    log::error!("Could not connect: {}", e);
                    (None, format!("Could not connect: {}", e))
                }
            },
            Err(e) => {
                log::error!("Could not load {}: {}", config_path.display(), e);
                (None, format!("Config error: {}", e))
            }
        };

        let export_form = match &session {
            Some(s) => ExportForm::from_defaults(&s.config.export),
            None => ExportForm::from_defaults(&Default::default()),
        };

        let app = App {
            session,
            map: MapView::new(),
            panel: None,
            toolbox_open: true,
            tab: PanelTab::default(),
            date_text: BTreeMap::new(),
            export_form,
            feedback: None,
            status,
        };
        (app, Task::none())
    }

    fn title(&self) -> String {
        match &self.panel {
            Some(panel) => format!("eLTER Toolbar - {}", panel.spec().title),
            None => "eLTER Toolbar".to_string(),
        }
    }

    fn close_panel(&mut self) {
        if let Some(mut panel) = self.panel.take() {
            panel.close(&mut self.map);
        }
        self.date_text.clear();
        self.export_form.raster = None;
        self.tab = PanelTab::Parameters;
    }

    /// Commit typed dates to the panel before they are used
    fn commit_dates(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            for (key, typed) in &self.date_text {
                panel.set_param_text(&mut self.map, key, typed);
            }
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ToggleToolbox => {
                self.toolbox_open = !self.toolbox_open;
            }
            Message::OpenPanel(kind) => {
                if self.panel.as_ref().map(|p| p.kind()) == Some(kind) {
                    return Task::none();
                }
                self.close_panel();
                match &self.session {
                    Some(session) => {
                        let panel = session.open_panel(kind, &mut self.map);
                        for spec in &panel.spec().params {
                            if spec.widget == ParamWidget::Date {
                                self.date_text.insert(spec.key.clone(), String::new());
                            }
                        }
                        self.status = format!("{} panel opened", kind.display_name());
                        self.panel = Some(panel);
                    }
                    None => self.status = "No services available".to_string(),
                }
            }
            Message::ClosePanel => {
                self.close_panel();
                self.status = "Panel closed".to_string();
            }
            Message::ResetView => self.map.reset_view(),

            Message::PointerEntered => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.pointer_entered();
                }
            }
            Message::PointerLeft => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.pointer_left();
                }
            }
            Message::TogglePinned => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.toggle_pinned();
                }
            }
            Message::TabSelected(tab) => self.tab = tab,

            Message::NetworkSelected(name) => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.select_network(&name);
                    self.status = format!("{} sites in {}", panel.site_names().len(), name);
                }
            }
            Message::SiteSelected(name) => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.select_site(&mut self.map, &name);
                }
            }
            Message::ParamChanged(key, value) => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.set_param(&mut self.map, &key, value);
                }
            }
            Message::DateTyped(key, typed) => {
                self.date_text.insert(key, typed);
            }
            Message::DateCommitted(key) => {
                if let (Some(panel), Some(typed)) = (self.panel.as_mut(), self.date_text.get(&key)) {
                    panel.set_param_text(&mut self.map, &key, typed);
                }
            }
            Message::Apply => {
                self.commit_dates();
                if let Some(panel) = self.panel.as_mut() {
                    if let Some(name) = panel.apply(&mut self.map) {
                        self.status = format!("Added '{}'", name);
                        self.export_form.raster = Some(name);
                    }
                }
            }
            Message::Reset => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.reset();
                }
            }

            Message::ExportRasterSelected(name) => self.export_form.raster = Some(name),
            Message::ExportScaleChanged(scale) => self.export_form.scale = scale,
            Message::ExportCrsChanged(crs) => self.export_form.crs = crs,
            Message::ExportFileNameChanged(name) => self.export_form.file_name = name,
            Message::Export => {
                if let Some(panel) = self.panel.as_mut() {
                    if let Some(ticket) = panel.export(&self.export_form.options()) {
                        self.status = format!("Export {} queued", ticket.task_id);
                    }
                }
            }
            Message::RefreshExports => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.refresh_exports();
                }
            }

            Message::LayerVisibility(name, visible) => {
                if let Err(e) = self.map.set_layer_visibility(&name, visible) {
                    self.status = e.to_string();
                }
            }
            Message::LayerOpacity(name, opacity) => {
                if let Err(e) = self.map.set_layer_opacity(&name, opacity) {
                    self.status = e.to_string();
                }
            }

            Message::ToggleFeedback => {
                self.feedback = match self.feedback.take() {
                    Some(_) => None,
                    None => Some(FeedbackDraft::new(whoami::realname())),
                };
            }
            Message::FeedbackPickCsv => {
                if let Some(draft) = self.feedback.as_mut() {
                    if let Some(path) = rfd::FileDialog::new().add_filter("CSV", &["csv"]).pick_file() {
                        draft.form.attachment = Some(path);
                    }
                }
            }
            Message::FeedbackSubmit => self.submit_feedback(),
            other => self.update_feedback_field(other),
        }
        Task::none()
    }

    fn update_feedback_field(&mut self, message: Message) {
        let Some(draft) = self.feedback.as_mut() else {
            return;
        };
        let form = &mut draft.form;
        match message {
            Message::FeedbackName(v) => form.collector_name = v,
            Message::FeedbackEmail(v) => form.collector_email = v,
            Message::FeedbackSite(v) => form.site = v,
            Message::FeedbackYear(v) => form.year = v,
            Message::FeedbackMetric(v) => form.phenometric = Some(v),
            Message::FeedbackDoy(v) => form.day_of_year = v,
            Message::FeedbackWater(v) => form.water_presence = v,
            Message::FeedbackDepthLow(v) => form.depth = (v, form.depth.1.max(v)),
            Message::FeedbackDepthHigh(v) => form.depth = (form.depth.0.min(v), v),
            Message::FeedbackTemperature(v) => draft.temperature = v,
            Message::FeedbackLatitude(v) => draft.latitude = v,
            Message::FeedbackLongitude(v) => draft.longitude = v,
            Message::FeedbackBaseName(v) => form.file_base_name = v,
            _ => {}
        }
    }

    fn submit_feedback(&mut self) {
        let (Some(draft), Some(session)) = (self.feedback.as_mut(), self.session.as_ref()) else {
            return;
        };
        let rejected = draft.commit_numbers();
        if !rejected.is_empty() {
            self.status = format!("Could not read: {}", rejected.join(", "));
            return;
        }
        self.status = "Sending data... Please wait...".to_string();
        match draft.form.submit(&session.config.data_dir, &whoami::username()) {
            Ok(receipt) => self.status = receipt.message,
            Err(e) => {
                log::warn!("Feedback not saved: {}", e);
                self.status = e.to_string();
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let toolbox = ui::toolbox::view_toolbox(
            self.toolbox_open,
            self.panel.as_ref().map(|p| p.kind()),
            self.feedback.is_some(),
        );

        let map_canvas: Element<'_, Message> = Canvas::new(MapCanvas::new(&self.map))
            .width(Length::Fill)
            .height(Length::Fill)
            .into();

        let mut side = column![].spacing(8);
        if let Some(panel) = &self.panel {
            side = side.push(ui::panel::view_panel(panel, self.tab, &self.date_text, &self.export_form));
        }
        if let Some(draft) = &self.feedback {
            side = side.push(ui::feedback_form::view_feedback_form(draft));
        }

        let mut overlay = column![ui::layers_panel::view_layers_panel(&self.map)].spacing(8);
        if let Some(legend) = self.map.legend() {
            overlay = overlay.push(ui::legend::view_legend(legend));
        }

        let workspace = row![
            container(map_canvas).width(Length::Fill).height(Length::Fill),
            Space::new().width(8),
            iced::widget::scrollable(side),
            Space::new().width(8),
            overlay,
        ]
        .height(Length::Fill);

        let status = ui::status_bar::view_status_bar(
            self.session.as_ref().map(|s| s.config.compute_url.as_str()),
            self.panel.as_ref().map(|p| p.phase()),
            &self.status,
        );

        container(column![toolbox, workspace, status].spacing(6))
            .padding(8)
            .into()
    }
}
