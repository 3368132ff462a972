use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use crate::lore::{LoreGraph, RelationGlossary, load_artifact, load_relation_glossary};

mod camera;
mod focus;
mod graph;
mod render;
mod simulation;
mod ui;

use camera::Camera;
use focus::SelectionState;
use simulation::{Mode, Simulation};
use ui::SuggestionCache;

/// What `lore-atlas view` was asked to show.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub graph_path: PathBuf,
    pub relation_glossary: Option<PathBuf>,
    pub research: bool,
    pub no_drift: bool,
}

pub struct LoreAtlasApp {
    options: ViewerOptions,
    state: AppState,
    reload_rx: Option<Receiver<Result<LoadedGraph, String>>>,
}

struct LoadedGraph {
    graph: LoreGraph,
    glossary: RelationGlossary,
}

enum AppState {
    Loading {
        rx: Receiver<Result<LoadedGraph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    graph: LoreGraph,
    glossary: RelationGlossary,
    simulation: Simulation,
    selection: SelectionState,
    camera: Camera,
    mode: Mode,
    ambient_drift: bool,
    search: String,
    search_miss: Option<String>,
    suggestions: SuggestionCache,
    dragging: Option<usize>,
    visible_edge_count: usize,
}

fn load_graph(options: &ViewerOptions) -> anyhow::Result<LoadedGraph> {
    let graph = load_artifact(&options.graph_path)?;
    let glossary = match &options.relation_glossary {
        Some(path) => load_relation_glossary(path)?,
        None => RelationGlossary::default(),
    };
    Ok(LoadedGraph { graph, glossary })
}

impl LoreAtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: ViewerOptions) -> Self {
        let state = Self::start_load(options.clone());
        Self {
            options,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(options: ViewerOptions) -> Receiver<Result<LoadedGraph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_graph(&options).map_err(|error| format!("{error:#}"));
            if let Err(error) = &result {
                warn!(%error, "graph load failed");
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(options: ViewerOptions) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(options),
        }
    }

    fn ready(loaded: LoadedGraph, options: &ViewerOptions) -> AppState {
        info!(
            nodes = loaded.graph.node_count(),
            links = loaded.graph.edge_count(),
            "graph ready"
        );
        AppState::Ready(Box::new(ViewModel::new(loaded, options)))
    }
}

impl eframe::App for LoreAtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => transition = Some(Self::ready(loaded, &self.options)),
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background load worker disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading lore graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load lore graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.options.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.options.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(loaded)) => transition = Some(Self::ready(loaded, &self.options)),
                        Ok(Err(error)) => transition = Some(AppState::Error(error)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
