//! Coordinator owning the renderer, interaction controller, gradient engine
//! and layout worker.
//!
//! The host feeds input [`Event`]s and [`Command`]s in and calls
//! [`Viewer::tick`] once per frame; everything the host should react to
//! comes back out of [`Viewer::take_events`]. Commands and events are
//! processed strictly in arrival order.

use std::sync::mpsc::{self, Receiver, Sender};
use std::task::Poll;
use std::time::Duration;

use crate::camera::PrecisionWarning;
use crate::clock::{Clock, Deferred, SystemClock};
use crate::color::{Color, GradientEngine, PaletteTable};
use crate::draw_list::DrawList;
use crate::error::{fallback_message, EngineError, RenderError};
use crate::event::{EngineEvent, Event};
use crate::interaction::{scale_to_node, InteractionController};
use crate::layout::{LayoutOptions, LayoutSettings};
use crate::renderer::{FrameStats, GraphicsBackend, GridStyle, Renderer};
use crate::settings::Settings;
use crate::tree::{NodeId, Tree};
use crate::worker::{LayoutInput, PendingLayout, WorkerBridge};
use crate::ViewerConfig;

const INTEGRATED_GPU_NOTICE: &str = "Your device does not appear to use a dedicated graphics card. \
     Large trees may render slowly.";

/// Requests from the host, queued through [`Viewer::commands`].
#[derive(Clone, Debug)]
pub enum Command {
    /// Replace the tree and lay it out, superseding any layout in flight
    SetTree(Tree),
    /// Select a node, or clear the selection with `None`
    SelectNode(Option<NodeId>),
    UpdateSettings(Settings),
    /// Change layout geometry and lay the tree out again
    SetLayoutOptions(LayoutOptions),
    /// Absolute zoom level, e.g. from an external compass widget
    SetZoom(f32),
    ResetTransformations,
    /// Lay the current tree out again; without `force` this is dropped
    /// while a layout is in flight
    Recompute { force: bool },
}

pub struct Viewer<B: GraphicsBackend> {
    config: ViewerConfig,
    renderer: Renderer<B>,
    controller: InteractionController,
    worker: WorkerBridge,
    pending: Option<PendingLayout>,
    tree: Tree,
    settings: Settings,
    palettes: PaletteTable,
    gradient: GradientEngine,
    clock: Box<dyn Clock>,
    resync: Deferred,
    size: (u32, u32),
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    events: Vec<EngineEvent>,
    needs_redraw: bool,
    failed: bool,
}

impl<B: GraphicsBackend> Viewer<B> {
    /// Viewer on the system clock with a layout thread running the
    /// Pythagoras layout.
    pub fn new(backend: B, config: ViewerConfig) -> Result<Self, EngineError> {
        let worker = WorkerBridge::spawn()?;
        Ok(Self::with_parts(backend, config, worker, SystemClock::new()))
    }

    pub fn with_parts(
        backend: B,
        config: ViewerConfig,
        worker: WorkerBridge,
        clock: impl Clock + 'static,
    ) -> Self {
        let renderer = Renderer::new(backend, config.width as f32, config.height as f32)
            .with_warning_threshold(config.zoom_warning);
        let (sender, receiver) = mpsc::channel();

        let mut viewer = Self {
            controller: InteractionController::new(config.interaction()),
            renderer,
            worker,
            pending: None,
            tree: Tree::empty(),
            settings: config.settings.clone(),
            palettes: PaletteTable::builtin(),
            gradient: GradientEngine::new(),
            clock: Box::new(clock),
            resync: Deferred::Idle,
            size: (config.width, config.height),
            sender,
            receiver,
            events: Vec::new(),
            needs_redraw: true,
            failed: false,
            config,
        };
        viewer.apply_appearance();

        if !viewer.renderer.backend().is_dedicated_gpu() {
            log::warn!("No dedicated GPU detected");
            viewer.events.push(EngineEvent::Notification {
                message: INTEGRATED_GPU_NOTICE.to_string(),
                persistent: true,
            });
        }
        viewer
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// True while a layout is in flight.
    pub fn is_computing(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle for queueing commands; they are applied on the next tick.
    pub fn commands(&self) -> Sender<Command> {
        self.sender.clone()
    }

    /// Queue a command for the next tick.
    pub fn send(&self, command: Command) {
        if let Err(error) = self.sender.send(command) {
            log::debug!("Command dropped: {:?}", error.0);
        }
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn handle_event(&mut self, event: &Event) {
        let now = self.clock.now();
        let response = self
            .controller
            .handle(event, &mut self.renderer, &self.tree, now);
        self.events.extend(response.events);
        if let Some(node) = response.select {
            self.select(Some(node));
        }
        self.needs_redraw |= response.redraw;
    }

    /// Record a new surface size. The viewport follows on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resync.arm(self.clock.now(), Duration::ZERO);
    }

    /// Apply queued commands, advance timers, pick up a finished layout and
    /// render if anything changed. Returns the stats of the frame drawn, if
    /// any.
    pub fn tick(&mut self) -> Option<FrameStats> {
        while let Ok(command) = self.receiver.try_recv() {
            self.apply(command);
        }

        let now = self.clock.now();
        self.controller.tick(now);

        if self.resync.poll(now) {
            let (width, height) = self.size;
            log::debug!("Resyncing viewport to {}x{}", width, height);
            self.renderer.resize(width, height);
            self.needs_redraw = true;
        }

        self.poll_layout();

        if !self.needs_redraw || self.failed {
            return None;
        }
        self.render()
    }

    /// Stop the layout thread and free every GPU resource.
    pub fn shutdown(&mut self) {
        self.pending = None;
        self.worker.shutdown();
        self.renderer.release_buffers();
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetTree(tree) => {
                self.tree = tree;
                self.compute_scene(true);
            }
            Command::SelectNode(node) => {
                if self.select(node) && self.config.zoom_to_selection {
                    if let Some(node) = node {
                        let padding = self.config.fit_padding;
                        let warning = scale_to_node(&mut self.renderer, &self.tree, node, padding);
                        self.report_zoom(warning);
                    }
                }
            }
            Command::UpdateSettings(settings) => self.update_settings(settings),
            Command::SetLayoutOptions(options) => {
                self.config.layout = options;
                self.compute_scene(true);
            }
            Command::SetZoom(zoom) => {
                self.renderer.reset_zoom();
                let warning = self.renderer.scale(zoom);
                self.report_zoom(warning);
            }
            Command::ResetTransformations => {
                self.renderer.reset_transformations();
                self.report_zoom(None);
            }
            Command::Recompute { force } => self.compute_scene(force),
        }
    }

    /// Release the current scene and dispatch a fresh layout.
    fn compute_scene(&mut self, force: bool) {
        if self.tree.is_empty() {
            log::debug!("No tree to lay out");
            return;
        }
        if self.worker.is_busy() && !force {
            log::debug!("Layout in flight; recompute dropped");
            return;
        }

        self.renderer.release_buffers();
        self.gradient.update(&self.tree, &self.settings, &self.palettes);
        let input = LayoutInput {
            tree: self.tree.clone(),
            settings: LayoutSettings::new(self.settings.clone(), self.config.layout.clone()),
            colors: self.gradient.table().clone(),
        };

        let Some(pending) = self.worker.submit(input, force) else {
            return;
        };
        self.pending = Some(pending);
        self.needs_redraw = true;
        self.events.push(EngineEvent::Loading {
            active: true,
            modal: self.tree.len() > self.config.large_tree_threshold,
        });
    }

    fn poll_layout(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        match pending.try_take() {
            Poll::Pending => {}
            Poll::Ready(Some(list)) => {
                self.pending = None;
                self.finish_layout(list);
            }
            Poll::Ready(None) => {
                log::warn!("Layout {} produced no result", pending.generation());
                self.pending = None;
                self.events.push(EngineEvent::Loading {
                    active: false,
                    modal: false,
                });
            }
        }
    }

    fn finish_layout(&mut self, list: DrawList) {
        for error in self.renderer.load(list) {
            log::error!("{error}");
        }
        // selection or settings may have moved on while the layout ran
        self.gradient.update(&self.tree, &self.settings, &self.palettes);
        self.renderer.update_colors(&self.tree, self.gradient.table());
        self.needs_redraw = true;
        self.events.push(EngineEvent::Loading {
            active: false,
            modal: false,
        });
    }

    /// Returns true when the selection changed.
    fn select(&mut self, node: Option<NodeId>) -> bool {
        match node {
            Some(id) => {
                let Some(label) = self.tree.get(id).map(|n| n.label().to_string()) else {
                    log::warn!("Ignoring selection of unknown node {}", id.index());
                    return false;
                };
                if self.tree.selected() == Some(id) {
                    return false;
                }
                self.tree.select(id);
                self.events.push(EngineEvent::Selected {
                    node: id.index(),
                    label,
                });
            }
            None => {
                if self.tree.clear_selection().is_none() {
                    return false;
                }
            }
        }
        self.state_redraw();
        true
    }

    fn update_settings(&mut self, settings: Settings) {
        let recolor = self.settings.affects_colors(&settings);
        self.settings = settings;
        self.apply_appearance();
        if recolor {
            self.state_redraw();
        }
        self.needs_redraw = true;
    }

    /// Recolour the loaded primitives in place from a fresh colour table.
    /// A layout in flight picks the new colours up when it lands.
    fn state_redraw(&mut self) {
        self.needs_redraw = true;
        if self.is_computing() {
            return;
        }
        if self.gradient.update(&self.tree, &self.settings, &self.palettes) {
            log::debug!("Colour table changed; recolouring in place");
        }
        self.renderer.update_colors(&self.tree, self.gradient.table());
    }

    fn apply_appearance(&mut self) {
        let background = if self.settings.dark_mode {
            Color::NIGHT
        } else {
            Color::WHITE
        };
        self.renderer.set_background(background);
        self.renderer
            .set_grid(self.settings.grid.then(GridStyle::default));
    }

    fn report_zoom(&mut self, warning: Option<PrecisionWarning>) {
        self.needs_redraw = true;
        self.events
            .push(EngineEvent::ZoomChanged(self.renderer.zoom()));
        if let Some(warning) = warning {
            self.events.push(EngineEvent::Notification {
                message: warning.message().to_string(),
                persistent: true,
            });
        }
    }

    fn render(&mut self) -> Option<FrameStats> {
        match self.renderer.render() {
            Ok(stats) => {
                self.needs_redraw = false;
                Some(stats)
            }
            Err(error) if error.is_recoverable() => None,
            Err(error) => {
                self.fail(error);
                None
            }
        }
    }

    fn fail(&mut self, error: RenderError) {
        self.failed = true;
        let message = fallback_message(&EngineError::Render(error));
        self.events.push(EngineEvent::Fatal(message));
    }
}

impl<B: GraphicsBackend> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
