//! Pointer, wheel and keyboard handling: camera manipulation, hover
//! tooltips and node picking.

use std::time::Duration;

use crate::camera::PrecisionWarning;
use crate::clock::Deferred;
use crate::draw_list::DrawList;
use crate::event::{EngineEvent, Event, Key, Modifiers, Tooltip};
use crate::renderer::{GraphicsBackend, Renderer};
use crate::shape::Point;
use crate::tree::{NodeId, Tree};

/// Wheel delta per degree of rotation.
const ROTATION_NORMALIZATION: f32 = 10.0;
/// Wheel delta that doubles or zeroes the zoom.
const ZOOM_NORMALIZATION: f32 = 40.0;
const KEY_ROTATION: f32 = 1.0;
const KEY_TRANSLATION: f32 = 5.0;
const KEY_ZOOM: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct InteractionOptions {
    /// Margin around a node framed by scale-to-node, as a fraction of its
    /// size
    pub fit_padding: f32,
    /// Pointer travel in pixels before a press becomes a drag
    pub drag_threshold: f32,
    /// Quiet time after the last drag motion before a release counts as a
    /// click again
    pub click_debounce: Duration,
    /// Frame the clicked node's subtree
    pub zoom_to_selection: bool,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            fit_padding: 0.15,
            drag_threshold: 2.0,
            click_debounce: Duration::from_millis(200),
            zoom_to_selection: true,
        }
    }
}

impl InteractionOptions {
    pub fn fit_padding(mut self, padding: f32) -> Self {
        self.fit_padding = padding;
        self
    }

    pub fn drag_threshold(mut self, pixels: f32) -> Self {
        self.drag_threshold = pixels;
        self
    }

    pub fn click_debounce(mut self, delay: Duration) -> Self {
        self.click_debounce = delay;
        self
    }

    pub fn zoom_to_selection(mut self, enabled: bool) -> Self {
        self.zoom_to_selection = enabled;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerState {
    Idle,
    /// Pressed but not yet moved past the drag threshold
    Down { origin: Point },
    Dragging { last: Point },
}

/// What an input event changed.
#[derive(Debug, Default, PartialEq)]
pub struct Response {
    pub redraw: bool,
    /// Node hit by a click
    pub select: Option<NodeId>,
    pub events: Vec<EngineEvent>,
}

impl Response {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn zoomed(zoom: f32, warning: Option<PrecisionWarning>) -> Self {
        let mut response = Self::redraw();
        response.events.push(EngineEvent::ZoomChanged(zoom));
        response.warn(warning);
        response
    }

    fn warn(&mut self, warning: Option<PrecisionWarning>) {
        if let Some(warning) = warning {
            self.events.push(EngineEvent::Notification {
                message: warning.message().to_string(),
                persistent: true,
            });
        }
    }
}

pub struct InteractionController {
    options: InteractionOptions,
    state: PointerState,
    debounce: Deferred,
    hovered: Option<usize>,
}

impl InteractionController {
    pub fn new(options: InteractionOptions) -> Self {
        Self {
            options,
            state: PointerState::Idle,
            debounce: Deferred::Idle,
            hovered: None,
        }
    }

    pub fn options(&self) -> &InteractionOptions {
        &self.options
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PointerState::Dragging { .. })
    }

    /// Advance timers. Once the drag debounce fires, a held pointer is
    /// treated as freshly pressed, so releasing it clicks.
    pub fn tick(&mut self, now: Duration) {
        if self.debounce.poll(now) {
            if let PointerState::Dragging { last } = self.state {
                log::trace!("Drag settled");
                self.state = PointerState::Down { origin: last };
            }
        }
    }

    pub fn handle<B: GraphicsBackend>(
        &mut self,
        event: &Event,
        renderer: &mut Renderer<B>,
        tree: &Tree,
        now: Duration,
    ) -> Response {
        match *event {
            Event::MouseDown { x, y, .. } => {
                self.state = PointerState::Down { origin: [x, y] };
                Response::default()
            }
            Event::MouseMove { x, y } => self.pointer_move([x, y], renderer, tree, now),
            Event::MouseUp { x, y, .. } => self.pointer_up([x, y], renderer, tree),
            Event::MouseLeave => {
                self.state = PointerState::Idle;
                self.debounce.cancel();
                let mut response = Response::default();
                self.clear_tooltip(&mut response);
                response
            }
            Event::Scroll {
                delta_y, modifiers, ..
            } => self.wheel(delta_y, modifiers, renderer),
            Event::KeyDown { key, .. } => self.key(key, renderer),
        }
    }

    fn pointer_move<B: GraphicsBackend>(
        &mut self,
        position: Point,
        renderer: &mut Renderer<B>,
        tree: &Tree,
        now: Duration,
    ) -> Response {
        match self.state {
            PointerState::Idle => self.hover(position, renderer, tree),
            PointerState::Down { origin } => {
                let travel = (position[0] - origin[0]).hypot(position[1] - origin[1]);
                if travel <= self.options.drag_threshold {
                    return Response::default();
                }
                // the first drag step covers all travel since the press
                let mut response = self.drag(origin, position, renderer, now);
                self.clear_tooltip(&mut response);
                response
            }
            PointerState::Dragging { last } => self.drag(last, position, renderer, now),
        }
    }

    fn drag<B: GraphicsBackend>(
        &mut self,
        last: Point,
        position: Point,
        renderer: &mut Renderer<B>,
        now: Duration,
    ) -> Response {
        renderer.translate(position[0] - last[0], position[1] - last[1]);
        self.state = PointerState::Dragging { last: position };
        self.debounce.arm(now, self.options.click_debounce);
        Response::redraw()
    }

    fn pointer_up<B: GraphicsBackend>(
        &mut self,
        position: Point,
        renderer: &mut Renderer<B>,
        tree: &Tree,
    ) -> Response {
        let state = std::mem::replace(&mut self.state, PointerState::Idle);
        if !matches!(state, PointerState::Down { .. }) {
            return Response::default();
        }

        let (wx, wy) = renderer.transform_point(position[0], position[1]);
        let Some(id) = hit_test(renderer.draw_list(), [wx, wy]) else {
            return Response::default();
        };
        let node = NodeId::from_index(id);
        if tree.get(node).is_none() {
            return Response::default();
        }
        log::debug!("Clicked node {}", id);

        let mut response = Response::redraw();
        response.select = Some(node);
        if self.options.zoom_to_selection {
            let warning = scale_to_node(renderer, tree, node, self.options.fit_padding);
            response.events.push(EngineEvent::ZoomChanged(renderer.zoom()));
            response.warn(warning);
        }
        response
    }

    fn hover<B: GraphicsBackend>(
        &mut self,
        position: Point,
        renderer: &Renderer<B>,
        tree: &Tree,
    ) -> Response {
        let (wx, wy) = renderer.transform_point(position[0], position[1]);
        let hit = hit_test(renderer.draw_list(), [wx, wy])
            .and_then(|id| tree.get(NodeId::from_index(id)).map(|node| (id, node)));

        let mut response = Response::default();
        match hit {
            Some((id, node)) if self.hovered != Some(id) => {
                self.hovered = Some(id);
                response.events.push(EngineEvent::Tooltip(Some(Tooltip {
                    label: node.label().to_string(),
                    x: position[0],
                    y: position[1],
                })));
            }
            Some(_) => {}
            None => self.clear_tooltip(&mut response),
        }
        response
    }

    fn clear_tooltip(&mut self, response: &mut Response) {
        if self.hovered.take().is_some() {
            response.events.push(EngineEvent::Tooltip(None));
        }
    }

    fn wheel<B: GraphicsBackend>(
        &mut self,
        delta_y: f32,
        modifiers: Modifiers,
        renderer: &mut Renderer<B>,
    ) -> Response {
        let pressed = !matches!(self.state, PointerState::Idle);
        if modifiers.rotates() || pressed {
            renderer.rotate(delta_y / ROTATION_NORMALIZATION);
            return Response::redraw();
        }
        let warning = renderer.scale((1.0 - delta_y / ZOOM_NORMALIZATION).max(0.1));
        Response::zoomed(renderer.zoom(), warning)
    }

    fn key<B: GraphicsBackend>(&mut self, key: Key, renderer: &mut Renderer<B>) -> Response {
        let c = match key {
            Key::Up => 'w',
            Key::Down => 's',
            Key::Left => 'a',
            Key::Right => 'd',
            Key::Char(c) => c.to_ascii_lowercase(),
        };
        match c {
            'q' => renderer.rotate(-KEY_ROTATION),
            'e' => renderer.rotate(KEY_ROTATION),
            'w' => renderer.translate(0.0, KEY_TRANSLATION),
            's' => renderer.translate(0.0, -KEY_TRANSLATION),
            'a' => renderer.translate(KEY_TRANSLATION, 0.0),
            'd' => renderer.translate(-KEY_TRANSLATION, 0.0),
            'r' => {
                let warning = renderer.scale(1.0 + KEY_ZOOM);
                return Response::zoomed(renderer.zoom(), warning);
            }
            'f' => {
                let warning = renderer.scale(1.0 - KEY_ZOOM);
                return Response::zoomed(renderer.zoom(), warning);
            }
            't' => {
                renderer.reset_transformations();
                return Response::zoomed(renderer.zoom(), None);
            }
            _ => return Response::default(),
        }
        Response::redraw()
    }
}

/// Identifier of the topmost structural primitive containing `point`.
///
/// Primitives are tested in reverse draw order; decoration is never hit.
pub fn hit_test(list: &DrawList, point: Point) -> Option<usize> {
    list.iter()
        .rev()
        .filter_map(|(_, primitive)| primitive.identifier.map(|id| (id, primitive)))
        .find(|(_, primitive)| primitive.shape.contains(point))
        .map(|(id, _)| id)
}

/// Centre the camera on the subtree rooted at `node` and zoom so it fills
/// the surface with `padding` to spare.
pub fn scale_to_node<B: GraphicsBackend>(
    renderer: &mut Renderer<B>,
    tree: &Tree,
    node: NodeId,
    padding: f32,
) -> Option<PrecisionWarning> {
    if tree.get(node).is_none() {
        return None;
    }
    let (min, max) = renderer.draw_list().bounds_of(tree.subtree_range(node))?;
    let width = (max[0] - min[0]).max(f32::EPSILON) * (1.0 + padding);
    let height = (max[1] - min[1]).max(f32::EPSILON) * (1.0 + padding);
    let (surface_width, surface_height) = renderer.camera().size();
    let zoom = (surface_width / width).min(surface_height / height);
    renderer.look_at((min[0] + max[0]) * 0.5, (min[1] + max[1]) * 0.5, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, ColorTable};
    use crate::event::MouseButton;
    use crate::layout::{compute, LayoutSettings};
    use crate::primitive::{DrawPrimitive, ShaderKind};
    use crate::renderer::RecordingBackend;
    use crate::shape::Shape;
    use crate::tree::sample_tree;

    const MS: Duration = Duration::from_millis(1);

    fn scene() -> (Renderer<RecordingBackend>, Tree) {
        let tree = sample_tree();
        let primitives = compute(&tree, &LayoutSettings::default(), &ColorTable::default());
        let mut renderer = Renderer::new(RecordingBackend::new(), 800.0, 600.0);
        renderer.load(DrawList::arrange(primitives, tree.subtree_size()));
        (renderer, tree)
    }

    fn down(x: f32, y: f32) -> Event {
        Event::MouseDown {
            x,
            y,
            button: MouseButton::Left,
        }
    }

    fn up(x: f32, y: f32) -> Event {
        Event::MouseUp {
            x,
            y,
            button: MouseButton::Left,
        }
    }

    fn scroll(delta_y: f32, modifiers: Modifiers) -> Event {
        Event::Scroll {
            x: 0.0,
            y: 0.0,
            delta_y,
            modifiers,
        }
    }

    fn circle(x: f32, radius: f32) -> DrawPrimitive {
        DrawPrimitive::new(
            ShaderKind::FillCircle,
            Shape::Circle {
                center: [x, 0.0],
                radius,
            },
            Color::WHITE,
        )
    }

    #[test]
    fn test_hit_test_topmost_first() {
        let list = DrawList::arrange(
            vec![
                circle(0.0, 10.0).with_identifier(0),
                circle(5.0, 10.0).with_identifier(1),
                circle(0.0, 50.0),
            ],
            2,
        );
        assert_eq!(hit_test(&list, [4.0, 0.0]), Some(1));
        assert_eq!(hit_test(&list, [-8.0, 0.0]), Some(0));
        // decoration covers everything but is never hit
        assert_eq!(hit_test(&list, [30.0, 0.0]), None);
    }

    #[test]
    fn test_hit_test_circle_boundary() {
        let list = DrawList::arrange(vec![circle(0.0, 10.0).with_identifier(0)], 1);
        assert_eq!(hit_test(&list, [9.99, 0.0]), Some(0));
        assert_eq!(hit_test(&list, [10.0, 0.0]), Some(0));
        assert_eq!(hit_test(&list, [10.01, 0.0]), None);
    }

    #[test]
    fn test_click_selects_and_frames_node() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());

        controller.handle(&down(400.0, 450.0), &mut renderer, &tree, MS);
        let response = controller.handle(&up(400.0, 450.0), &mut renderer, &tree, 2 * MS);
        assert_eq!(response.select, Some(NodeId::ROOT));
        assert!(response.redraw);
        assert!(matches!(response.events[0], EngineEvent::ZoomChanged(_)));

        // the whole tree is framed, so its root is centred horizontally
        let (min, max) = renderer.draw_list().bounds_of(0..tree.len()).unwrap();
        let (sx, _) = renderer.camera().project((min[0] + max[0]) * 0.5, 0.0);
        assert!((sx - 400.0).abs() < 1e-2);
    }

    #[test]
    fn test_click_on_empty_space_selects_nothing() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        controller.handle(&down(5.0, 5.0), &mut renderer, &tree, MS);
        let response = controller.handle(&up(5.0, 5.0), &mut renderer, &tree, MS);
        assert_eq!(response, Response::default());
    }

    #[test]
    fn test_drag_translates_and_suppresses_click() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());

        controller.handle(&down(400.0, 450.0), &mut renderer, &tree, MS);
        let small = controller.handle(&Event::MouseMove { x: 401.0, y: 450.0 }, &mut renderer, &tree, MS);
        assert!(!small.redraw);
        assert!(!controller.is_dragging());

        let moved = controller.handle(&Event::MouseMove { x: 410.0, y: 450.0 }, &mut renderer, &tree, 2 * MS);
        assert!(moved.redraw);
        assert!(controller.is_dragging());
        assert_eq!(renderer.camera().pan(), (10.0, 0.0));

        controller.handle(&Event::MouseMove { x: 420.0, y: 445.0 }, &mut renderer, &tree, 3 * MS);
        assert_eq!(renderer.camera().pan(), (20.0, -5.0));

        let released = controller.handle(&up(420.0, 445.0), &mut renderer, &tree, 4 * MS);
        assert_eq!(released.select, None);
        assert_eq!(controller.state(), PointerState::Idle);
    }

    #[test]
    fn test_drag_keeps_content_under_pointer() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        let before = renderer.transform_point(300.0, 200.0);

        controller.handle(&down(300.0, 200.0), &mut renderer, &tree, MS);
        for (i, x) in [301.0, 302.0, 303.5, 307.0].into_iter().enumerate() {
            let event = Event::MouseMove { x, y: 201.0 };
            controller.handle(&event, &mut renderer, &tree, (2 + i as u32) * MS);
        }
        assert!(controller.is_dragging());
        let after = renderer.transform_point(307.0, 201.0);
        assert!((after.0 - before.0).abs() < 1e-3 && (after.1 - before.1).abs() < 1e-3);
    }

    #[test]
    fn test_debounce_turns_held_drag_back_into_click() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());

        controller.handle(&down(390.0, 450.0), &mut renderer, &tree, Duration::ZERO);
        controller.handle(&Event::MouseMove { x: 400.0, y: 450.0 }, &mut renderer, &tree, 10 * MS);
        assert!(controller.is_dragging());

        controller.tick(209 * MS);
        assert!(controller.is_dragging());
        controller.tick(210 * MS);
        assert!(!controller.is_dragging());

        // content moved 10 px right, so the root centre is now at x = 410
        let response = controller.handle(&up(410.0, 450.0), &mut renderer, &tree, 300 * MS);
        assert_eq!(response.select, Some(NodeId::ROOT));
    }

    #[test]
    fn test_hover_reports_only_changes() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        let hover = |controller: &mut InteractionController,
                     renderer: &mut Renderer<RecordingBackend>,
                     x: f32,
                     y: f32| {
            controller
                .handle(&Event::MouseMove { x, y }, renderer, &tree, MS)
                .events
        };

        let first = hover(&mut controller, &mut renderer, 400.0, 450.0);
        assert_eq!(
            first,
            vec![EngineEvent::Tooltip(Some(Tooltip {
                label: "root".to_string(),
                x: 400.0,
                y: 450.0
            }))]
        );
        assert!(hover(&mut controller, &mut renderer, 401.0, 451.0).is_empty());
        assert_eq!(
            hover(&mut controller, &mut renderer, 5.0, 5.0),
            vec![EngineEvent::Tooltip(None)]
        );
        assert!(hover(&mut controller, &mut renderer, 6.0, 5.0).is_empty());
    }

    #[test]
    fn test_wheel_zooms_and_rotates() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());

        let response = controller.handle(&scroll(-40.0, Modifiers::NONE), &mut renderer, &tree, MS);
        assert_eq!(response.events, vec![EngineEvent::ZoomChanged(2.0)]);

        controller.handle(&scroll(400.0, Modifiers::NONE), &mut renderer, &tree, MS);
        assert!((renderer.zoom() - 0.2).abs() < 1e-6);

        controller.handle(&scroll(10.0, Modifiers::CTRL), &mut renderer, &tree, MS);
        assert!((renderer.camera().rotation_degrees() - 1.0).abs() < 1e-4);
        assert!((renderer.zoom() - 0.2).abs() < 1e-6);

        // a held pointer also rotates
        controller.handle(&down(0.0, 0.0), &mut renderer, &tree, MS);
        controller.handle(&scroll(20.0, Modifiers::NONE), &mut renderer, &tree, MS);
        assert!((renderer.camera().rotation_degrees() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_precision_warning_once() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        let mut notifications = 0;
        for _ in 0..3 {
            for _ in 0..16 {
                let response = controller.handle(&scroll(-40.0, Modifiers::NONE), &mut renderer, &tree, MS);
                notifications += response
                    .events
                    .iter()
                    .filter(|e| {
                        matches!(
                            e,
                            EngineEvent::Notification {
                                persistent: true,
                                ..
                            }
                        )
                    })
                    .count();
            }
            for _ in 0..16 {
                controller.handle(&scroll(20.0, Modifiers::NONE), &mut renderer, &tree, MS);
            }
        }
        assert_eq!(notifications, 1);
    }

    #[test]
    fn test_keyboard_navigation() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        let mut press = |c: char, renderer: &mut Renderer<RecordingBackend>| {
            controller.handle(
                &Event::KeyDown {
                    key: Key::Char(c),
                    modifiers: Modifiers::NONE,
                },
                renderer,
                &tree,
                MS,
            )
        };

        press('e', &mut renderer);
        press('e', &mut renderer);
        press('q', &mut renderer);
        assert!((renderer.camera().rotation_degrees() - 1.0).abs() < 1e-4);

        press('w', &mut renderer);
        press('a', &mut renderer);
        assert_eq!(renderer.camera().pan(), (5.0, 5.0));

        let zoom = press('r', &mut renderer);
        assert!((renderer.zoom() - 1.1).abs() < 1e-6);
        assert!(matches!(zoom.events[0], EngineEvent::ZoomChanged(_)));

        let reset = press('T', &mut renderer);
        assert_eq!(reset.events, vec![EngineEvent::ZoomChanged(1.0)]);
        assert_eq!(renderer.camera().pan(), (0.0, 0.0));
        assert!(!press('x', &mut renderer).redraw);
    }

    #[test]
    fn test_arrow_keys_pan() {
        let (mut renderer, tree) = scene();
        let mut controller = InteractionController::new(InteractionOptions::default());
        for key in [Key::Up, Key::Left, Key::Left, Key::Right, Key::Down, Key::Down] {
            let event = Event::KeyDown {
                key,
                modifiers: Modifiers::NONE,
            };
            assert!(controller.handle(&event, &mut renderer, &tree, MS).redraw);
        }
        assert_eq!(renderer.camera().pan(), (5.0, -5.0));
    }
}
