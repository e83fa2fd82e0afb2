use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Host-runtime event delivered to the controller. Coordinates are logical
/// pixels; `client` is relative to the window, `page` to the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// Window resized; new sizes are read back from the viewport
    Resize,
    PointerMove { client: Vec2, page: Vec2 },
    /// First touch point of a touch start
    TouchStart { client: Vec2 },
    /// First touch point of a touch move
    TouchMove { client: Vec2 },
    PointerLeave,
    PointerButton { button: PointerButton, pressed: bool },
    /// Positive scrolls away from the viewer
    Wheel { delta_y: f32 },
}

/// What a registered listener reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Camera/renderer resize path
    Resize,
    /// Pointer and first-touch position for raycasting
    PointerTracking,
    /// Pointer speed from consecutive moves, reset on leave
    MouseSpeed,
    /// Orbit-control drag and wheel input
    OrbitInput,
}

impl ListenerKind {
    pub fn accepts(self, event: &HostEvent) -> bool {
        match self {
            ListenerKind::Resize => matches!(event, HostEvent::Resize),
            ListenerKind::PointerTracking => matches!(
                event,
                HostEvent::PointerMove { .. } | HostEvent::TouchStart { .. } | HostEvent::TouchMove { .. }
            ),
            ListenerKind::MouseSpeed => matches!(event, HostEvent::PointerMove { .. } | HostEvent::PointerLeave),
            ListenerKind::OrbitInput => matches!(
                event,
                HostEvent::PointerMove { .. } | HostEvent::PointerButton { .. } | HostEvent::Wheel { .. }
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Additive listener registry. Registering the same kind twice runs it
/// twice; removal is explicit through the returned id.
#[derive(Debug, Default)]
pub struct Listeners {
    entries: Vec<(ListenerId, ListenerKind)>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, kind));
        id
    }

    /// Returns whether the id was registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_subscribed(&self, kind: ListenerKind) -> bool {
        self.entries.iter().any(|(_, k)| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listener kinds interested in `event`, in registration order
    pub fn matching(&self, event: &HostEvent) -> Vec<ListenerKind> {
        self.entries
            .iter()
            .map(|(_, kind)| *kind)
            .filter(|kind| kind.accepts(event))
            .collect()
    }
}
