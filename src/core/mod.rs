pub mod clock;
pub mod events;
pub mod frame;
pub mod input_adapter;
pub mod viewport;

pub use clock::Clock;
pub use events::{HostEvent, ListenerId, ListenerKind, Listeners, PointerButton};
pub use frame::{FrameCounter, FrameInfo};
pub use input_adapter::WinitEventAdapter;
pub use viewport::{FixedViewport, Viewport, WinitViewport};
