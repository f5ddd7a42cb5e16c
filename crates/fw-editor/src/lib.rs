pub mod card_drop;
pub mod input;
pub mod line_draw;
pub mod node_drag;
pub mod service;
pub mod session;

pub use card_drop::CardDragGesture;
pub use input::PointerEvent;
pub use line_draw::{LineDrawGesture, LineDrawResult, LineDrawState};
pub use node_drag::{NodeDragGesture, NodeDragResult};
pub use service::{
    AcceptAllDrops, AdjustContext, CardDropPolicy, DragLineEndCallback, DragLineEndEvent,
    DragService, HookList, NodesDragEvent, NodesDragKind, PositionAdjuster,
};
pub use session::{DragSession, pump};
