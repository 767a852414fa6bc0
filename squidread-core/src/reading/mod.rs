//! Reading sessions: the rendering engine seam, the position tracker and the
//! reader controller that owns them

mod engine;
mod pointer;
mod reader;
mod session;
mod tracker;

pub use engine::{RenderingEngine, Viewport, CHARS_PER_LOCATION};
pub use pointer::LastOpenedPointer;
pub use reader::{Action, ActionOutcome, Notice, Reader};
pub use session::{ReadingSession, SessionInfo};
pub use tracker::{BestEffort, PositionTracker, Trigger};
