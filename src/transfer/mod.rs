//! File transfers between the two panes
//!
//! - `types`: queue items and the status state machine
//! - `queue`: observable transfer list
//! - `control`: cancel/pause intents and the concurrency limiter
//! - `coordinator`: drop handling and stream driving

pub mod control;
pub mod coordinator;
pub mod queue;
pub mod types;

pub use control::{
    check_transfer_control, TransferControl, TransferGuard, TransferManager, TransferPermit,
    DEFAULT_CONCURRENT_TRANSFERS, MAX_POSSIBLE_CONCURRENT,
};
pub use coordinator::{plan_drop, DragSource, DropTarget, TransferCoordinator, TransferError, TransferPlan};
pub use queue::{TransferEvent, TransferQueue};
pub use types::{
    percentage, TransferDirection, TransferItem, TransferProgress, TransferSignal, TransferStatus,
};
