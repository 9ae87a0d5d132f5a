//! Client-side session handling for ShopBot.
//!
//! Reconciles the server's event stream into an ordered chat history,
//! attaches shopping data to the agent messages it belongs to, and plays
//! streamed speech in order with barge-in.

pub mod actions;
pub mod audio;
pub mod error;
pub mod grouping;
pub mod history;
pub mod pending;
pub mod reconciler;
pub mod session;

pub use actions::ShoppingAction;
pub use audio::{AudioOutput, AudioSequencer, NullOutput, PlayStatus, PlaybackState};
pub use error::ClientError;
pub use grouping::{group_history, interaction_ongoing, HistoryGroup};
pub use history::{ChatHistory, ChatHistoryItem, HistoryKind, Upsert};
pub use pending::{PendingQueue, PendingShoppingData};
pub use reconciler::{HistoryReconciler, Notification, ReconcilerSettings};
pub use session::{websocket_url, ClientSession};
