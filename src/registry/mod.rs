//! Connection registry for message routing
//!
//! The registry maps each conversant to the connections it currently holds
//! (one per device) so fan-out can reach all of them.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ConnectionRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ connections: HashMap<Uuid,   │
//!                  │   Vec<ConnectionHandle {     │
//!                  │     responses: mpsc::Tx,     │
//!                  │     leave,                   │
//!                  │   }>                         │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │
//!        ┌────────────────────────┼────────────────────────┐
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//!   [join: add]            [worker: lookup]         [leave: remove]
//!                                 │
//!                                 └──► handle.deliver() ──► outbound pump
//! ```
//!
//! Entries exist only while non-empty. Sibling connections of one conversant
//! have no defined order.

pub mod entry;
pub mod store;

pub use entry::ConnectionHandle;
pub use store::ConnectionRegistry;
