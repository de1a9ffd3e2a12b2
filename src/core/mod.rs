pub mod board;
pub mod store;

pub use board::{BoardView, CardView, ColumnView};
pub use store::{StoreError, TaskStore};
