pub mod board;

pub use board::{
    BoardError, BoardFilter, BoardRow, BoardSummary, BookingBoard, PendingChange, PendingDelete,
    StatusCount,
};
