pub mod range;

pub use range::{DragSession, Handle, RangeSelector};
