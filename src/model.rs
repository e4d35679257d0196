pub use period::*;
pub use timestamp::*;
pub use view::*;
pub use viewable::*;

mod period;
mod timestamp;
mod view;
mod viewable;
