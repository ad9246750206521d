pub mod align;
pub mod calibration;
pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod key;
pub mod ledger;
pub mod pipeline;
pub mod stack;
