// SPDX-License-Identifier: MIT

pub mod log;
pub mod progress;
pub mod string;

pub use log::*;
pub use progress::*;
pub use string::*;
