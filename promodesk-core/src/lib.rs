// SPDX-License-Identifier: MIT

pub mod backend;
pub mod cas;
pub mod chunk;
pub mod deadline;
mod error;
pub mod folders;
pub mod list;
pub mod model;
pub mod notify;
pub mod screen;
pub mod selection;
pub mod time;
pub use error::{Error, RequestError};
