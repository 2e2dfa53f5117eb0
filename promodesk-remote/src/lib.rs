// SPDX-License-Identifier: MIT

pub mod api;
pub mod client;
