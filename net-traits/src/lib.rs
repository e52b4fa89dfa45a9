#![cfg_attr(not(feature = "std"), no_std)]
#![allow(async_fn_in_trait)]

//! Socket-shaped traits a raw-link DHCP client binds against, kept separate from any
//! concrete implementation so the same client logic runs on `std` or on an embedded stack.

pub use raw::*;

pub use stack::*;

mod raw;
mod stack;
