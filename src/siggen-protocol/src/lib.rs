// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wire protocol of the signal generator.
//!
//! One JSON object per line, request then reply, with a `cmd` discriminator
//! on commands and a `status` field on replies.

pub mod codec;
pub mod types;

pub use codec::{decode, encode, format_data, parse_data};
pub use types::{Command, Response};
