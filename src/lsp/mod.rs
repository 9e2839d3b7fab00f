// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// LSP message protocol definitions.
pub mod protocol;
/// Stdio server loop and lifecycle.
pub mod server;

pub use server::{ExitReason, SERVER_NAME, run};
