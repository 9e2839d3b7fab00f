// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Per-document event serialization and edit application.
pub mod controller;
/// Analyzer invocation, caching and most-recent-wins publication.
pub mod diagnostics;

pub use controller::{Applied, SyncController, SyncOptions};
pub use diagnostics::{
    ChannelPublisher, DiagnosticsCoordinator, Publication, PublishQueue, Publisher,
    publish_channel,
};
