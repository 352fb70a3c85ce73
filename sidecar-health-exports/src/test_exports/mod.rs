// Copyright (c) 2022 MASSA LABS <info@massa.net>

mod recording_reporter;
mod scripted_ledger;

pub use recording_reporter::*;
pub use scripted_ledger::*;
