// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod process_handle;

pub use process_handle::{ConsumerCommand, ProcessHandle};
