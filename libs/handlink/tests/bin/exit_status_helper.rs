// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Child that exits with the status given as its first argument (default 2)
//! without touching the region.

fn main() {
    let code = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<i32>().ok())
        .unwrap_or(2);
    std::process::exit(code);
}
