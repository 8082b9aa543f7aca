/*
 *  vid/error.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for module loading and the video lifecycle
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::TryReserveError;
use thiserror::Error;

/// Failure of a single candidate. Always recoverable: the fallback
/// controller logs it and moves on to the next candidate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("LoadLibrary (\"{name}\") failed: {reason}")]
    LibraryNotFound { name: String, reason: String },

    #[error("{name}: missing entry point {symbol}")]
    SymbolResolutionFailure { name: String, symbol: String },

    #[error("{name}: ABI version {found} incompatible with host {expected}")]
    AbiMismatch { name: String, found: u32, expected: u32 },

    #[error("{name}: render init failed: {message}")]
    InitFailure { name: String, message: String },
}

/// Fatal video subsystem errors. The host must halt on any of these.
#[derive(Debug, Error)]
pub enum VidError {
    #[error("No suitable renderer module (tried: {})", tried.join(", "))]
    AllCandidatesExhausted { tried: Vec<String> },

    #[error("String allocation failed while recording the renderer module: {0}")]
    AllocationFailure(#[from] TryReserveError),

    #[error("Could not relinquish elevated privileges: {0}")]
    PrivilegeDropFailure(String),

    #[error("Renderer re-selection requested {passes} times in a row")]
    RestartLoop { passes: usize },

    #[error("Video subsystem halted after a fatal error")]
    Halted,
}
