// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! An inline IPv4/TCP destination rewriter.
//!
//! The [`engine`] is built to run on the ingress path of an interface,
//! ahead of the host's protocol stack: it walks the headers of each
//! frame, decides whether the frame is bound for the configured TCP
//! port, and if so redirects it to the override address while keeping
//! both the IPv4 and TCP checksums valid. It neither allocates nor
//! blocks, and it never touches a byte outside the frame it was
//! handed.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::len_without_is_empty)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "engine")]
pub mod engine;
#[cfg(all(feature = "engine", feature = "std"))]
pub mod print;
