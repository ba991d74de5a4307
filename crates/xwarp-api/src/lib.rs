// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

pub mod cfg;
pub mod ip;

pub use cfg::*;
pub use ip::*;

/// The overall version of the API. Anytime a type shared between the
/// engine and its hosts is added, removed, or modified, this number
/// should increment so that a loader can verify it was built against
/// the same engine as the object it attaches.
pub const API_VERSION: u64 = 1;

/// Major version of the xwarp package.
pub const MAJOR_VERSION: u64 = 0;

/// The XDP action codes understood by the kernel hook.
pub const XDP_ABORTED: u32 = 0;
pub const XDP_DROP: u32 = 1;
pub const XDP_PASS: u32 = 2;

/// The per-packet decision handed back to the host.
///
/// There is no `Drop`: traffic the engine is not
/// interested in is always passed, and only malformed frames are
/// rejected.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Disposition {
    /// Forward the frame, either untouched or as rewritten.
    Pass,
    /// The frame is malformed; the host must drop it and may count it
    /// as an error.
    Aborted,
}

impl From<Disposition> for u32 {
    fn from(disp: Disposition) -> u32 {
        match disp {
            Disposition::Pass => XDP_PASS,
            Disposition::Aborted => XDP_ABORTED,
        }
    }
}

impl Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Disposition::Pass => "PASS",
            Disposition::Aborted => "ABORTED",
        };

        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn xdp_action_codes() {
        assert_eq!(u32::from(Disposition::Pass), XDP_PASS);
        assert_eq!(u32::from(Disposition::Aborted), XDP_ABORTED);
        assert_ne!(u32::from(Disposition::Pass), XDP_DROP);
        assert_ne!(u32::from(Disposition::Aborted), XDP_DROP);
    }
}
