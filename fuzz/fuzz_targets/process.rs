// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

#![no_main]

use libfuzzer_sys::fuzz_target;
use xwarp::api::AddrGuard;
use xwarp::api::RewriteCfg;
use xwarp::engine::Outcome;
use xwarp::engine::process;

fuzz_target!(|data: &[u8]| {
    for cfg in [
        RewriteCfg::default(),
        RewriteCfg::default().with_guard(AddrGuard::Dst).with_tos(0x1C),
    ] {
        let mut pkt = data.to_vec();
        let outcome = process(&mut pkt, &cfg);

        if outcome != Outcome::Rewritten {
            assert_eq!(pkt, data);
            continue;
        }

        // A rewritten frame is left alone the second time around.
        let once = pkt.clone();
        assert!(matches!(process(&mut pkt, &cfg), Outcome::Passed(_)));
        assert_eq!(pkt, once);
    }
});
