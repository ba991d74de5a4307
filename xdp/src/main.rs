// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The XDP attach shim.
//!
//! The loader patches the globals below before attaching `rewrite_ip`
//! to an interface. The headers of each frame are copied onto the
//! stack, run through the engine, and copied back only when they were
//! rewritten.

#![no_std]
#![no_main]

use aya_ebpf::bindings::xdp_action;
use aya_ebpf::helpers::r#gen::bpf_xdp_load_bytes;
use aya_ebpf::helpers::r#gen::bpf_xdp_store_bytes;
use aya_ebpf::macros::xdp;
use aya_ebpf::programs::XdpContext;
use core::ffi::c_void;
use core::ptr;
use xwarp::api::AddrGuard;
use xwarp::api::DEFAULT_TARGET_PORT;
use xwarp::api::Ipv4Addr;
use xwarp::api::RewriteCfg;
use xwarp::engine::MAX_HDR_LEN;
use xwarp::engine::Outcome;
use xwarp::engine::process;

/// TOS values above `u8::MAX` leave the TOS byte alone.
const TOS_UNCHANGED: u16 = 0xFFFF;

#[unsafe(no_mangle)]
static TARGET_PORT: u16 = DEFAULT_TARGET_PORT;

#[unsafe(no_mangle)]
static OVERRIDE_IP: [u8; 4] = [192, 168, 30, 30];

/// Non-zero to also pass frames sent from the override address.
#[unsafe(no_mangle)]
static GUARD_SRC: u8 = 1;

#[unsafe(no_mangle)]
static TOS: u16 = TOS_UNCHANGED;

#[unsafe(link_section = "license")]
#[unsafe(no_mangle)]
static LICENSE: [u8; 4] = *b"GPL\0";

// The globals live in .rodata and are rewritten by the loader, so they
// must be read through volatile loads or the compiler folds in the
// values above.
fn load_cfg() -> RewriteCfg {
    let (port, ip, guard_src, tos) = unsafe {
        (
            ptr::read_volatile(&TARGET_PORT),
            ptr::read_volatile(&OVERRIDE_IP),
            ptr::read_volatile(&GUARD_SRC),
            ptr::read_volatile(&TOS),
        )
    };

    let guard =
        if guard_src != 0 { AddrGuard::SrcOrDst } else { AddrGuard::Dst };
    let mut cfg = RewriteCfg::new(port, Ipv4Addr::from(ip)).with_guard(guard);
    if let Ok(tos) = u8::try_from(tos) {
        cfg = cfg.with_tos(tos);
    }
    cfg
}

#[xdp]
pub fn rewrite_ip(ctx: XdpContext) -> u32 {
    let len = (ctx.data_end() - ctx.data()).min(MAX_HDR_LEN);
    let mut buf = [0u8; MAX_HDR_LEN];
    let hdrs = &mut buf[..len];

    if len > 0 {
        let res = unsafe {
            bpf_xdp_load_bytes(
                ctx.ctx,
                0,
                hdrs.as_mut_ptr() as *mut c_void,
                len as u32,
            )
        };
        if res != 0 {
            return xdp_action::XDP_ABORTED;
        }
    }

    let outcome = process(hdrs, &load_cfg());

    if outcome == Outcome::Rewritten {
        let res = unsafe {
            bpf_xdp_store_bytes(
                ctx.ctx,
                0,
                hdrs.as_mut_ptr() as *mut c_void,
                len as u32,
            )
        };
        if res != 0 {
            return xdp_action::XDP_ABORTED;
        }
    }

    u32::from(outcome.disposition())
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
