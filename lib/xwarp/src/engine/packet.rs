// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Bounds-checked access to the bytes of a frame.
//!
//! The host hands the engine one contiguous buffer per frame. All
//! header access goes through a [`PacketReaderMut`], a forward-only
//! cursor which splits the buffer into disjoint pieces. A piece is
//! only handed out once the cursor has checked that every one of its
//! bytes lies within the buffer, so a header view can never reach
//! past the end of the frame.

use core::fmt;
use core::fmt::Display;
use core::mem;
use core::result;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

/// A read past the end of the frame.
///
/// Headers are `Unaligned` and every bit pattern is valid, so running
/// out of bytes is the only way a read can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadErr {
    /// Fewer bytes remain in the frame than the read requires.
    NotEnoughBytes { available: usize, needed: usize },
}

impl Display for ReadErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotEnoughBytes { available, needed } => {
                write!(f, "needed {needed} bytes, {available} available")
            }
        }
    }
}

pub type ReadResult<T> = result::Result<T, ReadErr>;

/// A fixed-size, wire-format header which may be viewed in place.
///
/// Implementors are `#[repr(C)]` structs made solely of bytes and
/// byte arrays, so any sequence of `SIZE` bytes is a valid value and
/// no alignment is required.
pub trait RawHeader:
    FromBytes + IntoBytes + Immutable + KnownLayout + Unaligned + Sized
{
    const SIZE: usize = mem::size_of::<Self>();
}

/// A forward-only cursor over a single frame.
#[derive(Debug)]
pub struct PacketReaderMut<'a> {
    rest: &'a mut [u8],
    pos: usize,
    len: usize,
}

impl<'a> PacketReaderMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        let len = bytes.len();
        Self { rest: bytes, pos: 0, len }
    }

    /// Return the length of the whole frame.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return the current position in the frame.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Return the number of bytes between the cursor and the end of
    /// the frame.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Move the cursor forward by `amount` bytes without viewing them.
    pub fn seek(&mut self, amount: usize) -> ReadResult<()> {
        self.slice_mut(amount).map(|_| ())
    }

    /// Return the `len` bytes starting at the cursor and move the
    /// cursor past them.
    ///
    /// # Errors
    ///
    /// If fewer than `len` bytes remain, [`ReadErr::NotEnoughBytes`]
    /// is returned and the cursor does not move.
    pub fn slice_mut(&mut self, len: usize) -> ReadResult<&'a mut [u8]> {
        let available = self.rest.len();
        if len > available {
            return Err(ReadErr::NotEnoughBytes { available, needed: len });
        }

        let rest = mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(len);
        self.rest = tail;
        self.pos += len;
        Ok(head)
    }

    /// View the bytes at the cursor as the header `H` and move the
    /// cursor past it.
    ///
    /// # Errors
    ///
    /// If fewer than `H::SIZE` bytes remain,
    /// [`ReadErr::NotEnoughBytes`] is returned and the cursor does not
    /// move.
    pub fn header_mut<H: RawHeader>(&mut self) -> ReadResult<&'a mut H> {
        let available = self.rest.len();
        let rest = mem::take(&mut self.rest);

        match H::mut_from_prefix(rest) {
            Ok((hdr, tail)) => {
                self.rest = tail;
                self.pos += H::SIZE;
                Ok(hdr)
            }
            Err(e) => {
                self.rest = e.into_src();
                Err(ReadErr::NotEnoughBytes { available, needed: H::SIZE })
            }
        }
    }
}
