//! Physical register map for the encoder count register.
//!
//! The count register sits behind the HPS-to-FPGA lightweight bridge of a
//! Cyclone V HPS. The monitor maps one fixed window of physical memory and
//! locates the register inside it by masking the bridge address into the
//! window span.
//!
//! # Address Layout
//!
//! ```text
//! Physical address    Description
//! ─────────────────────────────────────────────
//! 0xFC00_0000         Mapped window base (64 MiB span)
//! 0xFF20_0000         Lightweight HPS-to-FPGA bridge slaves
//! 0xFF21_0000         Encoder 0 PIO count register (32-bit)
//! ```
//!
//! The window offset of the register is `(bridge + pio) & (span - 1)`,
//! computed at build time and checked against the span below.

use static_assertions::const_assert;

/// Physical base address of the mapped register window.
pub const HW_REGS_BASE: u64 = 0xFC00_0000;

/// Size of the mapped register window in bytes (64 MiB).
pub const HW_REGS_SPAN: usize = 0x0400_0000;

/// Mask folding a physical address into the window span.
pub const HW_REGS_MASK: u64 = (HW_REGS_SPAN as u64) - 1;

/// Physical base address of the lightweight HPS-to-FPGA bridge slave region.
pub const LWFPGA_SLAVES_BASE: u64 = 0xFF20_0000;

/// Bridge-relative base of the encoder 0 PIO, as assigned in the FPGA image.
pub const ENC0_PIO_BASE: u64 = 0x0001_0000;

/// Byte offset of the encoder 0 count register inside the mapped window.
pub const ENC0_COUNT_OFFSET: usize = ((LWFPGA_SLAVES_BASE + ENC0_PIO_BASE) & HW_REGS_MASK) as usize;

// The computed offset must land inside the window, with room for one
// aligned 32-bit register.
const_assert!(ENC0_COUNT_OFFSET + 4 <= HW_REGS_SPAN);
const_assert!(ENC0_COUNT_OFFSET % 4 == 0);
