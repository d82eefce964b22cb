//! Field layouts of the GDD logical channel descriptor registers.
#![allow(missing_docs)]
// Unusual groupings are used in binary literals in this file in order to
// separate the bits by which field they represent, rather than by their byte.
#![allow(clippy::unusual_byte_groupings)]

use mycelium_bitfield::{bitfield, enum_from_bits};

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum DataType<u8> {
        S8 = 0b00,
        S16 = 0b01,
        S32 = 0b10,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum PortKind<u8> {
        Memory = 0b1000,
        Peripheral = 0b1001,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum Access<u8> {
        Single0 = 0b00,
        Single1 = 0b01,
        Burst4 = 0b10,
        Burst8 = 0b11,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum AddrMode<u8> {
        Constant = 0b00,
        PostIncrement = 0b01,
        SingleIndex = 0b10,
        DoubleIndex = 0b11,
    }
}

bitfield! {
    /// `GDD_CSDP`: which sides of the transfer are memory and which are the
    /// peripheral, and how they are accessed.
    pub struct Csdp<u16> {
        pub const DATA_TYPE: DataType;
        pub const SRC_PORT: PortKind;
        const _RESERVED_0 = 1;
        pub const SRC_ACCESS: Access;
        pub const DST_PORT: PortKind;
        const _RESERVED_1 = 1;
        pub const DST_ACCESS: Access;
    }
}

bitfield! {
    /// `GDD_CCR`: channel control.
    pub struct Ccr<u16> {
        /// Synchronization code, selecting the HSI request line.
        pub const SYNC = 5;
        const _RESERVED_0 = 2;
        /// Setting this bit arms the channel. The hardware clears it when the
        /// transfer is over.
        pub const ENABLE: bool;
        const _RESERVED_1 = 4;
        pub const SRC_AMODE: AddrMode;
        pub const DST_AMODE: AddrMode;
    }
}

bitfield! {
    /// `GDD_CICR`: channel interrupt enables.
    pub struct Cicr<u16> {
        pub const TOUT_IE: bool;
        const _RESERVED_0 = 4;
        pub const BLOCK_IE: bool;
    }
}

bitfield! {
    /// `GDD_CSR`: channel status.
    pub struct Csr<u16> {
        /// The transfer timed out.
        pub const TOUT: bool;
        const _RESERVED_0 = 4;
        /// The whole block was transferred.
        pub const BLOCK: bool;
    }
}

impl Ccr {
    /// The bare `ENABLE` bit, for read-modify-write updates.
    #[must_use]
    pub fn enable_bit() -> u16 {
        Self::new().with(Self::ENABLE, true).bits()
    }
}
