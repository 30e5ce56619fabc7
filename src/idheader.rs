use embedded_can::{ExtendedId, Id, StandardId};

/// The SIDH/SIDL/EID8/EID0 register block shared by the transmit and
/// receive buffers.
#[derive(Copy, Clone, Default)]
#[repr(C)]
pub struct IdHeader {
    sidh: u8,
    sidl: u8,
    eid8: u8,
    eid0: u8,
}

impl IdHeader {
    pub fn id(&self) -> Id {
        if self.exide() {
            let id = ((self.sidh as u32) << 21)
                | ((self.sidl as u32 & 0xE0) << 13)
                | (((self.sidl & 0b11) as u32) << 16)
                | ((self.eid8 as u32) << 8)
                | self.eid0 as u32;
            // SAFETY:
            // arithmetic above is always in bounds
            unsafe { Id::Extended(embedded_can::ExtendedId::new_unchecked(id)) }
        } else {
            let id = ((self.sidh as u16) << 3) | ((self.sidl as u16) >> 5);
            // SAFETY:
            // arithmetic above is always in bounds
            unsafe { Id::Standard(embedded_can::StandardId::new_unchecked(id)) }
        }
    }

    /// IDE bit: the buffer holds an extended identifier.
    #[inline]
    pub(crate) fn exide(&self) -> bool {
        self.sidl & 0b0000_1000 > 0
    }

    /// SRR bit: remote request marker of a received standard frame.
    /// Only meaningful in a receive buffer with IDE clear.
    #[inline]
    pub(crate) fn srr(&self) -> bool {
        self.sidl & 0b0001_0000 > 0
    }
}

impl From<Id> for IdHeader {
    fn from(id: Id) -> Self {
        match id {
            Id::Standard(id) => id.into(),
            Id::Extended(id) => id.into(),
        }
    }
}
impl From<StandardId> for IdHeader {
    #[inline]
    fn from(id: StandardId) -> Self {
        let id = id.as_raw();
        IdHeader {
            sidh: (id >> 3) as u8,
            sidl: (id as u8 & 0b0000_0111) << 5,
            eid8: 0,
            eid0: 0,
        }
    }
}
impl From<ExtendedId> for IdHeader {
    #[inline]
    fn from(id: ExtendedId) -> Self {
        let id = id.as_raw();

        IdHeader {
            sidh: (id >> 21) as u8,
            sidl: (((id >> 13) & 0b11100000) as u8)
                | 0b0000_1000
                | (((id >> 16) & 0b0000_0011) as u8),
            eid8: (id >> 8) as u8,
            eid0: id as u8,
        }
    }
}

impl core::fmt::Debug for IdHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdHeader").field("id", &self.id()).finish()
    }
}
