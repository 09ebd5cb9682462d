//! Legacy advertising data
//!
//! Flags, the complete local name and the complete list of 128-bit service
//! UUIDs, encoded as AD structures into one 31-byte advertising PDU.

use heapless::Vec;
use trouble_host::prelude::{AdStructure, BR_EDR_NOT_SUPPORTED, LE_GENERAL_DISCOVERABLE};

use crate::ble::traits::BleError;
use crate::config::ble::MAX_ADV_DATA_LEN;

/// 128-bit UUIDs that could still fit next to the flags
const MAX_SERVICE_UUIDS: usize = 2;

/// Encoded advertising payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPayload {
    data: [u8; MAX_ADV_DATA_LEN],
    len: usize,
}

impl AdvertisingPayload {
    /// Encode flags, the complete local name and the service UUID list.
    ///
    /// An empty name or service list is left out. UUIDs go on air
    /// little-endian. Returns `PayloadTooLarge` if the result does not fit
    /// in one legacy advertising PDU.
    pub fn new(name: &str, services: &[u128]) -> Result<Self, BleError> {
        let mut uuids: Vec<[u8; 16], MAX_SERVICE_UUIDS> = Vec::new();
        for uuid in services {
            uuids
                .push(uuid.to_le_bytes())
                .map_err(|_| BleError::PayloadTooLarge)?;
        }

        let mut structures: Vec<AdStructure<'_>, 3> = Vec::new();
        let _ = structures.push(AdStructure::Flags(
            LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED,
        ));
        if !name.is_empty() {
            let _ = structures.push(AdStructure::CompleteLocalName(name.as_bytes()));
        }
        if !uuids.is_empty() {
            let _ = structures.push(AdStructure::ServiceUuids128(uuids.as_slice()));
        }

        let mut data = [0u8; MAX_ADV_DATA_LEN];
        let len = AdStructure::encode_slice(structures.as_slice(), &mut data)
            .map_err(|_| BleError::PayloadTooLarge)?;

        Ok(Self { data, len })
    }

    /// Raw advertising data bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
