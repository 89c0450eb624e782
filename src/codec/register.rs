/// Full register block encoding (255 back-to-back records)
use crate::codec::record::{self, RECORD_BYTE_SIZE};
use crate::error::{Error, Result};
use crate::models::{RegisterBlock, REGISTER_CAPACITY};

/// Byte size of the register block on the controller
pub const REGISTER_BYTE_SIZE: usize = REGISTER_CAPACITY * RECORD_BYTE_SIZE;

pub fn encode(block: &RegisterBlock) -> Vec<u8> {
    let mut out = Vec::with_capacity(REGISTER_BYTE_SIZE);
    for record in block.records() {
        out.extend_from_slice(&record::encode(record));
    }
    out
}

pub fn decode(data: &[u8]) -> Result<RegisterBlock> {
    if data.len() != REGISTER_BYTE_SIZE {
        return Err(Error::format(format!(
            "payload must be {REGISTER_BYTE_SIZE} bytes for {REGISTER_CAPACITY} SAWLOG entries, got {}",
            data.len()
        )));
    }

    let records = record::decode_array(data)?;
    if records.len() != REGISTER_CAPACITY {
        return Err(Error::format(format!(
            "expected {REGISTER_CAPACITY} SAWLOG entries, parsed {}",
            records.len()
        )));
    }
    RegisterBlock::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::strategies::arb_register;
    use crate::models::Record;
    use proptest::prelude::*;

    fn block() -> RegisterBlock {
        let records = (0..REGISTER_CAPACITY)
            .map(|i| {
                let mut record = Record::default();
                record.id = i as u32 * 10;
                record.position = i as u32;
                record.flags[i % 32] = true;
                record.buttons[i % 64] = i as u8;
                record
            })
            .collect();
        RegisterBlock::new(records).unwrap()
    }

    #[test]
    fn register_size_is_fixed() {
        assert_eq!(REGISTER_BYTE_SIZE, 23_970);
        assert_eq!(encode(&block()).len(), REGISTER_BYTE_SIZE);
    }

    #[test]
    fn register_round_trips_in_order() {
        let original = block();
        let bytes = encode(&original);
        assert_eq!(&bytes[94..98], &10u32.to_be_bytes());

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.records()[254].id, 2540);
    }

    #[test]
    fn decode_rejects_other_lengths() {
        assert!(matches!(decode(&[]), Err(Error::Format(_))));
        assert!(matches!(
            decode(&vec![0u8; REGISTER_BYTE_SIZE - RECORD_BYTE_SIZE]),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            decode(&vec![0u8; REGISTER_BYTE_SIZE + 1]),
            Err(Error::Format(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn any_register_round_trips(block in arb_register()) {
            let bytes = encode(&block);
            prop_assert_eq!(bytes.len(), REGISTER_BYTE_SIZE);
            prop_assert_eq!(decode(&bytes).unwrap(), block);
        }
    }
}
