/// Generators for arbitrary timestamps, records and register blocks
use proptest::collection::vec;
use proptest::prelude::*;

use crate::models::{Record, RegisterBlock, Timestamp, BUTTON_COUNT, REGISTER_CAPACITY};

pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    (
        any::<u16>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u32>(),
    )
        .prop_map(
            |(year, month, day, weekday, hour, minute, second, nanosecond)| Timestamp {
                year,
                month,
                day,
                weekday,
                hour,
                minute,
                second,
                nanosecond,
            },
        )
}

pub fn arb_record() -> impl Strategy<Value = Record> {
    (
        any::<u32>(),
        any::<u8>(),
        any::<u8>(),
        any::<u16>(),
        any::<u32>(),
        any::<u16>(),
        proptest::array::uniform32(any::<bool>()),
        vec(any::<u8>(), BUTTON_COUNT),
        arb_timestamp(),
    )
        .prop_map(
            |(id, zone_id, sensor_id, length, position, drop_box_number, flags, bytes, timestamp)| {
                let mut buttons = [0u8; BUTTON_COUNT];
                buttons.copy_from_slice(&bytes);
                Record {
                    id,
                    zone_id,
                    sensor_id,
                    length,
                    position,
                    drop_box_number,
                    flags,
                    buttons,
                    timestamp,
                }
            },
        )
}

pub fn arb_register() -> impl Strategy<Value = RegisterBlock> {
    vec(arb_record(), REGISTER_CAPACITY)
        .prop_map(|records| RegisterBlock::new(records).expect("generator yields a full register"))
}
