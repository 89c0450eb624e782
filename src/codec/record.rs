/// SAWLOG record encoding in the current and legacy layouts
use crate::codec::timestamp::{self, TIMESTAMP_BYTE_SIZE};
use crate::error::{Error, Result};
use crate::models::{Record, BUTTON_COUNT, FLAG_COUNT, LEGACY_FLAG_COUNT, PAIR_COUNT};

/// Size of one record in the current layout
pub const RECORD_BYTE_SIZE: usize = 94;
/// Size of one record in the legacy layout
pub const LEGACY_RECORD_BYTE_SIZE: usize = 88;

const FLAGS_OFFSET: usize = 14;
const BUTTONS_OFFSET: usize = 18;
const TIMESTAMP_OFFSET: usize = BUTTONS_OFFSET + BUTTON_COUNT;

const LEGACY_FLAGS_OFFSET: usize = 10;
const LEGACY_BUTTONS_OFFSET: usize = 12;
const LEGACY_TIMESTAMP_OFFSET: usize = LEGACY_BUTTONS_OFFSET + BUTTON_COUNT;

const _: () = assert!(TIMESTAMP_OFFSET + TIMESTAMP_BYTE_SIZE == RECORD_BYTE_SIZE);
const _: () = assert!(LEGACY_TIMESTAMP_OFFSET + TIMESTAMP_BYTE_SIZE == LEGACY_RECORD_BYTE_SIZE);

/// Pack up to 16 flags into a word, flag `i` in bit `i`
fn pack_word(flags: &[bool]) -> u16 {
    flags
        .iter()
        .enumerate()
        .filter(|&(_, &flag)| flag)
        .fold(0u16, |word, (index, _)| word | (1 << index))
}

fn unpack_word(word: u16, out: &mut [bool]) {
    for (index, flag) in out.iter_mut().enumerate() {
        *flag = word & (1 << index) != 0;
    }
}

/// Pack 32 flags into two big-endian words, low word (flags 0-15) first
pub fn pack_flags(flags: &[bool; FLAG_COUNT]) -> [u8; 4] {
    let low = pack_word(&flags[..16]).to_be_bytes();
    let high = pack_word(&flags[16..]).to_be_bytes();
    [low[0], low[1], high[0], high[1]]
}

/// Inverse of [`pack_flags`]
pub fn unpack_flags(bytes: [u8; 4]) -> [bool; FLAG_COUNT] {
    let mut flags = [false; FLAG_COUNT];
    unpack_word(u16::from_be_bytes([bytes[0], bytes[1]]), &mut flags[..16]);
    unpack_word(u16::from_be_bytes([bytes[2], bytes[3]]), &mut flags[16..]);
    flags
}

/// Encode a record into the current 94-byte layout
///
/// Layout:
/// - Bytes 0-3: Id
/// - Byte 4: Zone id
/// - Byte 5: Sensor id
/// - Bytes 6-7: Length
/// - Bytes 8-11: Position
/// - Bytes 12-13: Drop box number
/// - Bytes 14-17: Flags, two words (flags 0-15, then flags 16-31)
/// - Bytes 18-81: Buttons, 32 orders followed by 32 counts
/// - Bytes 82-93: Timestamp
pub fn encode(record: &Record) -> [u8; RECORD_BYTE_SIZE] {
    let mut out = [0u8; RECORD_BYTE_SIZE];
    out[0..4].copy_from_slice(&record.id.to_be_bytes());
    out[4] = record.zone_id;
    out[5] = record.sensor_id;
    out[6..8].copy_from_slice(&record.length.to_be_bytes());
    out[8..12].copy_from_slice(&record.position.to_be_bytes());
    out[12..14].copy_from_slice(&record.drop_box_number.to_be_bytes());
    out[FLAGS_OFFSET..BUTTONS_OFFSET].copy_from_slice(&pack_flags(&record.flags));
    out[BUTTONS_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&record.buttons);
    out[TIMESTAMP_OFFSET..].copy_from_slice(&timestamp::encode(&record.timestamp));
    out
}

pub fn decode(data: &[u8]) -> Result<Record> {
    if data.len() != RECORD_BYTE_SIZE {
        return Err(Error::format(format!(
            "SAWLOG payload must be {RECORD_BYTE_SIZE} bytes, got {}",
            data.len()
        )));
    }

    let mut buttons = [0u8; BUTTON_COUNT];
    buttons.copy_from_slice(&data[BUTTONS_OFFSET..TIMESTAMP_OFFSET]);

    Ok(Record {
        id: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
        zone_id: data[4],
        sensor_id: data[5],
        length: u16::from_be_bytes([data[6], data[7]]),
        position: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        drop_box_number: u16::from_be_bytes([data[12], data[13]]),
        flags: unpack_flags([data[14], data[15], data[16], data[17]]),
        buttons,
        timestamp: timestamp::decode(&data[TIMESTAMP_OFFSET..])?,
    })
}

/// Decode a legacy 88-byte record and upgrade it to the current shape
///
/// Legacy layout:
/// - Bytes 0-3: Id
/// - Byte 4: Zone id
/// - Byte 5: Sensor id
/// - Bytes 6-7: Length
/// - Bytes 8-9: Drop box number
/// - Bytes 10-11: Flags 0-15
/// - Bytes 12-75: 32 interleaved (order, count) pairs
/// - Bytes 76-87: Timestamp
///
/// The upgraded record has `position == 0`, flags 16-31 cleared, and the
/// pairs split into the order half and count half of the button array.
pub fn decode_legacy(data: &[u8]) -> Result<Record> {
    if data.len() != LEGACY_RECORD_BYTE_SIZE {
        return Err(Error::format(format!(
            "legacy SAWLOG payload must be {LEGACY_RECORD_BYTE_SIZE} bytes, got {}",
            data.len()
        )));
    }

    let mut flags = [false; FLAG_COUNT];
    unpack_word(
        u16::from_be_bytes([data[LEGACY_FLAGS_OFFSET], data[LEGACY_FLAGS_OFFSET + 1]]),
        &mut flags[..LEGACY_FLAG_COUNT],
    );

    let mut buttons = [0u8; BUTTON_COUNT];
    let pairs = &data[LEGACY_BUTTONS_OFFSET..LEGACY_TIMESTAMP_OFFSET];
    for (index, pair) in pairs.chunks_exact(2).enumerate() {
        buttons[index] = pair[0];
        buttons[PAIR_COUNT + index] = pair[1];
    }

    Ok(Record {
        id: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
        zone_id: data[4],
        sensor_id: data[5],
        length: u16::from_be_bytes([data[6], data[7]]),
        position: 0,
        drop_box_number: u16::from_be_bytes([data[8], data[9]]),
        flags,
        buttons,
        timestamp: timestamp::decode(&data[LEGACY_TIMESTAMP_OFFSET..])?,
    })
}

/// Decode a buffer of back-to-back current-layout records
pub fn decode_array(data: &[u8]) -> Result<Vec<Record>> {
    if data.len() % RECORD_BYTE_SIZE != 0 {
        return Err(Error::format(format!(
            "payload length {} is not a multiple of SAWLOG size {RECORD_BYTE_SIZE}",
            data.len()
        )));
    }
    data.chunks_exact(RECORD_BYTE_SIZE).map(decode).collect()
}

/// Decode a record array in whichever layout its length fits
///
/// The wire carries no version tag, so the layout is inferred from length:
/// an empty buffer gives no records, a multiple of 94 bytes is read as the
/// current layout, otherwise a multiple of 88 bytes is read as legacy.
/// The current layout wins when both divide (e.g. 4136 bytes).
pub fn decode_array_compat(data: &[u8]) -> Result<Vec<Record>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % RECORD_BYTE_SIZE == 0 {
        return decode_array(data);
    }
    if data.len() % LEGACY_RECORD_BYTE_SIZE == 0 {
        return data
            .chunks_exact(LEGACY_RECORD_BYTE_SIZE)
            .map(decode_legacy)
            .collect();
    }
    Err(Error::format(format!(
        "payload length {} fits neither SAWLOG size {RECORD_BYTE_SIZE} nor legacy size {LEGACY_RECORD_BYTE_SIZE}",
        data.len()
    )))
}
