/// Value types exchanged with the controller
use crate::error::{Error, Result};

/// Flags carried by a record in the current layout
pub const FLAG_COUNT: usize = 32;
/// Flags carried by a record in the legacy layout
pub const LEGACY_FLAG_COUNT: usize = 16;
/// Button bytes per record: 32 orders followed by 32 counts
pub const BUTTON_COUNT: usize = 64;
/// Entries in each of the order and count halves of the button array
pub const PAIR_COUNT: usize = BUTTON_COUNT / 2;
/// Records held by the register block
pub const REGISTER_CAPACITY: usize = 255;

/// Controller calendar timestamp (date, weekday, time of day and nanoseconds)
///
/// `weekday` runs from 1 (Monday) to 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

/// One logged SAWLOG event in the current 32-flag shape
///
/// Fixed-size arrays keep the flag and button counts correct by construction.
/// Values coming from user edits go through [`RecordDraft`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u32,
    pub zone_id: u8,
    pub sensor_id: u8,
    pub length: u16,
    pub position: u32,
    pub drop_box_number: u16,
    pub flags: [bool; FLAG_COUNT],
    pub buttons: [u8; BUTTON_COUNT],
    pub timestamp: Timestamp,
}

impl Record {
    /// Order values, the first half of the button array
    pub fn orders(&self) -> &[u8] {
        &self.buttons[..PAIR_COUNT]
    }

    /// Count values, the second half of the button array
    pub fn counts(&self) -> &[u8] {
        &self.buttons[PAIR_COUNT..]
    }
}

impl Default for Record {
    fn default() -> Self {
        Record {
            id: 0,
            zone_id: 0,
            sensor_id: 0,
            length: 0,
            position: 0,
            drop_box_number: 0,
            flags: [false; FLAG_COUNT],
            buttons: [0; BUTTON_COUNT],
            timestamp: Timestamp::default(),
        }
    }
}

/// Unchecked record values, typically produced by an editor
///
/// Numbers are kept wide so that out-of-range input survives until
/// validation instead of being truncated on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub id: i64,
    pub zone_id: i64,
    pub sensor_id: i64,
    pub length: i64,
    pub position: i64,
    pub drop_box_number: i64,
    pub flags: Vec<bool>,
    pub buttons: Vec<i64>,
    pub timestamp: Timestamp,
}

fn check_field<T: TryFrom<i64>>(name: &str, value: i64, bound: &str) -> Result<T> {
    T::try_from(value)
        .map_err(|_| Error::validation(format!("{name} must fit in {bound}, got {value}")))
}

impl TryFrom<RecordDraft> for Record {
    type Error = Error;

    fn try_from(draft: RecordDraft) -> Result<Self> {
        let id = check_field::<u32>("id", draft.id, "an unsigned double word")?;
        let zone_id = check_field::<u8>("zone_id", draft.zone_id, "an unsigned byte")?;
        let sensor_id = check_field::<u8>("sensor_id", draft.sensor_id, "an unsigned byte")?;
        let length = check_field::<u16>("length", draft.length, "an unsigned word")?;
        let position = check_field::<u32>("position", draft.position, "an unsigned double word")?;
        let drop_box_number =
            check_field::<u16>("drop_box_number", draft.drop_box_number, "an unsigned word")?;

        // Legacy edits carry 16 flags; the upper half is padded with false
        let mut flags = [false; FLAG_COUNT];
        match draft.flags.len() {
            FLAG_COUNT | LEGACY_FLAG_COUNT => flags[..draft.flags.len()].copy_from_slice(&draft.flags),
            other => {
                return Err(Error::validation(format!(
                    "flags must contain {FLAG_COUNT} or {LEGACY_FLAG_COUNT} entries, got {other}"
                )))
            }
        }

        if draft.buttons.len() != BUTTON_COUNT {
            return Err(Error::validation(format!(
                "buttons must contain {BUTTON_COUNT} entries, got {}",
                draft.buttons.len()
            )));
        }
        let mut buttons = [0u8; BUTTON_COUNT];
        for (slot, value) in buttons.iter_mut().zip(&draft.buttons) {
            *slot = u8::try_from(*value).map_err(|_| {
                Error::validation(format!("buttons must be in range 0-255, got {value}"))
            })?;
        }

        Ok(Record {
            id,
            zone_id,
            sensor_id,
            length,
            position,
            drop_box_number,
            flags,
            buttons,
            timestamp: draft.timestamp,
        })
    }
}

impl From<&Record> for RecordDraft {
    fn from(record: &Record) -> Self {
        RecordDraft {
            id: record.id.into(),
            zone_id: record.zone_id.into(),
            sensor_id: record.sensor_id.into(),
            length: record.length.into(),
            position: record.position.into(),
            drop_box_number: record.drop_box_number.into(),
            flags: record.flags.to_vec(),
            buttons: record.buttons.iter().map(|&b| i64::from(b)).collect(),
            timestamp: record.timestamp,
        }
    }
}

/// The full register block: exactly [`REGISTER_CAPACITY`] records in device order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBlock {
    records: Vec<Record>,
}

impl RegisterBlock {
    pub fn new(records: Vec<Record>) -> Result<Self> {
        if records.len() != REGISTER_CAPACITY {
            return Err(Error::validation(format!(
                "register must contain exactly {REGISTER_CAPACITY} records, got {}",
                records.len()
            )));
        }
        Ok(RegisterBlock { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
