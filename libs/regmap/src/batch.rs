//! Write planning
//!
//! Turns a set of staged writable fields into as few write requests as
//! possible. Fields are merged only when their register ranges are strictly
//! consecutive: a merged request must never carry registers that belong to
//! no staged field, since the device would see them as writes too.

use serde::Serialize;
use tracing::debug;

use crate::error::{RegMapError, Result};
use crate::metadata::FieldId;
use crate::model::DeviceModel;
use crate::schema::DeviceKind;

/// Maximum registers in one multi-register write on the field bus
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// One transport write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteRequest {
    pub offset: u16,
    pub words: Vec<u16>,
    /// Names of the fields carried by this request
    pub fields: Vec<&'static str>,
}

impl WriteRequest {
    /// One past the last register written
    pub fn end(&self) -> u32 {
        u32::from(self.offset) + self.words.len() as u32
    }
}

/// Plans write requests from staged model values
pub struct WritePlanner;

impl WritePlanner {
    /// Encode the current value of each field and merge consecutive ranges
    ///
    /// Every field must be writable. Duplicates are ignored. Requests come
    /// back sorted by offset.
    pub fn plan<K: DeviceKind>(
        model: &DeviceModel<K>,
        fields: &[K::Field],
    ) -> Result<Vec<WriteRequest>> {
        let schema = model.schema();

        let mut singles: Vec<WriteRequest> = Vec::with_capacity(fields.len());
        let mut seen: Vec<K::Field> = Vec::with_capacity(fields.len());
        for &field in fields {
            if seen.contains(&field) {
                continue;
            }
            seen.push(field);

            let meta = schema.registry().describe(field)?;
            if !meta.is_writable() {
                return Err(RegMapError::NotWritable(field.name().to_string()));
            }
            let order = schema.orders().order_for(meta.data_type);
            let words = model.get(field).encode(meta.data_type, order)?;
            singles.push(WriteRequest {
                offset: meta.offset,
                words,
                fields: vec![field.name()],
            });
        }

        singles.sort_by_key(|r| r.offset);
        let requests = Self::merge(singles);
        debug!(
            "Planned {} write request(s) for {} field(s) on {}",
            requests.len(),
            seen.len(),
            schema.name()
        );
        Ok(requests)
    }

    /// Merge offset-sorted requests whose ranges touch end to start
    fn merge(sorted: Vec<WriteRequest>) -> Vec<WriteRequest> {
        let mut merged: Vec<WriteRequest> = Vec::with_capacity(sorted.len());
        for request in sorted {
            if let Some(last) = merged.last_mut() {
                let fits = last.words.len() + request.words.len()
                    <= usize::from(MAX_WRITE_REGISTERS);
                if last.end() == u32::from(request.offset) && fits {
                    last.words.extend_from_slice(&request.words);
                    last.fields.extend(request.fields);
                    continue;
                }
            }
            merged.push(request);
        }
        merged
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::bytes::{OrderPolicy, RegisterOrder};
    use crate::metadata::FieldMetadata;
    use crate::schema::{BlockSpec, DeviceSchema};
    use crate::value::DataType;
    use once_cell::sync::Lazy;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Valve {
        Position,
        Limit,
        Ramp,
        Mode,
        Feedback,
        Note,
    }

    impl FieldId for Valve {
        const ALL: &'static [Self] = &[
            Self::Position,
            Self::Limit,
            Self::Ramp,
            Self::Mode,
            Self::Feedback,
            Self::Note,
        ];

        fn index(self) -> usize {
            self as usize
        }

        fn name(self) -> &'static str {
            match self {
                Self::Position => "Position",
                Self::Limit => "Limit",
                Self::Ramp => "Ramp",
                Self::Mode => "Mode",
                Self::Feedback => "Feedback",
                Self::Note => "Note",
            }
        }
    }

    struct ValveKind;

    static VALVE: Lazy<Result<DeviceSchema<Valve>>> = Lazy::new(|| {
        DeviceSchema::build(
            "valve",
            OrderPolicy::uniform(RegisterOrder::ABCD),
            [
                (Valve::Position, FieldMetadata::read_write(100, DataType::UInt16)),
                (Valve::Limit, FieldMetadata::read_write(101, DataType::UInt32)),
                (Valve::Ramp, FieldMetadata::read_write(103, DataType::Int16)),
                (Valve::Mode, FieldMetadata::read_write(110, DataType::UInt16)),
                (Valve::Feedback, FieldMetadata::read_only(104, DataType::UInt16)),
                (
                    Valve::Note,
                    FieldMetadata::read_write(200, DataType::Text { registers: 120 }),
                ),
            ],
            &[BlockSpec::new("control", 100, 11)],
        )
    });

    impl DeviceKind for ValveKind {
        type Field = Valve;

        fn schema() -> Result<&'static DeviceSchema<Valve>> {
            VALVE.as_ref().map_err(Clone::clone)
        }
    }

    fn model() -> DeviceModel<ValveKind> {
        let mut model = DeviceModel::<ValveKind>::new().unwrap();
        model.stage_write(Valve::Position, 50u16).unwrap();
        model.stage_write(Valve::Limit, 0x0001_0002u32).unwrap();
        model.stage_write(Valve::Ramp, -1i16).unwrap();
        model.stage_write(Valve::Mode, 3u16).unwrap();
        model
    }

    #[test]
    fn test_consecutive_fields_merge() {
        let model = model();
        let plan = WritePlanner::plan(
            &model,
            &[Valve::Mode, Valve::Ramp, Valve::Position, Valve::Limit],
        )
        .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].offset, 100);
        assert_eq!(plan[0].words, vec![50, 0x0001, 0x0002, 0xFFFF]);
        assert_eq!(plan[0].fields, vec!["Position", "Limit", "Ramp"]);
        assert_eq!(plan[1].offset, 110);
        assert_eq!(plan[1].words, vec![3]);
    }

    #[test]
    fn test_gap_prevents_merge() {
        let model = model();
        let plan = WritePlanner::plan(&model, &[Valve::Position, Valve::Ramp]).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].end(), 101);
        assert_eq!(plan[1].offset, 103);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let model = model();
        let plan = WritePlanner::plan(&model, &[Valve::Mode, Valve::Mode]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].fields, vec!["Mode"]);
    }

    #[test]
    fn test_read_only_field_is_rejected() {
        let model = model();
        let err = WritePlanner::plan(&model, &[Valve::Position, Valve::Feedback]).unwrap_err();
        assert_eq!(err, RegMapError::NotWritable("Feedback".into()));
    }

    #[test]
    fn test_merge_respects_register_limit() {
        let model = model();
        let plan = WritePlanner::plan(&model, &[Valve::Note]).unwrap();
        assert_eq!(plan[0].words.len(), 120);

        let a = WriteRequest {
            offset: 0,
            words: vec![0; 120],
            fields: vec!["a"],
        };
        let b = WriteRequest {
            offset: 120,
            words: vec![0; 4],
            fields: vec!["b"],
        };
        let merged = WritePlanner::merge(vec![a.clone(), b]);
        // Touching, but 124 registers would exceed the limit
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end(), u32::from(merged[1].offset));

        let c = WriteRequest {
            offset: 120,
            words: vec![0; 3],
            fields: vec!["c"],
        };
        let merged = WritePlanner::merge(vec![a, c]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].words.len(), 123);
    }
}
